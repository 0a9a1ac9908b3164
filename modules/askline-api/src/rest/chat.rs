use std::sync::Arc;

use axum::extract::{Query, State};
use serde::Deserialize;

use askline_common::pseudonym::mask_chat_user_id;
use askline_common::{AsklineError, ChatMessage, MessageDirection};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::envelope::{self, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct MessagesQuery {
    direction: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Log entry as exposed over REST: the raw chat user id stays in the
/// database, only a masked form and the pseudonym go out.
#[derive(Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub user: String,
    pub pseudonym: String,
    pub direction: MessageDirection,
    pub content: String,
    pub question_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageView {
    fn from(m: ChatMessage) -> Self {
        MessageView {
            id: m.id,
            user: mask_chat_user_id(&m.user_id),
            pseudonym: m.pseudonym,
            direction: m.direction,
            content: m.content,
            question_id: m.question_id,
            error_message: m.error_message,
            created_at: m.created_at,
        }
    }
}

/// `GET /line/messages` — the private chat log, newest first.
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult {
    let direction = query
        .direction
        .as_deref()
        .map(|d| {
            MessageDirection::parse(d)
                .ok_or_else(|| AsklineError::Validation(format!("unknown direction: {d}")))
        })
        .transpose()?;

    let messages = state
        .chat_log
        .list(
            direction,
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0),
        )
        .await?;
    let views: Vec<MessageView> = messages.into_iter().map(Into::into).collect();
    Ok(envelope::data(views))
}

/// `GET /line/stats` — message volume by direction.
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = state.chat_log.stats().await?;
    Ok(envelope::data(stats))
}
