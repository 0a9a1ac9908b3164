// Signed LINE webhook receiver. The HMAC check runs over the raw body
// before anything is parsed or persisted.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

use askline_ai::AiGateway;
use askline_common::{ChatMessage, MessageDirection};
use askline_core::analyze_new_question;

use crate::auth::constant_time_eq;
use crate::envelope;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-line-signature";
const FOLLOW_GREETING: &str =
    "Welcome! Send your course question here and the teaching staff will pick it up anonymously.";

// --- Wire types ---

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
    pub postback: Option<Postback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub data: String,
}

// --- Signature ---

/// HMAC-SHA256 over the raw body with the channel secret, base64, compared
/// in constant time against the header value.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = BASE64.encode(mac.finalize().into_bytes());
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

// --- Handler ---

pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !verify_signature(&state.config.line_channel_secret, &body, signature) {
        return envelope::reject(StatusCode::BAD_REQUEST, "invalid signature");
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook payload");
            return envelope::reject(StatusCode::BAD_REQUEST, "invalid payload");
        }
    };

    for event in payload.events {
        dispatch(&state, event).await;
    }
    envelope::message("ok")
}

async fn dispatch(state: &Arc<AppState>, event: WebhookEvent) {
    match event.kind.as_str() {
        "message" => handle_message(state, event).await,
        "follow" => handle_follow(state, event).await,
        "postback" => {
            if let Some(postback) = event.postback {
                info!(data = %postback.data, "Postback event");
            }
        }
        other => info!(kind = other, "Ignoring webhook event"),
    }
}

async fn handle_follow(state: &Arc<AppState>, event: WebhookEvent) {
    let Some(reply_token) = event.reply_token else {
        return;
    };
    if let Err(e) = state.line.reply(&reply_token, FOLLOW_GREETING).await {
        warn!(error = %e, "Failed to send follow greeting");
    }
}

async fn handle_message(state: &Arc<AppState>, event: WebhookEvent) {
    let Some(message) = event.message else {
        return;
    };
    if message.kind != "text" {
        return;
    }
    let Some(text) = message.text else {
        return;
    };
    let Some(user_id) = event.source.as_ref().and_then(|s| s.user_id.clone()) else {
        warn!("Text message without a user id");
        return;
    };
    let pseudonym =
        askline_common::pseudonym::generate_pseudonym(&user_id, &state.config.pseudonym_salt);

    state
        .chat_log
        .record(&ChatMessage {
            id: Uuid::new_v4(),
            user_id: user_id.clone(),
            pseudonym: pseudonym.clone(),
            direction: MessageDirection::Received,
            content: text.clone(),
            question_id: None,
            line_message_id: message.id.clone(),
            reply_token: event.reply_token.clone(),
            error_message: None,
            created_at: Utc::now(),
        })
        .await;

    let Some((course_id, class_id)) = resolve_course(state, event.source.as_ref()).await else {
        warn!("No course resolvable for inbound message, question not created");
        return;
    };

    let question = match state
        .lifecycle
        .create(course_id, class_id, &user_id, &text, message.id.clone())
        .await
    {
        Ok(question) => question,
        Err(e) => {
            warn!(error = %e, "Failed to create question from webhook");
            return;
        }
    };

    // Short-timeout acknowledgment; degrades to a sentinel on AI failure.
    if let Some(reply_token) = event.reply_token {
        let draft = state.gateway.draft_reply(&text).await;
        send_and_log(state, &reply_token, &draft, &user_id, &pseudonym, question.id).await;
    }

    // Full analysis runs in the background; failures only log.
    let state = state.clone();
    let question_id = question.id;
    tokio::spawn(async move {
        analyze_new_question(&state.gateway, &state.lifecycle, question_id, &text).await;
    });
}

/// Group-bound classes take priority; otherwise fall back to the configured
/// default course.
async fn resolve_course(
    state: &Arc<AppState>,
    source: Option<&EventSource>,
) -> Option<(Uuid, Option<Uuid>)> {
    if let Some(group_id) = source.and_then(|s| s.group_id.as_deref()) {
        match state.classes.find_by_line_group(group_id).await {
            Ok(Some(class)) => return Some((class.course_id, Some(class.id))),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Class lookup failed");
                return None;
            }
        }
    }
    Uuid::parse_str(&state.config.default_course_id)
        .ok()
        .map(|course_id| (course_id, None))
}

async fn send_and_log(
    state: &Arc<AppState>,
    reply_token: &str,
    text: &str,
    user_id: &str,
    pseudonym: &str,
    question_id: Uuid,
) {
    let (direction, line_message_id, error_message) =
        match state.line.reply(reply_token, text).await {
            Ok(id) => (MessageDirection::Sent, id, None),
            Err(e) => {
                warn!(error = %e, "Failed to send LINE reply");
                (MessageDirection::Failed, None, Some(e.to_string()))
            }
        };

    state
        .chat_log
        .record(&ChatMessage {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            pseudonym: pseudonym.to_string(),
            direction,
            content: text.to_string(),
            question_id: Some(question_id),
            line_message_id,
            reply_token: Some(reply_token.to_string()),
            error_message,
            created_at: Utc::now(),
        })
        .await;
}
