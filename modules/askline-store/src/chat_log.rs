use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use askline_common::{ChatMessage, MessageDirection};
use askline_core::StoreResult;

use crate::db_err;
use crate::rows::ChatMessageRow;

/// Private chat log. The raw chat user id lives only in this table; every
/// read-side surface exposes the pseudonym.
#[derive(Clone)]
pub struct ChatLogStore {
    pool: PgPool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatStats {
    pub total: i64,
    pub received: i64,
    pub sent: i64,
    pub failed: i64,
    pub distinct_users: i64,
}

impl ChatLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a chat message. Logs a warning on failure rather than
    /// propagating, a failed log write must not break message handling.
    pub async fn record(&self, message: &ChatMessage) -> Option<Uuid> {
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO chat_messages
                (id, user_id, pseudonym, direction, content, question_id,
                 line_message_id, reply_token, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(message.id)
        .bind(&message.user_id)
        .bind(&message.pseudonym)
        .bind(message.direction.as_str())
        .bind(&message.content)
        .bind(message.question_id)
        .bind(&message.line_message_id)
        .bind(&message.reply_token)
        .bind(&message.error_message)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(direction = %message.direction.as_str(), error = %e, "Failed to record chat message");
                None
            }
        }
    }

    pub async fn list(
        &self,
        direction: Option<MessageDirection>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT * FROM chat_messages
            WHERE $1::text IS NULL OR direction = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(direction.map(|d| d.as_str()))
        .bind(limit.clamp(1, 500))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn stats(&self) -> StoreResult<ChatStats> {
        let (total, received, sent, failed, distinct_users) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE direction = 'received'),
                    COUNT(*) FILTER (WHERE direction = 'sent'),
                    COUNT(*) FILTER (WHERE direction = 'failed'),
                    COUNT(DISTINCT user_id)
                FROM chat_messages
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(ChatStats {
            total,
            received,
            sent,
            failed,
            distinct_users,
        })
    }
}
