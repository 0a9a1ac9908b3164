use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use askline_common::{PendingQuestion, Question, QuestionStatus};
use askline_core::{AnalysisFields, QuestionStore, StoreResult};

use crate::db_err;
use crate::rows::{json_list, QuestionRow};

#[derive(Clone)]
pub struct PgQuestionStore {
    pool: PgPool,
}

/// Listing filter. Without an explicit status, DELETED rows stay hidden.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub course_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
    pub status: Option<QuestionStatus>,
    pub cluster_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Aggregate view for the statistics endpoint. DELETED questions are
/// excluded throughout.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionStatistics {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_difficulty: BTreeMap<String, i64>,
    pub avg_difficulty: Option<f64>,
    pub cluster_count: i64,
}

impl PgQuestionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &QuestionFilter) -> StoreResult<Vec<Question>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM questions WHERE TRUE ");

        if let Some(course_id) = filter.course_id {
            qb.push("AND course_id = ");
            qb.push_bind(course_id);
            qb.push(" ");
        }
        if let Some(class_id) = filter.class_id {
            qb.push("AND class_id = ");
            qb.push_bind(class_id);
            qb.push(" ");
        }
        if let Some(cluster_id) = filter.cluster_id {
            qb.push("AND cluster_id = ");
            qb.push_bind(cluster_id);
            qb.push(" ");
        }
        match filter.status {
            Some(status) => {
                qb.push("AND status = ");
                qb.push_bind(status.as_str());
                qb.push(" ");
            }
            None => {
                qb.push("AND status <> 'DELETED' ");
            }
        }

        qb.push("ORDER BY created_at DESC LIMIT ");
        qb.push_bind(filter.limit.unwrap_or(100).clamp(1, 1000));
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset.unwrap_or(0).max(0));

        let rows = qb
            .build_query_as::<QuestionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn statistics(&self, course_id: Uuid) -> StoreResult<QuestionStatistics> {
        let status_rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM questions
            WHERE course_id = $1 AND status <> 'DELETED'
            GROUP BY status
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let difficulty_rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT difficulty_level, COUNT(*) FROM questions
            WHERE course_id = $1 AND status <> 'DELETED' AND difficulty_level IS NOT NULL
            GROUP BY difficulty_level
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let (avg_difficulty, cluster_count) = sqlx::query_as::<_, (Option<f64>, i64)>(
            r#"
            SELECT AVG(difficulty_score)::float8, COUNT(DISTINCT cluster_id)
            FROM questions
            WHERE course_id = $1 AND status <> 'DELETED'
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let by_status: BTreeMap<String, i64> = status_rows.into_iter().collect();
        let total = by_status.values().sum();
        Ok(QuestionStatistics {
            total,
            by_status,
            by_difficulty: difficulty_rows.into_iter().collect(),
            avg_difficulty,
            cluster_count,
        })
    }

    /// Physically remove DELETED questions older than the cutoff. The only
    /// path that ever drops question rows.
    pub async fn purge_deleted(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM questions WHERE status = 'DELETED' AND updated_at < $1")
                .bind(cutoff)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO questions
                (id, course_id, class_id, pseudonym, question_text, status,
                 keywords, origin_message_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(question.id)
        .bind(question.course_id)
        .bind(question.class_id)
        .bind(&question.pseudonym)
        .bind(&question.question_text)
        .bind(question.status.as_str())
        .bind(json_list(&question.keywords))
        .bind(&question.origin_message_id)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_question(&self, id: Uuid) -> StoreResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: QuestionStatus,
        rejection_reason: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE questions SET
                status = $2,
                rejection_reason = COALESCE($3, rejection_reason),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(rejection_reason)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn write_analysis(&self, id: Uuid, fields: &AnalysisFields) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE questions SET
                difficulty_score = $2,
                difficulty_level = $3,
                keywords = $4,
                cluster_id = $5,
                ai_response_draft = $6,
                ai_summary = $7,
                sentiment_score = $8,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fields.difficulty_score)
        .bind(fields.difficulty_level.map(|l| l.as_str()))
        .bind(json_list(&fields.keywords))
        .bind(fields.cluster_id)
        .bind(&fields.response_draft)
        .bind(&fields.summary)
        .bind(fields.sentiment_score)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn pending_for_ai(
        &self,
        course_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<PendingQuestion>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            r#"
            SELECT id, pseudonym, question_text, created_at FROM questions
            WHERE course_id = $1 AND status = 'PENDING' AND cluster_id IS NULL
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(course_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, pseudonym, question_text, created_at)| PendingQuestion {
                id,
                pseudonym,
                question_text,
                created_at,
            })
            .collect())
    }

    async fn assign_cluster(&self, question_ids: &[Uuid], cluster_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE questions SET cluster_id = $1, updated_at = now() WHERE id = ANY($2)",
        )
        .bind(cluster_id)
        .bind(question_ids)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn release_cluster(&self, cluster_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE questions SET cluster_id = NULL, updated_at = now() WHERE cluster_id = $1",
        )
        .bind(cluster_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn mark_merged(&self, question_ids: &[Uuid], qa_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE questions SET is_merged = TRUE, merged_to_qa_id = $1, updated_at = now()
            WHERE id = ANY($2)
            "#,
        )
        .bind(qa_id)
        .bind(question_ids)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
