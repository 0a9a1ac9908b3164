use sqlx::PgPool;
use uuid::Uuid;

use askline_common::Qa;
use askline_core::StoreResult;

use crate::db_err;
use crate::rows::{json_list, QaRow};

#[derive(Clone)]
pub struct QaStore {
    pool: PgPool,
}

impl QaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, qa: &Qa) -> StoreResult<Qa> {
        let row = sqlx::query_as::<_, QaRow>(
            r#"
            INSERT INTO qas
                (id, course_id, class_id, question, answer, category, tags,
                 related_question_ids, is_published, publish_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(qa.id)
        .bind(qa.course_id)
        .bind(qa.class_id)
        .bind(&qa.question)
        .bind(&qa.answer)
        .bind(&qa.category)
        .bind(json_list(&qa.tags))
        .bind(json_list(&qa.related_question_ids))
        .bind(qa.is_published)
        .bind(qa.publish_date)
        .bind(&qa.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Qa>> {
        let row = sqlx::query_as::<_, QaRow>("SELECT * FROM qas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn list_for_course(
        &self,
        course_id: Uuid,
        published_only: bool,
    ) -> StoreResult<Vec<Qa>> {
        let rows = sqlx::query_as::<_, QaRow>(
            r#"
            SELECT * FROM qas
            WHERE course_id = $1 AND (is_published OR NOT $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(course_id)
        .bind(published_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update(&self, qa: &Qa) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE qas SET
                question = $2, answer = $3, category = $4, tags = $5,
                related_question_ids = $6, is_published = $7, publish_date = $8,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(qa.id)
        .bind(&qa.question)
        .bind(&qa.answer)
        .bind(&qa.category)
        .bind(json_list(&qa.tags))
        .bind(json_list(&qa.related_question_ids))
        .bind(qa.is_published)
        .bind(qa.publish_date)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM qas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
