use sqlx::PgPool;
use uuid::Uuid;

use askline_common::Announcement;
use askline_core::StoreResult;

use crate::db_err;
use crate::rows::{json_list, AnnouncementRow};

#[derive(Clone)]
pub struct AnnouncementStore {
    pool: PgPool,
}

impl AnnouncementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, announcement: &Announcement) -> StoreResult<Announcement> {
        let row = sqlx::query_as::<_, AnnouncementRow>(
            r#"
            INSERT INTO announcements
                (id, course_id, class_id, title, content, related_qa_ids,
                 is_published, publish_date, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(announcement.id)
        .bind(announcement.course_id)
        .bind(announcement.class_id)
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(json_list(&announcement.related_qa_ids))
        .bind(announcement.is_published)
        .bind(announcement.publish_date)
        .bind(&announcement.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Announcement>> {
        let row = sqlx::query_as::<_, AnnouncementRow>("SELECT * FROM announcements WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn list_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Announcement>> {
        let rows = sqlx::query_as::<_, AnnouncementRow>(
            "SELECT * FROM announcements WHERE course_id = $1 ORDER BY created_at DESC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update(&self, announcement: &Announcement) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE announcements SET
                title = $2, content = $3, related_qa_ids = $4, is_published = $5,
                publish_date = $6, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(announcement.id)
        .bind(&announcement.title)
        .bind(&announcement.content)
        .bind(json_list(&announcement.related_qa_ids))
        .bind(announcement.is_published)
        .bind(announcement.publish_date)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the outcome of pushing the announcement to LINE.
    pub async fn mark_sent_to_line(
        &self,
        id: Uuid,
        line_message_id: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE announcements SET sent_to_line = TRUE, line_message_id = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(line_message_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
