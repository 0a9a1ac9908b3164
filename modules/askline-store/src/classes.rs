use sqlx::PgPool;
use uuid::Uuid;

use askline_common::Class;
use askline_core::StoreResult;

use crate::db_err;
use crate::rows::ClassRow;

#[derive(Clone)]
pub struct ClassStore {
    pool: PgPool,
}

impl ClassStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, class: &Class) -> StoreResult<Class> {
        let row = sqlx::query_as::<_, ClassRow>(
            r#"
            INSERT INTO classes
                (id, course_id, class_code, class_name, line_group_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(class.id)
        .bind(class.course_id)
        .bind(&class.class_code)
        .bind(&class.class_name)
        .bind(&class.line_group_id)
        .bind(class.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Class>> {
        let row = sqlx::query_as::<_, ClassRow>("SELECT * FROM classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn list_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Class>> {
        let rows = sqlx::query_as::<_, ClassRow>(
            "SELECT * FROM classes WHERE course_id = $1 ORDER BY class_code",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The class bound to a LINE group, if any. Webhook course resolution
    /// goes through here.
    pub async fn find_by_line_group(&self, line_group_id: &str) -> StoreResult<Option<Class>> {
        let row = sqlx::query_as::<_, ClassRow>(
            "SELECT * FROM classes WHERE line_group_id = $1 AND is_active LIMIT 1",
        )
        .bind(line_group_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    pub async fn update(&self, class: &Class) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE classes SET
                class_code = $2, class_name = $3, line_group_id = $4, is_active = $5,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(class.id)
        .bind(&class.class_code)
        .bind(&class.class_name)
        .bind(&class.line_group_id)
        .bind(class.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn deactivate(&self, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE classes SET is_active = FALSE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
