use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use askline_common::Course;
use askline_core::{CourseStore, StoreResult};

use crate::db_err;
use crate::rows::{json_list, CourseRow};

#[derive(Clone)]
pub struct PgCourseStore {
    pool: PgPool,
}

impl PgCourseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, course: &Course) -> StoreResult<Course> {
        let row = sqlx::query_as::<_, CourseRow>(
            r#"
            INSERT INTO courses
                (id, course_code, course_name, semester, description, teacher_ids, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(course.id)
        .bind(&course.course_code)
        .bind(&course.course_name)
        .bind(&course.semester)
        .bind(&course.description)
        .bind(json_list(&course.teacher_ids))
        .bind(course.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.into())
    }

    pub async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT * FROM courses WHERE is_active OR $1 ORDER BY created_at DESC",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update(&self, course: &Course) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE courses SET
                course_code = $2, course_name = $3, semester = $4, description = $5,
                teacher_ids = $6, is_active = $7, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(course.id)
        .bind(&course.course_code)
        .bind(&course.course_name)
        .bind(&course.semester)
        .bind(&course.description)
        .bind(json_list(&course.teacher_ids))
        .bind(course.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft delete: flips is_active off, nothing is removed.
    pub async fn deactivate(&self, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE courses SET is_active = FALSE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CourseStore for PgCourseStore {
    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }
}
