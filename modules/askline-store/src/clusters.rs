use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use askline_common::Cluster;
use askline_core::{ClusterStore, StoreResult};

use crate::db_err;
use crate::rows::ClusterRow;

#[derive(Clone)]
pub struct PgClusterStore {
    pool: PgPool,
}

impl PgClusterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusterStore for PgClusterStore {
    async fn get_cluster(&self, id: Uuid) -> StoreResult<Option<Cluster>> {
        let row = sqlx::query_as::<_, ClusterRow>("SELECT * FROM clusters WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn clusters_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Cluster>> {
        let rows = sqlx::query_as::<_, ClusterRow>(
            "SELECT * FROM clusters WHERE course_id = $1 ORDER BY question_count DESC, created_at",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_cluster(&self, cluster: &Cluster) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clusters
                (id, course_id, topic_label, summary, question_count, avg_difficulty,
                 is_locked, manual_label, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(cluster.id)
        .bind(cluster.course_id)
        .bind(&cluster.topic_label)
        .bind(&cluster.summary)
        .bind(cluster.question_count)
        .bind(cluster.avg_difficulty)
        .bind(cluster.is_locked)
        .bind(&cluster.manual_label)
        .bind(cluster.created_at)
        .bind(cluster.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn bump_question_count(&self, id: Uuid, by: i32) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE clusters SET question_count = question_count + $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(by)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn refresh_avg_difficulty(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE clusters SET
                avg_difficulty = COALESCE((
                    SELECT AVG(difficulty_score)::real FROM questions
                    WHERE cluster_id = $1 AND difficulty_score IS NOT NULL
                ), 0),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn set_manual_label(&self, id: Uuid, label: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE clusters SET manual_label = $2, is_locked = TRUE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(label)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cluster(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM clusters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
