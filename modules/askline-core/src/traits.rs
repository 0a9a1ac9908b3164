// Trait abstractions for the storage the core workflows depend on.
//
// The Postgres stores in askline-store implement these; tests use the
// in-memory mocks in testutil. No network, no database.

use async_trait::async_trait;
use uuid::Uuid;

use askline_common::{
    AsklineError, Cluster, Course, DifficultyLevel, PendingQuestion, Question, QuestionStatus,
};

pub type StoreResult<T> = Result<T, AsklineError>;

/// AI-derived fields written onto a question in one overwrite. The level is
/// recomputed from the score by the lifecycle manager before this reaches
/// the store; status is never part of it.
#[derive(Debug, Clone, Default)]
pub struct AnalysisFields {
    pub difficulty_score: Option<f32>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub keywords: Vec<String>,
    pub cluster_id: Option<Uuid>,
    pub response_draft: Option<String>,
    pub summary: Option<String>,
    pub sentiment_score: Option<f32>,
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn insert_question(&self, question: &Question) -> StoreResult<()>;

    async fn get_question(&self, id: Uuid) -> StoreResult<Option<Question>>;

    /// Write a new status (and, for rejections, the optional reason).
    async fn set_status(
        &self,
        id: Uuid,
        status: QuestionStatus,
        rejection_reason: Option<&str>,
    ) -> StoreResult<()>;

    /// Overwrite the AI-derived fields. Leaves status untouched.
    async fn write_analysis(&self, id: Uuid, fields: &AnalysisFields) -> StoreResult<()>;

    /// PENDING questions with no cluster, de-identified projection only.
    async fn pending_for_ai(
        &self,
        course_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<PendingQuestion>>;

    /// Bulk-set cluster_id on the given questions. Returns how many changed.
    async fn assign_cluster(&self, question_ids: &[Uuid], cluster_id: Uuid) -> StoreResult<u64>;

    /// Null out cluster_id on every member of a cluster. Returns how many
    /// were released.
    async fn release_cluster(&self, cluster_id: Uuid) -> StoreResult<u64>;

    /// Bulk-mark questions as merged into a Q&A. Returns how many changed.
    async fn mark_merged(&self, question_ids: &[Uuid], qa_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_cluster(&self, id: Uuid) -> StoreResult<Option<Cluster>>;

    async fn clusters_for_course(&self, course_id: Uuid) -> StoreResult<Vec<Cluster>>;

    async fn insert_cluster(&self, cluster: &Cluster) -> StoreResult<()>;

    /// Additive question_count increment (no recount) plus a timestamp touch.
    async fn bump_question_count(&self, id: Uuid, by: i32) -> StoreResult<()>;

    /// Recompute avg_difficulty from current members.
    async fn refresh_avg_difficulty(&self, id: Uuid) -> StoreResult<()>;

    /// Staff label override: sets manual_label and locks the cluster.
    /// Returns false when the cluster does not exist.
    async fn set_manual_label(&self, id: Uuid, label: &str) -> StoreResult<bool>;

    async fn delete_cluster(&self, id: Uuid) -> StoreResult<bool>;
}
