//! Postgres persistence. One store per collection, runtime-bound queries,
//! embedded migrations. The stores implement the storage traits from
//! askline-core so the workflows stay database-free in tests.

use askline_common::AsklineError;
use sqlx::PgPool;

pub mod announcements;
pub mod chat_log;
pub mod classes;
pub mod clusters;
pub mod courses;
pub mod qas;
pub mod questions;
mod rows;

pub use announcements::AnnouncementStore;
pub use chat_log::{ChatLogStore, ChatStats};
pub use classes::ClassStore;
pub use clusters::PgClusterStore;
pub use courses::PgCourseStore;
pub use qas::QaStore;
pub use questions::{PgQuestionStore, QuestionFilter, QuestionStatistics};

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), AsklineError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AsklineError::Database(e.to_string()))?;
    Ok(())
}

pub(crate) fn db_err(e: sqlx::Error) -> AsklineError {
    AsklineError::Database(e.to_string())
}
