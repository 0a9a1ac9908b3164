//! Domain workflows for the classroom Q&A backend: the question
//! lifecycle state machine, AI-driven cluster reconciliation, and the
//! background job plumbing that ties them to the gateway.
//!
//! Storage is abstracted behind the traits in [`traits`], so everything
//! here is testable with in-memory mocks.

pub mod jobs;
pub mod lifecycle;
pub mod reconcile;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use jobs::{analyze_and_store, analyze_new_question, CourseLock, JobRegistry};
pub use lifecycle::{transition_allowed, LifecycleManager, PENDING_LIMIT_MAX};
pub use reconcile::{ClusterAdmin, ReconcileStats, Reconciler, RECONCILE_BATCH};
pub use traits::{AnalysisFields, ClusterStore, CourseStore, QuestionStore, StoreResult};
