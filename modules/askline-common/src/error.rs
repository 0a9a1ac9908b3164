use thiserror::Error;

#[derive(Error, Debug)]
pub enum AsklineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Course not found or inactive: {0}")]
    InvalidCourse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("AI service unavailable: {0}")]
    AiUnavailable(String),

    #[error("Reconciliation already in progress for this course")]
    ReconcileInFlight,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AsklineError {
    /// Whether the error is the caller's fault (maps to a 4xx response).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AsklineError::Validation(_)
                | AsklineError::InvalidCourse(_)
                | AsklineError::NotFound(_)
                | AsklineError::IllegalTransition { .. }
                | AsklineError::ReconcileInFlight
        )
    }
}
