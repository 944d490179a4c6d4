use thiserror::Error;

/// Errors surfaced by the decision engine.
///
/// Duplicate submissions are deliberately absent: a second answer from the
/// same user is an idempotent no-op, not an error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Rejected before any mutation; `field` names the offending input.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    /// Unknown invite token or an event that has already been deleted.
    #[error("invite or event not found")]
    NotFound,

    /// Storage failure. Lifecycle transitions are transactional, so the
    /// event is left in its prior consistent state and the whole
    /// evaluation is safe to retry.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        CoreError::Validation { field, message }
    }
}
