use thiserror::Error;

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::validation::FailureEnvelope;

/// Outcome of a rejected orchestration step
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{}", .0.summary)]
    InvalidInput(FailureEnvelope),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    /// Single-problem invalid input
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(FailureEnvelope::single("INVALID_INPUT", message))
    }
}
