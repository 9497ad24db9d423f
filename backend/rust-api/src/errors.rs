use crate::services::streak_engine::ClockSkew;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    /// Only seen inside the submission retry loop.
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    ClockSkew(#[from] ClockSkew),
    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl ProgressError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ProgressError::NotFound(message.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ProgressError::Conflict(_))
    }
}

impl From<StoreError> for ProgressError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => ProgressError::Conflict(reason),
            other => ProgressError::Persistence(other),
        }
    }
}

pub type ProgressResult<T> = Result<T, ProgressError>;
