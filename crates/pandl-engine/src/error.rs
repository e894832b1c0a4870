use pandl_domain::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Fixed cost not found: {0}")]
    FixedCostNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Batch of {requested} operations exceeds the store limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl CoreError {
    /// True for failures originating in the document store collaborator.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CoreError::Storage(_) | CoreError::Io(_) | CoreError::BatchTooLarge { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}
