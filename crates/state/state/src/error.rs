use thiserror::Error;

/// Errors from datastore and counter store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A reservation write would overlap an existing interval.
    #[error("interval conflict: {0}")]
    Conflict(String),

    /// A row with the same primary key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
