//! Storage error types.

use thiserror::Error;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from the remote object store.
///
/// `NotFound` is kept apart from every other failure: callers treat a
/// missing partition as an empty one, while anything else is fatal.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Remote storage error: {0}")]
    Remote(String),

    #[error("Failed to create storage client: {0}")]
    Config(String),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Map an object_store error for `path`, preserving not-found.
    pub fn from_object_store(path: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::Remote(format!("{}: {}", path, other)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
