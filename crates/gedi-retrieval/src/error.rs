//! Error types for partition retrieval.

use arrow::error::ArrowError;
use gedi_common::GediError;
use gedi_storage::StorageError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Result type alias using RetrievalError.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while resolving, scanning or aggregating partitions.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Invalid geometry, tile id or time input.
    #[error(transparent)]
    Input(#[from] GediError),

    /// No data exists under a partition address.
    #[error("partition not found: {0}")]
    PartitionNotFound(String),

    /// Remote read failed for an existing partition.
    #[error("remote I/O error: {0}")]
    RemoteIo(String),

    /// A requested column is absent from the partition schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A partition produced a different row count than discovery reported.
    #[error("partition {address} produced {actual} rows, expected {expected}")]
    RowCountMismatch {
        address: String,
        expected: usize,
        actual: usize,
    },

    /// Column data could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The caller declined a large retrieval.
    #[error("retrieval of {n_points} points was declined")]
    Aborted { n_points: usize },

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),

    /// Local filesystem error.
    #[error("local I/O error: {0}")]
    Io(String),
}

impl RetrievalError {
    /// Create a RemoteIo error.
    pub fn remote_io(msg: impl Into<String>) -> Self {
        Self::RemoteIo(msg.into())
    }

    /// Create a Decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Absent partitions are skipped during discovery; everything else aborts.
    pub fn is_partition_not_found(&self) -> bool {
        matches!(self, Self::PartitionNotFound(_))
    }

    /// Classify a Parquet failure for one object.
    ///
    /// Errors raised by the object store while fetching byte ranges surface
    /// as `ParquetError::External` and are remote failures; the rest are
    /// decoding problems.
    pub fn from_parquet(location: &str, err: ParquetError) -> Self {
        match err {
            ParquetError::External(e) => Self::RemoteIo(format!("{}: {}", location, e)),
            other => Self::Decode(format!("{}: {}", location, other)),
        }
    }
}

impl From<StorageError> for RetrievalError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => Self::PartitionNotFound(path),
            StorageError::Remote(msg) => Self::RemoteIo(msg),
            StorageError::Config(msg) => Self::Config(msg),
            StorageError::Io(e) => Self::Io(e.to_string()),
        }
    }
}

impl From<ArrowError> for RetrievalError {
    fn from(err: ArrowError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ParquetError> for RetrievalError {
    fn from(err: ParquetError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RetrievalError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

impl From<std::io::Error> for RetrievalError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
