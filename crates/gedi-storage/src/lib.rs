//! Storage access for the remote GEDI L2 dataset.
//!
//! Wraps an [`object_store::ObjectStore`] (anonymous S3 by default) rooted at
//! the partitioned dataset prefix, and keeps "not found" distinct from other
//! remote failures.

pub mod error;
pub mod object_store;

pub use self::object_store::{
    DatasetStore, ObjectStorageConfig, DEFAULT_BUCKET, DEFAULT_DATASET_ROOT, DEFAULT_ENDPOINT,
};
pub use error::{StorageError, StorageResult};
