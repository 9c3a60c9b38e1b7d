//! Lazy partition scanning.
//!
//! A [`PartitionScanner`] opens a partition without reading column data:
//! schema and row count come from file footers. Column data is only fetched
//! by [`LazyPartition::collect`].

mod parquet;

pub use self::parquet::{ParquetPartition, ParquetScanner};

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use object_store::ObjectMeta;

use crate::error::Result;
use crate::partition::PartitionAddress;

/// Opens partitions by address.
#[async_trait]
pub trait PartitionScanner: Send + Sync {
    /// Open the partition at `address`.
    ///
    /// Returns `Ok(None)` when no data exists under the address. Any other
    /// failure is an error.
    async fn open(&self, address: &PartitionAddress) -> Result<Option<Arc<dyn LazyPartition>>>;
}

/// An opened partition whose column data has not been read yet.
#[async_trait]
pub trait LazyPartition: Send + Sync + fmt::Debug {
    /// Raw (undecoded) schema of the partition.
    fn schema(&self) -> SchemaRef;

    /// Number of rows, known without reading column data.
    fn num_rows(&self) -> usize;

    /// Read the named columns, in the given order.
    async fn collect(&self, columns: &[String]) -> Result<Vec<RecordBatch>>;

    /// Objects backing this partition.
    fn sources(&self) -> Vec<ObjectMeta> {
        Vec::new()
    }
}
