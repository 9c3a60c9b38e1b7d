//! Opening partitions and decoding their columns.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use object_store::ObjectMeta;
use tracing::{debug, instrument};

use crate::error::{Result, RetrievalError};
use crate::partition::PartitionAddress;
use crate::scanner::{LazyPartition, PartitionScanner};
use crate::schema::{DecodingSchema, L2_V002};

/// An opened, non-empty partition with its row count.
#[derive(Debug, Clone)]
pub struct PartitionHandle {
    address: PartitionAddress,
    scan: Arc<dyn LazyPartition>,
    row_count: usize,
    decoding: &'static DecodingSchema,
}

impl PartitionHandle {
    pub fn address(&self) -> &PartitionAddress {
        &self.address
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Schema after decoding.
    pub fn schema(&self) -> SchemaRef {
        self.decoding.decoded_schema(&self.scan.schema())
    }

    /// Objects backing the partition.
    pub fn sources(&self) -> Vec<ObjectMeta> {
        self.scan.sources()
    }

    /// Read and decode the named columns.
    pub async fn collect(&self, columns: &[String]) -> Result<Vec<RecordBatch>> {
        let batches = self.scan.collect(columns).await?;
        batches
            .iter()
            .map(|batch| self.decoding.decode_batch(batch))
            .collect()
    }
}

/// Opens partitions through a scanner and applies the column decoding.
pub struct PartitionReader {
    scanner: Arc<dyn PartitionScanner>,
    decoding: &'static DecodingSchema,
}

impl PartitionReader {
    /// Reader decoding with the current dataset release.
    pub fn new(scanner: Arc<dyn PartitionScanner>) -> Self {
        Self::with_decoding(scanner, &L2_V002)
    }

    pub fn with_decoding(scanner: Arc<dyn PartitionScanner>, decoding: &'static DecodingSchema) -> Self {
        Self { scanner, decoding }
    }

    /// Open a partition. Absent partitions are a `PartitionNotFound` error.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn read(&self, address: &PartitionAddress) -> Result<PartitionHandle> {
        let scan = self
            .scanner
            .open(address)
            .await?
            .ok_or_else(|| RetrievalError::PartitionNotFound(address.path_suffix()))?;

        let row_count = scan.num_rows();
        metrics::counter!("gedi_partitions_opened_total").increment(1);
        debug!(rows = row_count, "Opened partition");

        Ok(PartitionHandle {
            address: address.clone(),
            scan,
            row_count,
            decoding: self.decoding,
        })
    }

    /// Open a partition, mapping absence to `None`.
    pub async fn try_read(&self, address: &PartitionAddress) -> Result<Option<PartitionHandle>> {
        match self.read(address).await {
            Ok(handle) => Ok(Some(handle)),
            Err(e) if e.is_partition_not_found() => {
                metrics::counter!("gedi_partitions_missing_total").increment(1);
                debug!(address = %address, "Partition not found, skipping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for PartitionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionReader")
            .field("decoding", &self.decoding.version)
            .finish()
    }
}
