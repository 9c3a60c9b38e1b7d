//! Parquet-backed scanner over the hive-partitioned dataset.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use gedi_storage::DatasetStore;
use object_store::ObjectMeta;
use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions};
use parquet::arrow::async_reader::ParquetObjectReader;
use parquet::arrow::{ParquetRecordBatchStreamBuilder, ProjectionMask};
use tracing::{debug, instrument};

use super::{LazyPartition, PartitionScanner};
use crate::error::{Result, RetrievalError};
use crate::partition::PartitionAddress;

/// Opens partitions as sets of Parquet files below an address prefix.
#[derive(Debug, Clone)]
pub struct ParquetScanner {
    store: DatasetStore,
}

impl ParquetScanner {
    pub fn new(store: DatasetStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    fn reader(&self, meta: &ObjectMeta) -> ParquetObjectReader {
        ParquetObjectReader::new(self.store.inner(), meta.location.clone()).with_file_size(meta.size)
    }
}

#[async_trait]
impl PartitionScanner for ParquetScanner {
    #[instrument(skip(self), fields(address = %address))]
    async fn open(&self, address: &PartitionAddress) -> Result<Option<Arc<dyn LazyPartition>>> {
        let objects = self.store.list(&address.path_suffix()).await?;
        let files: Vec<ObjectMeta> = objects.into_iter().filter(is_data_file).collect();

        if files.is_empty() {
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(files.len());
        for meta in files {
            let mut reader = self.reader(&meta);
            let metadata = ArrowReaderMetadata::load_async(&mut reader, ArrowReaderOptions::new())
                .await
                .map_err(|e| RetrievalError::from_parquet(meta.location.as_ref(), e))?;
            let rows = metadata.metadata().file_metadata().num_rows().max(0) as usize;
            parts.push(ParquetFile {
                meta,
                metadata,
                rows,
            });
        }

        let schema = parts[0].metadata.schema().clone();
        let num_rows = parts.iter().map(|p| p.rows).sum();
        debug!(files = parts.len(), rows = num_rows, "Opened partition");

        Ok(Some(Arc::new(ParquetPartition {
            scanner: self.clone(),
            schema,
            files: parts,
            num_rows,
        })))
    }
}

/// Hidden and metadata files (`_SUCCESS`, `.crc`, ...) are not data.
fn is_data_file(meta: &ObjectMeta) -> bool {
    match meta.location.filename() {
        Some(name) => !name.starts_with('_') && !name.starts_with('.'),
        None => false,
    }
}

#[derive(Debug)]
struct ParquetFile {
    meta: ObjectMeta,
    metadata: ArrowReaderMetadata,
    rows: usize,
}

/// An opened partition: footers are loaded, column chunks are not.
#[derive(Debug)]
pub struct ParquetPartition {
    scanner: ParquetScanner,
    schema: SchemaRef,
    files: Vec<ParquetFile>,
    num_rows: usize,
}

impl ParquetPartition {
    async fn collect_file(&self, file: &ParquetFile, columns: &[String]) -> Result<Vec<RecordBatch>> {
        let location = file.meta.location.as_ref();
        let file_schema = file.metadata.schema();

        let mut roots = Vec::with_capacity(columns.len());
        for name in columns {
            let index = file_schema
                .index_of(name)
                .map_err(|_| RetrievalError::ColumnNotFound(name.clone()))?;
            roots.push(index);
        }

        let builder = ParquetRecordBatchStreamBuilder::new_with_metadata(
            self.scanner.reader(&file.meta),
            file.metadata.clone(),
        );
        let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
        let stream = builder
            .with_projection(mask)
            .build()
            .map_err(|e| RetrievalError::from_parquet(location, e))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| RetrievalError::from_parquet(location, e))?;

        // The projection yields columns in file order.
        batches
            .iter()
            .map(|batch| reorder(batch, columns))
            .collect()
    }
}

#[async_trait]
impl LazyPartition for ParquetPartition {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn num_rows(&self) -> usize {
        self.num_rows
    }

    async fn collect(&self, columns: &[String]) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for file in &self.files {
            batches.extend(self.collect_file(file, columns).await?);
        }
        Ok(batches)
    }

    fn sources(&self) -> Vec<ObjectMeta> {
        self.files.iter().map(|f| f.meta.clone()).collect()
    }
}

fn reorder(batch: &RecordBatch, columns: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut indices = Vec::with_capacity(columns.len());
    for name in columns {
        let index = schema
            .index_of(name)
            .map_err(|_| RetrievalError::ColumnNotFound(name.clone()))?;
        indices.push(index);
    }
    Ok(batch.project(&indices)?)
}
