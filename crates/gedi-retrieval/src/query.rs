//! Bounding-box filtered queries over single partitions.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, AsArray, BooleanArray};
use arrow::compute::{cast, filter_record_batch};
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use gedi_common::BoundingBox;
use parquet::arrow::ArrowWriter;
use tracing::{debug, instrument};

use crate::error::{Result, RetrievalError};
use crate::partition::PartitionAddress;
use crate::reader::PartitionHandle;
use crate::schema::{LATITUDE, LONGITUDE};

/// A deferred read of one partition restricted to a bounding box.
#[derive(Debug, Clone)]
pub struct BboxQuery {
    name: String,
    handle: PartitionHandle,
    columns: Vec<String>,
    bbox: BoundingBox,
}

impl BboxQuery {
    pub fn new(handle: PartitionHandle, columns: Vec<String>, bbox: BoundingBox) -> Self {
        let name = format!("GEDI_tile_subset_{}", handle.address().slug());
        Self {
            name,
            handle,
            columns,
            bbox,
        }
    }

    /// Name of the subset, also used for exported files.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &PartitionAddress {
        self.handle.address()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Upper bound on the rows this query can return.
    pub fn max_rows(&self) -> usize {
        self.handle.row_count()
    }

    /// Read the partition and keep the points inside the box.
    #[instrument(skip(self), fields(name = %self.name))]
    pub async fn collect(&self) -> Result<Vec<RecordBatch>> {
        let mut read_columns = self.columns.clone();
        for coord in [LONGITUDE, LATITUDE] {
            if !read_columns.iter().any(|c| c == coord) {
                read_columns.push(coord.to_string());
            }
        }

        let lon_index = position(&read_columns, LONGITUDE)?;
        let lat_index = position(&read_columns, LATITUDE)?;
        let keep: Vec<usize> = (0..self.columns.len()).collect();

        let batches = self.handle.collect(&read_columns).await?;
        let mut filtered = Vec::with_capacity(batches.len());
        for batch in &batches {
            let mask = bbox_mask(batch, lon_index, lat_index, &self.bbox)?;
            let subset = filter_record_batch(batch, &mask)?;
            filtered.push(subset.project(&keep)?);
        }

        let rows: usize = filtered.iter().map(|b| b.num_rows()).sum();
        debug!(rows = rows, "Collected subset");
        Ok(filtered)
    }

    /// Collect the subset into `<dir>/<name>.parquet`.
    pub async fn sink_parquet(&self, dir: &Path) -> Result<(std::path::PathBuf, usize)> {
        let batches = self.collect().await?;
        let path = dir.join(format!("{}.parquet", self.name));
        let schema = match batches.first() {
            Some(batch) => batch.schema(),
            None => {
                let decoded = self.handle.schema();
                let indices = self
                    .columns
                    .iter()
                    .map(|c| {
                        decoded
                            .index_of(c)
                            .map_err(|_| RetrievalError::ColumnNotFound(c.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                std::sync::Arc::new(decoded.project(&indices)?)
            }
        };

        let target = path.clone();
        let rows = tokio::task::spawn_blocking(move || -> Result<usize> {
            let file = File::create(&target)?;
            let mut writer = ArrowWriter::try_new(file, schema, None)?;
            let mut rows = 0;
            for batch in &batches {
                writer.write(batch)?;
                rows += batch.num_rows();
            }
            writer.close()?;
            Ok(rows)
        })
        .await??;

        Ok((path, rows))
    }
}

fn position(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| RetrievalError::ColumnNotFound(name.to_string()))
}

/// Rows whose coordinates fall inside the box. Null coordinates never match.
fn bbox_mask(batch: &RecordBatch, lon: usize, lat: usize, bbox: &BoundingBox) -> Result<BooleanArray> {
    let lon = cast(batch.column(lon).as_ref(), &DataType::Float64)?;
    let lat = cast(batch.column(lat).as_ref(), &DataType::Float64)?;
    let lon = lon.as_primitive::<Float64Type>();
    let lat = lat.as_primitive::<Float64Type>();

    let mask: BooleanArray = (0..batch.num_rows())
        .map(|i| {
            if lon.is_null(i) || lat.is_null(i) {
                return Some(false);
            }
            Some(bbox.contains_point(lon.value(i), lat.value(i)))
        })
        .collect();
    Ok(mask)
}
