//! Generators for synthetic GEDI-like point partitions.
//!
//! Every value encodes the partition seed and the row index, so a test can
//! tell from any output row which partition it came from and where.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use gedi_storage::DatasetStore;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

/// Parameters of one synthetic partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSpec {
    /// Distinguishes partitions; shows up in `shot_number` and `rh100`.
    pub seed: u64,
    pub rows: usize,
    /// South-west corner of the 1x1 degree cell holding the points.
    pub cell: (i32, i32),
}

impl PointSpec {
    pub fn new(seed: u64, rows: usize, cell: (i32, i32)) -> Self {
        Self { seed, rows, cell }
    }
}

/// Stored (undecoded) schema of the synthetic partitions.
pub fn point_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("shot_number", DataType::UInt64, false),
        Field::new("beam", DataType::Int32, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("rh100", DataType::Int32, true),
        Field::new("rh98", DataType::Int32, true),
        Field::new("rh50", DataType::Int32, true),
        Field::new("sensitivity", DataType::Int32, true),
        Field::new("elev_lowestmode", DataType::Int32, true),
        Field::new("fhd_normal", DataType::Int32, true),
        Field::new("rg", DataType::Int32, true),
        Field::new("pai", DataType::Int32, true),
    ]))
}

/// Shot number of `row` in the partition with `seed`.
pub fn shot_number(seed: u64, row: usize) -> u64 {
    seed * 1_000_000 + row as u64
}

/// Raw `rh100` of `row`; decodes to one ten-thousandth of this.
pub fn raw_rh100(seed: u64, row: usize) -> i32 {
    (seed * 1_000 + row as u64) as i32
}

/// Longitude and latitude of `row`: a 10x10 grid inside the cell.
pub fn point_coords(points: &PointSpec, row: usize) -> (f64, f64) {
    let (lon, lat) = points.cell;
    let x = (row % 10) as f64 / 10.0 + 0.05;
    let y = ((row / 10) % 10) as f64 / 10.0 + 0.05;
    (lon as f64 + x, lat as f64 + y)
}

/// Build one batch of synthetic points. `rh50` is null on every tenth row.
pub fn point_batch(points: &PointSpec) -> RecordBatch {
    let rows = 0..points.rows;
    let coords: Vec<(f64, f64)> = rows.clone().map(|r| point_coords(points, r)).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.clone().map(|r| shot_number(points.seed, r)))),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|r| (r % 8) as i32))),
        Arc::new(Float64Array::from_iter_values(coords.iter().map(|c| c.1))),
        Arc::new(Float64Array::from_iter_values(coords.iter().map(|c| c.0))),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|r| raw_rh100(points.seed, r)))),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|r| 90_000 + r as i32))),
        Arc::new(Int32Array::from_iter(
            rows.clone().map(|r| if r % 10 == 9 { None } else { Some(50_000) }),
        )),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|_| 9_800))),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|r| 12_345 + r as i32))),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|_| 250))),
        Arc::new(Int32Array::from_iter_values(rows.clone().map(|_| 1_000))),
        Arc::new(Int32Array::from_iter_values(rows.map(|_| 1_500))),
    ];

    RecordBatch::try_new(point_schema(), columns).expect("synthetic batch matches schema")
}

/// Encode batches as a Parquet file.
pub fn parquet_bytes(batches: &[RecordBatch]) -> Bytes {
    let schema = batches.first().map(|b| b.schema()).unwrap_or_else(point_schema);
    let props = WriterProperties::builder().set_max_row_group_size(64).build();

    let mut buffer = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buffer, schema, Some(props)).expect("create parquet writer");
    for batch in batches {
        writer.write(batch).expect("write batch");
    }
    writer.close().expect("close parquet writer");
    Bytes::from(buffer)
}

/// Write one Parquet file at `suffix` (relative to the dataset root).
pub async fn write_partition(store: &DatasetStore, suffix: &str, batches: &[RecordBatch]) {
    store
        .put(suffix, parquet_bytes(batches))
        .await
        .expect("seed partition");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_batch_values() {
        let points = PointSpec::new(3, 25, (-1, -1));
        let batch = point_batch(&points);
        assert_eq!(batch.num_rows(), 25);
        assert_eq!(batch.num_columns(), point_schema().fields().len());

        let shots = batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(shots.value(24), 3_000_024);

        let (lon, lat) = point_coords(&points, 24);
        assert!((-1.0..0.0).contains(&lon));
        assert!((-1.0..0.0).contains(&lat));
    }

    #[test]
    fn test_parquet_bytes_has_magic() {
        let bytes = parquet_bytes(&[point_batch(&PointSpec::new(1, 5, (0, 0)))]);
        assert_eq!(&bytes[..4], b"PAR1");
        assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");
    }
}
