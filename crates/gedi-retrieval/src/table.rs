//! Dense row-major result table.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{Result, RetrievalError};
use crate::partition::PartitionAddress;

/// Column labels of a result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLabels {
    /// Unnamed columns, labelled `0..n`.
    Positional(usize),
    /// Named columns in output order.
    Named(Vec<String>),
}

impl ColumnLabels {
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(n) => *n,
            Self::Named(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label strings; positional columns are numbered.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Positional(n) => (0..*n).map(|i| i.to_string()).collect(),
            Self::Named(names) => names.clone(),
        }
    }
}

/// Aggregated points: `n_rows` rows by `width` columns of `f64`.
///
/// Rows are grouped by partition in address order, and keep the partition's
/// internal order within each group.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    labels: ColumnLabels,
    n_rows: usize,
    data: Vec<f64>,
}

impl ResultTable {
    pub(crate) fn from_parts(labels: ColumnLabels, n_rows: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n_rows * labels.len());
        Self {
            labels,
            n_rows,
            data,
        }
    }

    /// A table with no rows.
    pub fn empty(labels: ColumnLabels) -> Self {
        Self::from_parts(labels, 0, Vec::new())
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.width())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn width(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &ColumnLabels {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.n_rows || column >= self.width() {
            return None;
        }
        Some(self.data[row * self.width() + column])
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.n_rows {
            return None;
        }
        let width = self.width();
        Some(&self.data[row * width..(row + 1) * width])
    }

    /// Values of one column by position.
    pub fn column_at(&self, column: usize) -> Option<Vec<f64>> {
        let width = self.width();
        if column >= width {
            return None;
        }
        Some(self.data.iter().skip(column).step_by(width).copied().collect())
    }

    /// Values of one column by label.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.labels.names().iter().position(|n| n == name)?;
        self.column_at(index)
    }

    /// Columnar copy of the table.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let names = self.labels.names();
        let fields: Vec<Field> = names
            .iter()
            .map(|n| Field::new(n, DataType::Float64, true))
            .collect();
        let columns: Vec<ArrayRef> = (0..self.width())
            .map(|c| {
                let values = self.column_at(c).unwrap_or_default();
                Arc::new(Float64Array::from(values)) as ArrayRef
            })
            .collect();

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Write the table as a single Parquet file.
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        let batch = self.to_record_batch()?;
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Pretty-printed first `limit` rows.
    pub fn preview(&self, limit: usize) -> Result<String> {
        let batch = self.to_record_batch()?;
        let head = batch.slice(0, limit.min(batch.num_rows()));
        Ok(pretty_format_batches(&[head])?.to_string())
    }
}

/// Copy decoded batches into a row-major block.
///
/// `out` holds `expected_rows * width` values. Nulls become `NaN`. The
/// batches must carry exactly `expected_rows` rows in total.
pub(crate) fn fill_dense(
    address: &PartitionAddress,
    batches: &[RecordBatch],
    expected_rows: usize,
    width: usize,
    out: &mut [f64],
) -> Result<()> {
    let actual: usize = batches.iter().map(|b| b.num_rows()).sum();
    if actual != expected_rows {
        return Err(RetrievalError::RowCountMismatch {
            address: address.path_suffix(),
            expected: expected_rows,
            actual,
        });
    }
    debug_assert_eq!(out.len(), expected_rows * width);

    let mut offset = 0;
    for batch in batches {
        if batch.num_columns() != width {
            return Err(RetrievalError::decode(format!(
                "{}: batch has {} columns, expected {}",
                address,
                batch.num_columns(),
                width
            )));
        }

        for (c, column) in batch.columns().iter().enumerate() {
            let values = cast(column.as_ref(), &DataType::Float64)?;
            for (r, value) in values.as_primitive::<Float64Type>().iter().enumerate() {
                out[(offset + r) * width + c] = value.unwrap_or(f64::NAN);
            }
        }
        offset += batch.num_rows();
    }

    Ok(())
}

/// Allocate and fill a row-major block for one partition.
pub(crate) fn dense_block(
    address: &PartitionAddress,
    batches: &[RecordBatch],
    expected_rows: usize,
    width: usize,
) -> Result<Vec<f64>> {
    let mut block = vec![0.0; expected_rows * width];
    fill_dense(address, batches, expected_rows, width, &mut block)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;

    fn address() -> PartitionAddress {
        PartitionAddress::new("000E_00N".parse().unwrap(), None)
    }

    fn batch(a: Vec<Option<i32>>, b: Vec<f64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int32, true),
            Field::new("b", DataType::Float64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(a)),
                Arc::new(Float64Array::from(b)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dense_block_is_row_major() {
        let batches = vec![
            batch(vec![Some(1), None], vec![0.5, 1.5]),
            batch(vec![Some(3)], vec![2.5]),
        ];
        let block = dense_block(&address(), &batches, 3, 2).unwrap();
        assert_eq!(block[0], 1.0);
        assert_eq!(block[1], 0.5);
        assert!(block[2].is_nan());
        assert_eq!(block[3], 1.5);
        assert_eq!(&block[4..], &[3.0, 2.5]);
    }

    #[test]
    fn test_dense_block_row_mismatch() {
        let batches = vec![batch(vec![Some(1)], vec![0.5])];
        let err = dense_block(&address(), &batches, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::RowCountMismatch { expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn test_table_accessors() {
        let table = ResultTable::from_parts(
            ColumnLabels::Named(vec!["x".into(), "y".into()]),
            3,
            vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0],
        );
        assert_eq!(table.shape(), (3, 2));
        assert_eq!(table.row(1), Some(&[2.0, 20.0][..]));
        assert_eq!(table.column("y"), Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(table.value(2, 0), Some(3.0));
        assert_eq!(table.value(3, 0), None);
        assert_eq!(table.column("z"), None);
    }

    #[test]
    fn test_positional_labels() {
        let table = ResultTable::empty(ColumnLabels::Positional(91));
        assert_eq!(table.shape(), (0, 91));
        assert_eq!(table.labels().names()[90], "90");
    }

    #[test]
    fn test_write_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.parquet");
        let table = ResultTable::from_parts(
            ColumnLabels::Named(vec!["x".into()]),
            2,
            vec![1.0, 2.0],
        );
        table.write_parquet(&path).unwrap();

        let file = File::open(&path).unwrap();
        let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 2);
    }
}
