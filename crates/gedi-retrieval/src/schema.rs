//! Column decoding for the GEDI L2 point dataset.
//!
//! The partitions store most measurements as scaled integers. Decoding
//! multiplies each listed column by its factor and widens it to `Float64`;
//! columns without an entry pass through unchanged.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::Result;

/// Number of columns in a complete L2 point record.
pub const DEFAULT_COLUMN_COUNT: usize = 91;

/// Name of the longitude column.
pub const LONGITUDE: &str = "longitude";

/// Name of the latitude column.
pub const LATITUDE: &str = "latitude";

/// Scale factor applied to one stored column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScale {
    pub column: &'static str,
    pub factor: f64,
}

impl ColumnScale {
    pub const fn new(column: &'static str, factor: f64) -> Self {
        Self { column, factor }
    }
}

/// A versioned table of column scale factors.
#[derive(Debug, Clone, Copy)]
pub struct DecodingSchema {
    /// Dataset release the factors belong to.
    pub version: &'static str,
    pub scales: &'static [ColumnScale],
}

/// Factors for the `l2v002` release (v20231219).
pub static L2_V002: DecodingSchema = DecodingSchema {
    version: "l2v002_v20231219",
    scales: L2_V002_SCALES,
};

const L2_V002_SCALES: &[ColumnScale] = &[
    // Relative heights, sensitivity and cover fractions
    ColumnScale::new("rh100", 1e-4),
    ColumnScale::new("rh99", 1e-4),
    ColumnScale::new("rh98", 1e-4),
    ColumnScale::new("rh97", 1e-4),
    ColumnScale::new("rh95", 1e-4),
    ColumnScale::new("rh75", 1e-4),
    ColumnScale::new("rh50", 1e-4),
    ColumnScale::new("rh25", 1e-4),
    ColumnScale::new("sensitivity", 1e-4),
    ColumnScale::new("rh100_a1", 1e-4),
    ColumnScale::new("rh99_a1", 1e-4),
    ColumnScale::new("rh98_a1", 1e-4),
    ColumnScale::new("rh97_a1", 1e-4),
    ColumnScale::new("rh95_a1", 1e-4),
    ColumnScale::new("rh75_a1", 1e-4),
    ColumnScale::new("rh50_a1", 1e-4),
    ColumnScale::new("rh25_a1", 1e-4),
    ColumnScale::new("rh100_a2", 1e-4),
    ColumnScale::new("rh99_a2", 1e-4),
    ColumnScale::new("rh98_a2", 1e-4),
    ColumnScale::new("rh97_a2", 1e-4),
    ColumnScale::new("rh95_a2", 1e-4),
    ColumnScale::new("rh75_a2", 1e-4),
    ColumnScale::new("rh50_a2", 1e-4),
    ColumnScale::new("rh25_a2", 1e-4),
    ColumnScale::new("rh100_a3", 1e-4),
    ColumnScale::new("rh99_a3", 1e-4),
    ColumnScale::new("rh98_a3", 1e-4),
    ColumnScale::new("rh97_a3", 1e-4),
    ColumnScale::new("rh95_a3", 1e-4),
    ColumnScale::new("rh75_a3", 1e-4),
    ColumnScale::new("rh50_a3", 1e-4),
    ColumnScale::new("rh25_a3", 1e-4),
    ColumnScale::new("rh100_a4", 1e-4),
    ColumnScale::new("rh99_a4", 1e-4),
    ColumnScale::new("rh98_a4", 1e-4),
    ColumnScale::new("rh97_a4", 1e-4),
    ColumnScale::new("rh95_a4", 1e-4),
    ColumnScale::new("rh75_a4", 1e-4),
    ColumnScale::new("rh50_a4", 1e-4),
    ColumnScale::new("rh25_a4", 1e-4),
    ColumnScale::new("rh100_a5", 1e-4),
    ColumnScale::new("rh99_a5", 1e-4),
    ColumnScale::new("rh98_a5", 1e-4),
    ColumnScale::new("rh97_a5", 1e-4),
    ColumnScale::new("rh95_a5", 1e-4),
    ColumnScale::new("rh75_a5", 1e-4),
    ColumnScale::new("rh50_a5", 1e-4),
    ColumnScale::new("rh25_a5", 1e-4),
    ColumnScale::new("rh100_a6", 1e-4),
    ColumnScale::new("rh99_a6", 1e-4),
    ColumnScale::new("rh98_a6", 1e-4),
    ColumnScale::new("rh97_a6", 1e-4),
    ColumnScale::new("rh95_a6", 1e-4),
    ColumnScale::new("rh75_a6", 1e-4),
    ColumnScale::new("rh50_a6", 1e-4),
    ColumnScale::new("rh25_a6", 1e-4),
    ColumnScale::new("sensitivity_a1", 1e-4),
    ColumnScale::new("sensitivity_a2", 1e-4),
    ColumnScale::new("sensitivity_a3", 1e-4),
    ColumnScale::new("sensitivity_a4", 1e-4),
    ColumnScale::new("sensitivity_a5", 1e-4),
    ColumnScale::new("sensitivity_a6", 1e-4),
    ColumnScale::new("omega", 1e-4),
    ColumnScale::new("pgap_theta", 1e-4),
    ColumnScale::new("cover", 1e-4),
    ColumnScale::new("rhog", 1e-4),
    ColumnScale::new("rhov", 1e-4),
    // Elevations and foliage height diversity
    ColumnScale::new("elev_lowestmode", 1e-2),
    ColumnScale::new("elev_lowestmode_a1", 1e-2),
    ColumnScale::new("elev_lowestmode_a2", 1e-2),
    ColumnScale::new("elev_lowestmode_a3", 1e-2),
    ColumnScale::new("elev_lowestmode_a4", 1e-2),
    ColumnScale::new("elev_lowestmode_a5", 1e-2),
    ColumnScale::new("elev_lowestmode_a6", 1e-2),
    ColumnScale::new("fhd_normal", 1e-2),
    // Ground and vegetation return energy
    ColumnScale::new("rg", 1e-1),
    ColumnScale::new("rv", 1e-1),
    // Plant area index
    ColumnScale::new("pai", 1e-3),
];

impl DecodingSchema {
    /// Scale factor for a column, `None` if the column is stored unscaled.
    pub fn scale_for(&self, column: &str) -> Option<f64> {
        self.scales
            .iter()
            .find(|s| s.column == column)
            .map(|s| s.factor)
    }

    /// Schema after decoding: scaled columns become nullable `Float64`.
    pub fn decoded_schema(&self, schema: &Schema) -> SchemaRef {
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|field| match self.scale_for(field.name()) {
                Some(_) => Field::new(field.name(), DataType::Float64, true),
                None => field.as_ref().clone(),
            })
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Decode every scaled column of a batch.
    pub fn decode_batch(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let schema = batch.schema();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            match self.scale_for(field.name()) {
                Some(factor) => columns.push(scale_column(column, factor)?),
                None => columns.push(column.clone()),
            }
        }

        Ok(RecordBatch::try_new(self.decoded_schema(&schema), columns)?)
    }
}

fn scale_column(column: &ArrayRef, factor: f64) -> Result<ArrayRef> {
    let widened = cast(column.as_ref(), &DataType::Float64)?;
    let scaled = widened
        .as_primitive::<Float64Type>()
        .unary::<_, Float64Type>(|v| v * factor);
    Ok(Arc::new(scaled) as ArrayRef)
}
