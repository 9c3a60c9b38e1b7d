//! Error types for geometry, tile and time-block handling.

use thiserror::Error;

/// Result type alias using GediError.
pub type GediResult<T> = Result<T, GediError>;

/// Errors raised while turning caller input into tile ids and time blocks.
#[derive(Debug, Error)]
pub enum GediError {
    // === Geometry Errors ===
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometryKind(String),

    #[error("Geometry has no coordinates: {0}")]
    EmptyGeometry(String),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Invalid tile id: {0}")]
    InvalidTileId(String),

    // === Time Errors ===
    #[error("Malformed time block '{value}': {message}")]
    MalformedTimeBlock { value: String, message: String },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

impl GediError {
    /// Create a MalformedTimeBlock error.
    pub fn malformed_time_block(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedTimeBlock {
            value: value.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GediError {
    fn from(err: serde_json::Error) -> Self {
        GediError::InvalidGeoJson(err.to_string())
    }
}
