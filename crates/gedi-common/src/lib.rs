//! Common types shared across the GEDI L2 retrieval crates.
//!
//! - [`geometry`]: input geometries and their envelopes
//! - [`tile`]: the 1°×1° tile index
//! - [`time`]: year/month partition keys and period compression

pub mod bbox;
pub mod error;
pub mod geometry;
pub mod tile;
pub mod time;

pub use bbox::{BboxParseError, BoundingBox};
pub use error::{GediError, GediResult};
pub use geometry::{Coord, Geometry, Polygon, POINT_BUFFER_DEGREES};
pub use tile::{tiles_for_bbox, tiles_for_geometry, TileId};
pub use time::{
    compress_months, compress_periods, MonthRange, TimeBlock, YearMonth, MISSION_END,
    MISSION_START,
};
