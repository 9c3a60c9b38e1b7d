//! 1°×1° tile index of the GEDI L2 point dataset.
//!
//! Tiles are named after the integer south-west corner of their cell,
//! e.g. `012E_45N` covers lon [12, 13) × lat [45, 46) and `001W_01S`
//! covers lon [-1, 0) × lat [-1, 0).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{GediError, GediResult};
use crate::geometry::{Geometry, POINT_BUFFER_DEGREES};

const MIN_LON_CELL: i32 = -180;
const MAX_LON_CELL: i32 = 179;
const MIN_LAT_CELL: i32 = -90;
const MAX_LAT_CELL: i32 = 89;

/// Identifier of a 1°×1° tile, `{lon}{E|W}_{lat}{N|S}`.
///
/// Deserialization goes through [`FromStr`], so every `TileId` names a valid cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct TileId(String);

impl TileId {
    /// Build the id of the cell whose south-west corner is (`lon`, `lat`).
    pub fn from_cell(lon: i32, lat: i32) -> Self {
        Self(format!("{}_{}", lon_label(lon), lat_label(lat)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// South-west corner of the cell as integer degrees.
    pub fn cell(&self) -> (i32, i32) {
        let (lon, lat) = self.0.split_once('_').unwrap_or(("000E", "00N"));
        (parse_axis(lon, 'E', 'W').unwrap_or(0), parse_axis(lat, 'N', 'S').unwrap_or(0))
    }

    /// Geographic extent of the cell.
    pub fn bbox(&self) -> BoundingBox {
        let (lon, lat) = self.cell();
        BoundingBox::new(lon as f64, lat as f64, lon as f64 + 1.0, lat as f64 + 1.0)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TileId {
    type Err = GediError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GediError::InvalidTileId(s.to_string());
        let (lon, lat) = s.split_once('_').ok_or_else(invalid)?;
        if lon.len() != 4 || lat.len() != 3 {
            return Err(invalid());
        }
        let lon = parse_axis(lon, 'E', 'W').ok_or_else(invalid)?;
        let lat = parse_axis(lat, 'N', 'S').ok_or_else(invalid)?;
        Ok(Self::from_cell(lon, lat))
    }
}

impl TryFrom<String> for TileId {
    type Error = GediError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn lon_label(lon: i32) -> String {
    if lon >= 0 {
        format!("{:03}E", lon)
    } else {
        format!("{:03}W", -lon)
    }
}

fn lat_label(lat: i32) -> String {
    if lat >= 0 {
        format!("{:02}N", lat)
    } else {
        format!("{:02}S", -lat)
    }
}

fn parse_axis(label: &str, positive: char, negative: char) -> Option<i32> {
    let (digits, sign) = if let Some(d) = label.strip_suffix(positive) {
        (d, 1)
    } else {
        (label.strip_suffix(negative)?, -1)
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i32>().ok().map(|v| sign * v)
}

/// Inclusive range of cell indices whose cells intersect [min, max].
///
/// An axis no wider than the point buffer is a single coordinate and maps to
/// the cell containing it, even on a grid line.
fn cell_range(min: f64, max: f64, lo: i32, hi: i32) -> std::ops::RangeInclusive<i32> {
    if max - min <= 4.0 * POINT_BUFFER_DEGREES {
        let cell = (((min + max) / 2.0).floor() as i32).clamp(lo, hi);
        return cell..=cell;
    }

    let start = (min.floor() as i32).clamp(lo, hi);
    let end = ((max.ceil() as i32) - 1).clamp(lo, hi).max(start);
    start..=end
}

/// Tile ids covering an envelope, longitude-major then latitude.
pub fn tiles_for_bbox(bbox: &BoundingBox) -> Vec<TileId> {
    let lons = cell_range(bbox.min_x, bbox.max_x, MIN_LON_CELL, MAX_LON_CELL);
    let lats = cell_range(bbox.min_y, bbox.max_y, MIN_LAT_CELL, MAX_LAT_CELL);

    lons.flat_map(|lon| lats.clone().map(move |lat| TileId::from_cell(lon, lat)))
        .collect()
}

/// Tile ids whose cells intersect the geometry's envelope.
pub fn tiles_for_geometry(geometry: &Geometry) -> GediResult<Vec<TileId>> {
    let envelope = geometry.envelope()?;
    Ok(tiles_for_bbox(&envelope))
}
