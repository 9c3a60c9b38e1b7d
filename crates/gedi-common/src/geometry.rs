//! Input geometries in lon/lat degrees (EPSG:4326).
//!
//! Only the four kinds the tile index understands are representable:
//! points, line strings, polygons and multi-polygons. Anything else arriving
//! through GeoJSON is rejected with [`GediError::UnsupportedGeometryKind`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bbox::BoundingBox;
use crate::error::{GediError, GediResult};

/// Buffer applied to points and lines so their envelope is not zero-area.
pub const POINT_BUFFER_DEGREES: f64 = 1e-10;

/// A single lon/lat position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Polygon with an exterior ring and optional holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Coord>,
    pub interiors: Vec<Vec<Coord>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Coord>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    /// Closed rectangular ring covering `bbox`.
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        Self::new(vec![
            Coord::new(bbox.min_x, bbox.min_y),
            Coord::new(bbox.max_x, bbox.min_y),
            Coord::new(bbox.max_x, bbox.max_y),
            Coord::new(bbox.min_x, bbox.max_y),
            Coord::new(bbox.min_x, bbox.min_y),
        ])
    }
}

/// Supported geometry kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// GeoJSON type name of this geometry.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Bounding envelope used for tile lookup.
    ///
    /// Points and lines are buffered by [`POINT_BUFFER_DEGREES`] first;
    /// polygons use their exterior envelope directly.
    pub fn envelope(&self) -> GediResult<BoundingBox> {
        match self {
            Geometry::Point(c) => {
                Ok(BoundingBox::new(c.x, c.y, c.x, c.y).expand(POINT_BUFFER_DEGREES))
            }
            Geometry::LineString(coords) => {
                Ok(coords_envelope(coords, self.kind())?.expand(POINT_BUFFER_DEGREES))
            }
            Geometry::Polygon(poly) => coords_envelope(&poly.exterior, self.kind()),
            Geometry::MultiPolygon(polys) => {
                let mut envelope: Option<BoundingBox> = None;
                for poly in polys {
                    let env = coords_envelope(&poly.exterior, self.kind())?;
                    envelope = Some(match envelope {
                        Some(acc) => acc.union(&env),
                        None => env,
                    });
                }
                envelope.ok_or_else(|| GediError::EmptyGeometry(self.kind().to_string()))
            }
        }
    }

    /// Parse a GeoJSON geometry (or a Feature wrapping one).
    pub fn from_geojson(value: &Value) -> GediResult<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| GediError::InvalidGeoJson("missing 'type' member".to_string()))?;

        if kind == "Feature" {
            let geometry = value
                .get("geometry")
                .ok_or_else(|| GediError::InvalidGeoJson("Feature without geometry".to_string()))?;
            return Self::from_geojson(geometry);
        }

        let coords = || {
            value
                .get("coordinates")
                .ok_or_else(|| GediError::InvalidGeoJson(format!("{} without coordinates", kind)))
        };

        match kind {
            "Point" => Ok(Geometry::Point(parse_position(coords()?)?)),
            "LineString" => Ok(Geometry::LineString(parse_ring(coords()?)?)),
            "Polygon" => Ok(Geometry::Polygon(parse_polygon(coords()?)?)),
            "MultiPolygon" => {
                let polys = as_array(coords()?)?
                    .iter()
                    .map(parse_polygon)
                    .collect::<GediResult<Vec<_>>>()?;
                Ok(Geometry::MultiPolygon(polys))
            }
            other => Err(GediError::UnsupportedGeometryKind(other.to_string())),
        }
    }

    /// Parse a GeoJSON document from text.
    pub fn from_geojson_str(s: &str) -> GediResult<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_geojson(&value)
    }
}

impl From<BoundingBox> for Geometry {
    fn from(bbox: BoundingBox) -> Self {
        Geometry::Polygon(Polygon::from_bbox(&bbox))
    }
}

fn coords_envelope(coords: &[Coord], kind: &str) -> GediResult<BoundingBox> {
    let first = coords
        .first()
        .ok_or_else(|| GediError::EmptyGeometry(kind.to_string()))?;

    let init = BoundingBox::new(first.x, first.y, first.x, first.y);
    Ok(coords.iter().skip(1).fold(init, |acc, c| {
        BoundingBox::new(
            acc.min_x.min(c.x),
            acc.min_y.min(c.y),
            acc.max_x.max(c.x),
            acc.max_y.max(c.y),
        )
    }))
}

fn as_array(value: &Value) -> GediResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| GediError::InvalidGeoJson(format!("expected array, got {}", value)))
}

fn parse_position(value: &Value) -> GediResult<Coord> {
    let arr = as_array(value)?;
    if arr.len() < 2 {
        return Err(GediError::InvalidGeoJson(format!(
            "position needs at least 2 numbers, got {}",
            value
        )));
    }
    let num = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| GediError::InvalidGeoJson(format!("not a number: {}", v)))
    };
    Ok(Coord::new(num(&arr[0])?, num(&arr[1])?))
}

fn parse_ring(value: &Value) -> GediResult<Vec<Coord>> {
    as_array(value)?.iter().map(parse_position).collect()
}

fn parse_polygon(value: &Value) -> GediResult<Polygon> {
    let rings = as_array(value)?
        .iter()
        .map(parse_ring)
        .collect::<GediResult<Vec<_>>>()?;
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| GediError::EmptyGeometry("Polygon".to_string()))?;
    Ok(Polygon {
        exterior,
        interiors: rings.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_envelope_is_buffered() {
        let env = Geometry::Point(Coord::new(10.5, -3.25)).envelope().unwrap();
        assert!(env.width() > 0.0);
        assert!((env.min_x - (10.5 - POINT_BUFFER_DEGREES)).abs() < 1e-15);
        assert!((env.max_y - (-3.25 + POINT_BUFFER_DEGREES)).abs() < 1e-15);
    }

    #[test]
    fn test_multipolygon_envelope_covers_all_members() {
        let a = Polygon::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let b = Polygon::from_bbox(&BoundingBox::new(5.0, -4.0, 6.0, -3.0));
        let env = Geometry::MultiPolygon(vec![a, b]).envelope().unwrap();
        assert_eq!(env, BoundingBox::new(0.0, -4.0, 6.0, 1.0));
    }

    #[test]
    fn test_empty_linestring_is_rejected() {
        let result = Geometry::LineString(vec![]).envelope();
        assert!(matches!(result, Err(GediError::EmptyGeometry(_))));
    }

    #[test]
    fn test_geojson_feature_polygon() {
        let doc = json!({
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 0.0]]]
            }
        });
        let geom = Geometry::from_geojson(&doc).unwrap();
        assert_eq!(geom.kind(), "Polygon");
        assert_eq!(geom.envelope().unwrap(), BoundingBox::new(0.0, 0.0, 2.0, 1.0));
    }

    #[test]
    fn test_geojson_unsupported_kind() {
        let doc = json!({"type": "MultiPoint", "coordinates": [[0.0, 0.0], [1.0, 1.0]]});
        match Geometry::from_geojson(&doc) {
            Err(GediError::UnsupportedGeometryKind(kind)) => assert_eq!(kind, "MultiPoint"),
            other => panic!("expected UnsupportedGeometryKind, got {:?}", other),
        }
    }
}
