//! Tests for geometry → tile id resolution.

use std::collections::BTreeSet;

use gedi_common::{
    tiles_for_bbox, tiles_for_geometry, BoundingBox, Coord, GediError, Geometry, Polygon, TileId,
};

fn ids(tiles: &[TileId]) -> BTreeSet<String> {
    tiles.iter().map(|t| t.to_string()).collect()
}

// ============================================================================
// Points and lines
// ============================================================================

#[test]
fn test_point_yields_single_tile() {
    let points = [
        (0.5, 0.5, "000E_00N"),
        (-0.5, -0.5, "001W_01S"),
        (13.37, 52.52, "013E_52N"),
        (-122.42, 37.77, "123W_37N"),
        (151.2, -33.87, "151E_34S"),
    ];

    for (x, y, expected) in points {
        let tiles = tiles_for_geometry(&Geometry::Point(Coord::new(x, y))).unwrap();
        assert_eq!(tiles.len(), 1, "point ({}, {})", x, y);
        assert_eq!(tiles[0].as_str(), expected);
    }
}

#[test]
fn test_point_on_grid_lines_yields_containing_tile() {
    let points = [
        (13.0, 52.0, "013E_52N"),
        (0.0, 0.0, "000E_00N"),
        (10.0, 45.5, "010E_45N"),
        (-1.0, -1.0, "001W_01S"),
        (-122.0, 37.5, "122W_37N"),
    ];

    for (x, y, expected) in points {
        let tiles = tiles_for_geometry(&Geometry::Point(Coord::new(x, y))).unwrap();
        assert_eq!(tiles.len(), 1, "point ({}, {})", x, y);
        assert_eq!(tiles[0].as_str(), expected);
    }
}

#[test]
fn test_meridian_aligned_line_stays_in_one_column() {
    let line = Geometry::LineString(vec![Coord::new(10.0, 45.2), Coord::new(10.0, 45.8)]);
    let tiles = tiles_for_geometry(&line).unwrap();
    assert_eq!(ids(&tiles), BTreeSet::from(["010E_45N".to_string()]));
}

#[test]
fn test_short_line_inside_one_cell_yields_single_tile() {
    let line = Geometry::LineString(vec![Coord::new(10.1, 45.1), Coord::new(10.9, 45.8)]);
    let tiles = tiles_for_geometry(&line).unwrap();
    assert_eq!(ids(&tiles), BTreeSet::from(["010E_45N".to_string()]));
}

#[test]
fn test_line_crossing_cells() {
    let line = Geometry::LineString(vec![Coord::new(10.5, 45.5), Coord::new(12.5, 45.5)]);
    let tiles = tiles_for_geometry(&line).unwrap();
    let expected: BTreeSet<String> = ["010E_45N", "011E_45N", "012E_45N"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(ids(&tiles), expected);
}

// ============================================================================
// Polygons
// ============================================================================

#[test]
fn test_polygon_around_origin() {
    let poly = Geometry::from(BoundingBox::new(-1.0, -1.0, 1.0, 1.0));
    let tiles = tiles_for_geometry(&poly).unwrap();

    assert_eq!(tiles.len(), 4);
    let expected: BTreeSet<String> = ["000E_00N", "000E_01S", "001W_00N", "001W_01S"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(ids(&tiles), expected);
}

#[test]
fn test_tiles_are_longitude_major() {
    let tiles = tiles_for_bbox(&BoundingBox::new(-1.0, -1.0, 1.0, 1.0));
    let order: Vec<&str> = tiles.iter().map(|t| t.as_str()).collect();
    assert_eq!(order, vec!["001W_01S", "001W_00N", "000E_01S", "000E_00N"]);
}

#[test]
fn test_multipolygon_uses_combined_envelope() {
    let a = Polygon::from_bbox(&BoundingBox::new(5.2, 5.2, 5.8, 5.8));
    let b = Polygon::from_bbox(&BoundingBox::new(6.2, 6.2, 6.8, 6.8));
    let tiles = tiles_for_geometry(&Geometry::MultiPolygon(vec![a, b])).unwrap();
    // Envelope spans two cells in each direction, including the unused corners.
    assert_eq!(tiles.len(), 4);
    assert!(ids(&tiles).contains("005E_06N"));
}

#[test]
fn test_zero_padding_far_from_origin() {
    let tiles = tiles_for_bbox(&BoundingBox::new(-100.5, -9.5, -100.2, -9.2));
    assert_eq!(tiles.len(), 1);
    assert_eq!(tiles[0].as_str(), "101W_10S");
}

#[test]
fn test_antimeridian_is_clamped() {
    let tiles = tiles_for_bbox(&BoundingBox::new(179.5, 0.5, 185.0, 0.7));
    assert_eq!(ids(&tiles), BTreeSet::from(["179E_00N".to_string()]));
}

// ============================================================================
// GeoJSON input
// ============================================================================

#[test]
fn test_geojson_point() {
    let geom = Geometry::from_geojson_str(r#"{"type":"Point","coordinates":[8.25,47.1]}"#).unwrap();
    let tiles = tiles_for_geometry(&geom).unwrap();
    assert_eq!(tiles[0].as_str(), "008E_47N");
}

#[test]
fn test_geojson_unsupported_geometry_kind() {
    let result = Geometry::from_geojson_str(
        r#"{"type":"GeometryCollection","geometries":[]}"#,
    );
    assert!(matches!(result, Err(GediError::UnsupportedGeometryKind(_))));
}

#[test]
fn test_geojson_garbage() {
    let result = Geometry::from_geojson_str("not json");
    assert!(matches!(result, Err(GediError::InvalidGeoJson(_))));
}
