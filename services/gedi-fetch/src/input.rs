//! Parsing of query geometry and date range arguments.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use gedi_common::{BoundingBox, Coord, Geometry, MonthRange, MISSION_END, MISSION_START};

/// Where and when to look.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Bounding box as min_lon,min_lat,max_lon,max_lat
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["point", "geojson"])]
    pub bbox: Option<String>,

    /// Point as lon,lat
    #[arg(long, allow_hyphen_values = true, conflicts_with = "geojson")]
    pub point: Option<String>,

    /// GeoJSON geometry or feature, inline or @path/to/file.geojson
    #[arg(long)]
    pub geojson: Option<String>,

    /// First day of the period (YYYY-MM-DD)
    #[arg(long, default_value = MISSION_START)]
    pub start: String,

    /// Last day of the period (YYYY-MM-DD)
    #[arg(long, default_value = MISSION_END)]
    pub end: String,
}

impl QueryArgs {
    pub fn geometry(&self) -> Result<Geometry> {
        if let Some(bbox) = &self.bbox {
            let bbox = BoundingBox::from_bbox_string(bbox).context("invalid --bbox")?;
            return Ok(Geometry::from(bbox));
        }

        if let Some(point) = &self.point {
            return parse_point(point);
        }

        if let Some(geojson) = &self.geojson {
            let text = match geojson.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(PathBuf::from(path))
                    .with_context(|| format!("failed to read {}", path))?,
                None => geojson.clone(),
            };
            return Geometry::from_geojson_str(&text).context("invalid --geojson");
        }

        bail!("one of --bbox, --point or --geojson is required")
    }

    pub fn period(&self) -> Result<MonthRange> {
        Ok(MonthRange::parse(&self.start, &self.end)?)
    }
}

fn parse_point(s: &str) -> Result<Geometry> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        bail!("invalid --point '{}': expected lon,lat", s);
    }
    let x: f64 = parts[0].parse().with_context(|| format!("invalid longitude '{}'", parts[0]))?;
    let y: f64 = parts[1].parse().with_context(|| format!("invalid latitude '{}'", parts[1]))?;
    Ok(Geometry::Point(Coord::new(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> QueryArgs {
        QueryArgs {
            bbox: None,
            point: None,
            geojson: None,
            start: MISSION_START.to_string(),
            end: MISSION_END.to_string(),
        }
    }

    #[test]
    fn test_bbox_geometry() {
        let query = QueryArgs {
            bbox: Some("-1,-1,1,1".into()),
            ..args()
        };
        assert_eq!(query.geometry().unwrap().kind(), "Polygon");
    }

    #[test]
    fn test_point_geometry() {
        let query = QueryArgs {
            point: Some("13.4, 52.5".into()),
            ..args()
        };
        assert_eq!(
            query.geometry().unwrap(),
            Geometry::Point(Coord::new(13.4, 52.5))
        );
        assert!(parse_point("13.4").is_err());
    }

    #[test]
    fn test_geojson_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aoi.geojson");
        std::fs::write(&path, r#"{"type":"Point","coordinates":[1.5,2.5]}"#).unwrap();

        let query = QueryArgs {
            geojson: Some(format!("@{}", path.display())),
            ..args()
        };
        assert_eq!(query.geometry().unwrap(), Geometry::Point(Coord::new(1.5, 2.5)));
    }

    #[test]
    fn test_missing_geometry() {
        assert!(args().geometry().is_err());
    }

    #[test]
    fn test_default_period_is_mission() {
        assert!(args().period().unwrap().is_mission());
    }
}
