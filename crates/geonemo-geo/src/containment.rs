//! Exact point-in-polygon tests.

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, MultiPolygon, Polygon};
use geonemo_core::models::Point;

use crate::error::GeometryError;
use crate::primitives::check_ring;

/// Whether `point` lies inside `geometry`, boundary included
///
/// Holes are subtracted. A multipolygon contains the point when any of its
/// polygons does. Rings with fewer than three vertices or non-finite
/// coordinates are reported as errors instead of being tested.
pub fn point_in_polygon(point: &Point, geometry: &MultiPolygon<f64>) -> Result<bool, GeometryError> {
    let coord = Coord { x: point.lon(), y: point.lat() };

    if geometry.0.is_empty() {
        return Err(GeometryError::NoRings);
    }

    for polygon in &geometry.0 {
        if polygon_contains(polygon, &coord)? {
            return Ok(true);
        }
    }

    Ok(false)
}

fn polygon_contains(polygon: &Polygon<f64>, coord: &Coord<f64>) -> Result<bool, GeometryError> {
    check_ring(&polygon.exterior().0, 3)?;
    for hole in polygon.interiors() {
        check_ring(&hole.0, 3)?;
    }

    Ok(polygon.coordinate_position(coord) != CoordPos::Outside)
}
