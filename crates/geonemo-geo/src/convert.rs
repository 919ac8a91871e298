//! GeoJSON to `geo` conversion for polygonal features.
//!
//! Conversion is written out by hand so that short positions and non-finite
//! numbers surface as [`GeometryError`] values instead of panics.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, PolygonType, Position};

use crate::error::GeometryError;

/// Convert a GeoJSON geometry value into a multipolygon
///
/// Returns `Ok(None)` for non-polygonal geometry (points, lines, collections),
/// which callers drop silently.
pub fn to_multipolygon(value: &geojson::Value) -> Result<Option<MultiPolygon<f64>>, GeometryError> {
    match value {
        geojson::Value::Polygon(rings) => Ok(Some(MultiPolygon(vec![to_polygon(rings)?]))),
        geojson::Value::MultiPolygon(polygons) => {
            let polygons = polygons.iter().map(|rings| to_polygon(rings)).collect::<Result<_, _>>()?;
            Ok(Some(MultiPolygon(polygons)))
        }
        _ => Ok(None),
    }
}

/// Whether a geometry value is one the index keeps
pub fn is_polygonal(value: &geojson::Value) -> bool {
    matches!(value, geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_))
}

/// GeoJSON `type` name of a geometry value
pub fn geometry_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Number of positions in a geometry value, over all parts
pub fn position_count(value: &geojson::Value) -> usize {
    match value {
        geojson::Value::Point(_) => 1,
        geojson::Value::MultiPoint(points) => points.len(),
        geojson::Value::LineString(line) => line.len(),
        geojson::Value::MultiLineString(lines) => lines.iter().map(Vec::len).sum(),
        geojson::Value::Polygon(rings) => rings.iter().map(Vec::len).sum(),
        geojson::Value::MultiPolygon(polygons) => {
            polygons.iter().flat_map(|rings| rings.iter()).map(Vec::len).sum()
        }
        geojson::Value::GeometryCollection(geometries) => {
            geometries.iter().map(|g| position_count(&g.value)).sum()
        }
    }
}

/// Normalize any top-level GeoJSON document into a feature collection
///
/// A single feature, or a bare geometry, becomes a one-feature collection.
pub fn into_feature_collection(geojson: GeoJson) -> FeatureCollection {
    match geojson {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(feature) => single(feature),
        GeoJson::Geometry(geometry) => single(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }),
    }
}

fn single(feature: Feature) -> FeatureCollection {
    FeatureCollection { bbox: None, features: vec![feature], foreign_members: None }
}

fn to_polygon(rings: &PolygonType) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.iter();
    let exterior = rings.next().ok_or(GeometryError::NoRings)?;
    let interiors = rings.map(|ring| to_ring(ring)).collect::<Result<Vec<_>, _>>()?;

    Ok(Polygon::new(to_ring(exterior)?, interiors))
}

fn to_ring(positions: &[Position]) -> Result<LineString<f64>, GeometryError> {
    positions
        .iter()
        .map(|position| {
            if position.len() < 2 {
                return Err(GeometryError::MalformedPosition { found: position.len() });
            }
            let (x, y) = (position[0], position[1]);
            if !x.is_finite() || !y.is_finite() {
                return Err(GeometryError::NonFiniteCoordinate { x, y });
            }
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::from)
}
