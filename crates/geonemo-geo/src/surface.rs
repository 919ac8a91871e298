//! Surface resolution: attribute first, geometry as fallback.
//!
//! Polygon layers usually carry a surface attribute, but its name, unit and
//! number format vary between publishers. Candidate keys are scored by name,
//! their values parsed with unit handling, and when nothing parses the area
//! is computed from the geometry.

use geo::{Area, GeodesicArea, MultiPolygon};
use geonemo_core::models::{DistanceMetric, Surface};
use serde_json::{Map, Value};

/// Unit-less values below this are read as hectares, others as square meters
pub const HECTARE_HEURISTIC_LIMIT: f64 = 5_000_000.0;

const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;
const SQUARE_METERS_PER_KM2: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    SquareMeters,
    Hectares,
    SquareKilometers,
}

impl Unit {
    fn factor(&self) -> f64 {
        match self {
            Unit::SquareMeters => 1.0,
            Unit::Hectares => SQUARE_METERS_PER_HECTARE,
            Unit::SquareKilometers => SQUARE_METERS_PER_KM2,
        }
    }
}

/// Surface of a feature from its attributes, falling back to its geometry
///
/// Returns `None` only when no attribute parses and the geometric area is
/// zero or not finite.
pub fn resolve_surface(
    properties: Option<&Map<String, Value>>,
    geometry: &MultiPolygon<f64>,
    metric: DistanceMetric,
) -> Option<Surface> {
    properties.and_then(surface_from_attributes).or_else(|| surface_from_geometry(geometry, metric))
}

/// Best surface attribute, normalized to square meters
pub fn surface_from_attributes(properties: &Map<String, Value>) -> Option<Surface> {
    let mut candidates: Vec<(i32, &String, &Value)> = properties
        .iter()
        .filter_map(|(key, value)| {
            let score = score_key(key);
            (score > 0).then_some((score, key, value))
        })
        .collect();

    // Stable: equal scores keep attribute order
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    candidates.into_iter().find_map(|(_, key, value)| {
        parse_surface(value, key).map(|square_meters| Surface::from_attribute(square_meters, key.as_str()))
    })
}

/// Geometric area: ellipsoidal for WGS84 input, planar otherwise
pub fn surface_from_geometry(geometry: &MultiPolygon<f64>, metric: DistanceMetric) -> Option<Surface> {
    let area = match metric {
        DistanceMetric::Geodesic => geometry.geodesic_area_unsigned(),
        DistanceMetric::Planar => geometry.unsigned_area(),
    };

    (area.is_finite() && area > 0.0).then(|| Surface::from_geometry(area))
}

fn score_key(key: &str) -> i32 {
    let k = key.to_lowercase();
    let mut score = 0;

    if k.contains("superficie") || k.contains("surface") || k.starts_with("sup_") || k == "sup" {
        score += 3;
    }
    if k.contains("area") {
        score += 2;
    }
    if ["perim", "length", "leng", "largo", "long"].iter().any(|p| k.contains(p)) {
        score -= 5;
    }

    score
}

fn unit_from_key(key: &str) -> Option<Unit> {
    let k = key.to_lowercase();
    if k.contains("km2") || k.contains("km²") || k.ends_with("_km") {
        Some(Unit::SquareKilometers)
    } else if k.ends_with("_ha") || k.contains("hect") {
        Some(Unit::Hectares)
    } else if k.contains("m2") || k.contains("m²") {
        Some(Unit::SquareMeters)
    } else {
        None
    }
}

fn parse_surface(value: &Value, key: &str) -> Option<f64> {
    let (number, unit) = match value {
        Value::Number(n) => (n.as_f64()?, None),
        Value::String(s) => parse_text(s)?,
        _ => return None,
    };

    if !number.is_finite() || number <= 0.0 {
        return None;
    }

    let unit = unit.or_else(|| unit_from_key(key)).unwrap_or(if number < HECTARE_HEURISTIC_LIMIT {
        Unit::Hectares
    } else {
        Unit::SquareMeters
    });

    Some(number * unit.factor())
}

fn parse_text(raw: &str) -> Option<(f64, Option<Unit>)> {
    let text = raw.trim().to_lowercase();

    let (digits, unit) = if let Some(rest) = strip_unit(&text, &["km²", "km2"]) {
        (rest, Some(Unit::SquareKilometers))
    } else if let Some(rest) = strip_unit(&text, &["m²", "m2"]) {
        (rest, Some(Unit::SquareMeters))
    } else if let Some(rest) = strip_unit(&text, &["hectáreas", "hectareas", "hectares", "ha"]) {
        (rest, Some(Unit::Hectares))
    } else {
        (text.as_str(), None)
    };

    parse_number(digits).map(|n| (n, unit))
}

fn strip_unit<'a>(text: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| text.strip_suffix(suffix)).map(str::trim_end)
}

/// Parse a number written with either decimal separator
///
/// With both `.` and `,` present the last one is the decimal separator. A
/// lone comma is a decimal separator; repeated commas group thousands.
fn parse_number(text: &str) -> Option<f64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    if compact.is_empty() {
        return None;
    }

    let normalized = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (None, Some(_)) if compact.matches(',').count() == 1 => compact.replace(',', "."),
        (None, Some(_)) => compact.replace(',', ""),
        _ => compact,
    };

    normalized.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use geonemo_core::models::SurfaceOrigin;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn unit_square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn test_unitless_small_value_is_hectares() {
        let surface = surface_from_attributes(&props(json!({"SUPERFICIE": 8000}))).unwrap();
        assert_eq!(surface.square_meters, 80_000_000.0);
        assert_eq!(surface.hectares(), 8_000.0);
        assert_eq!(surface.origin, SurfaceOrigin::Attribute { key: "SUPERFICIE".to_string() });
    }

    #[test]
    fn test_unitless_large_value_is_square_meters() {
        let surface = surface_from_attributes(&props(json!({"area": 12_500_000.0}))).unwrap();
        assert_eq!(surface.square_meters, 12_500_000.0);
    }

    #[test]
    fn test_unit_suffixes_and_comma_decimals() {
        let km = surface_from_attributes(&props(json!({"Superficie": "1,5 km²"}))).unwrap();
        assert_eq!(km.square_meters, 1_500_000.0);

        let ha = surface_from_attributes(&props(json!({"superficie": "1.234,5 ha"}))).unwrap();
        assert_eq!(ha.square_meters, 12_345_000.0);

        let m2 = surface_from_attributes(&props(json!({"surface": "900 m2"}))).unwrap();
        assert_eq!(m2.square_meters, 900.0);
    }

    #[test]
    fn test_key_hint_sets_unit() {
        let surface = surface_from_attributes(&props(json!({"area_km2": 3.0}))).unwrap();
        assert_eq!(surface.square_kilometers(), 3.0);
    }

    #[test]
    fn test_perimeter_fields_are_ignored() {
        let properties = props(json!({"SHAPE_Length": 5000.0, "perimetro_area": 10.0}));
        assert!(surface_from_attributes(&properties).is_none());
    }

    #[test]
    fn test_higher_score_wins() {
        let properties = props(json!({"area_tipo": 1.0, "superficie": 2.0}));
        let surface = surface_from_attributes(&properties).unwrap();
        assert_eq!(surface.origin, SurfaceOrigin::Attribute { key: "superficie".to_string() });
    }

    #[test]
    fn test_unparseable_attribute_falls_back_to_geometry() {
        let properties = props(json!({"superficie": "sin dato"}));
        let surface =
            resolve_surface(Some(&properties), &unit_square(), DistanceMetric::Planar).unwrap();
        assert_eq!(surface.origin, SurfaceOrigin::Geometry);
        assert_eq!(surface.square_meters, 4.0);
    }

    #[test]
    fn test_geodesic_area_fallback() {
        // A 2x2 degree square at the equator is close to 49,400 km²
        let surface = resolve_surface(None, &unit_square(), DistanceMetric::Geodesic).unwrap();
        let km2 = surface.square_kilometers();
        assert!((km2 - 49_400.0).abs() < 1_000.0, "got {}", km2);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_number("1.234.567,5"), Some(1_234_567.5));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("abc"), None);
    }
}
