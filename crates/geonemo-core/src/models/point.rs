//! Query points, bounding boxes, and the working distance metric.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GeonemoError, Result};

/// Kilometers per degree of latitude (and of longitude at the equator)
pub const KM_PER_DEGREE: f64 = 111.32;

/// A query coordinate (longitude, latitude) in degrees
///
/// Constructed once from user input and never mutated. Construction rejects
/// non-finite coordinates so that no distance computed downstream can be NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct Point {
    lon: f64,
    lat: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    lon: f64,
    lat: f64,
}

impl TryFrom<RawPoint> for Point {
    type Error = GeonemoError;

    fn try_from(raw: RawPoint) -> Result<Self> {
        Point::new(raw.lon, raw.lat)
    }
}

impl Point {
    /// Create a point, failing when either coordinate is NaN or infinite
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeonemoError::InvalidPoint { lon, lat });
        }
        Ok(Self { lon, lat })
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Coordinates as `[x, y]`
    pub fn xy(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// How distances and bearings are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Coordinates are flat; distances come out in coordinate units
    Planar,
    /// Coordinates are WGS84 degrees; distances come out in meters
    #[default]
    Geodesic,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Planar => "planar",
            DistanceMetric::Geodesic => "geodesic",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = GeonemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "planar" | "flat" => Ok(DistanceMetric::Planar),
            "geodesic" | "wgs84" | "meters" => Ok(DistanceMetric::Geodesic),
            _ => Err(GeonemoError::ConfigInvalid {
                key: "metric".to_string(),
                reason: format!("Invalid metric: {}. Use planar or geodesic", s),
            }),
        }
    }
}

/// Axis-aligned rectangle `[min_lon, min_lat, max_lon, max_lat]`
///
/// Only ever used to reject candidates cheaply; containment in a box says
/// nothing about containment in the polygon it encloses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Build a box from two opposite corners in any order
    pub fn from_corners(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            min_lon: a[0].min(b[0]),
            min_lat: a[1].min(b[1]),
            max_lon: a[0].max(b[0]),
            max_lat: a[1].max(b[1]),
        }
    }

    /// Point containment, edges included
    pub fn contains_point(&self, point: &Point) -> bool {
        point.lon() >= self.min_lon
            && point.lon() <= self.max_lon
            && point.lat() >= self.min_lat
            && point.lat() <= self.max_lat
    }

    /// Two boxes overlap (touching edges count)
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let x_overlap = self.min_lon <= other.max_lon && self.max_lon >= other.min_lon;
        let y_overlap = self.min_lat <= other.max_lat && self.max_lat >= other.min_lat;

        x_overlap && y_overlap
    }

    /// Grow the box by `dx` horizontally and `dy` vertically on every side
    pub fn expand(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_lon: self.min_lon - dx,
            min_lat: self.min_lat - dy,
            max_lon: self.max_lon + dx,
            max_lat: self.max_lat + dy,
        }
    }

    /// Smallest box enclosing both
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Planar distance from a point to the box, zero when inside
    pub fn distance_to(&self, point: &Point) -> f64 {
        let dx = (self.min_lon - point.lon()).max(0.0).max(point.lon() - self.max_lon);
        let dy = (self.min_lat - point.lat()).max(0.0).max(point.lat() - self.max_lat);

        (dx * dx + dy * dy).sqrt()
    }

    /// Rough width and height in kilometers, assuming WGS84 degrees
    pub fn span_km(&self) -> (f64, f64) {
        let mean_lat = (self.min_lat + self.max_lat) / 2.0;
        let dy = (self.max_lat - self.min_lat).abs() * KM_PER_DEGREE;
        let dx = (self.max_lon - self.min_lon).abs() * KM_PER_DEGREE * mean_lat.to_radians().cos();
        (dx, dy)
    }

    pub fn min(&self) -> [f64; 2] {
        [self.min_lon, self.min_lat]
    }

    pub fn max(&self) -> [f64; 2] {
        [self.max_lon, self.max_lat]
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.min_lon, b.min_lat, b.max_lon, b.max_lat]
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = String;

    fn try_from(v: [f64; 4]) -> std::result::Result<Self, Self::Error> {
        if v.iter().any(|c| !c.is_finite()) {
            return Err("bbox coordinates must be finite".to_string());
        }
        if v[0] > v[2] || v[1] > v[3] {
            return Err(format!("bbox minimum exceeds maximum: {:?}", v));
        }
        Ok(Self { min_lon: v[0], min_lat: v[1], max_lon: v[2], max_lat: v[3] })
    }
}
