use serde::{Deserialize, Serialize};

/// Where a surface value came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum SurfaceOrigin {
    /// Parsed from a feature attribute
    Attribute { key: String },
    /// Computed from the feature geometry
    Geometry,
}

/// Surface of a feature, normalized to square meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub square_meters: f64,
    pub origin: SurfaceOrigin,
}

impl Surface {
    pub fn from_attribute(square_meters: f64, key: impl Into<String>) -> Self {
        Self { square_meters, origin: SurfaceOrigin::Attribute { key: key.into() } }
    }

    pub fn from_geometry(square_meters: f64) -> Self {
        Self { square_meters, origin: SurfaceOrigin::Geometry }
    }

    pub fn hectares(&self) -> f64 {
        self.square_meters / 10_000.0
    }

    pub fn square_kilometers(&self) -> f64 {
        self.square_meters / 1_000_000.0
    }
}
