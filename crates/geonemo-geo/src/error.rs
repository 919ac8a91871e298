//! Geometry-level failures
//!
//! These never leave the membership resolver: a feature that fails a test is
//! logged and skipped.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Ring is empty")]
    EmptyRing,

    #[error("Ring has {found} vertices, at least {required} required")]
    TooFewVertices { found: usize, required: usize },

    #[error("Non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    #[error("Malformed position: expected at least 2 numbers, found {found}")]
    MalformedPosition { found: usize },

    #[error("Geometry has no rings")]
    NoRings,
}
