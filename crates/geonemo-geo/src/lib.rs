//! GeoNEMO Geo - Geometry primitives, feature indexing, and membership resolution
//!
//! This crate turns parsed GeoJSON into indexed polygon features and answers,
//! for a single query point, which feature contains it or which feature's
//! boundary lies closest.

pub mod containment;
pub mod convert;
pub mod error;
pub mod index;
pub mod primitives;
pub mod resolver;
pub mod surface;

pub use error::GeometryError;
pub use index::{build_index, FeatureIndex, IndexEntry, IndexOptions};
pub use resolver::{MembershipResolver, Resolution, ScanStats};
