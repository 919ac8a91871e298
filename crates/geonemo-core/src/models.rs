pub mod group;
pub mod outcome;
pub mod point;
pub mod surface;

pub use group::{GroupCatalog, GroupDefinition, PickStrategy};
pub use outcome::{FeatureMatch, GroupOutcome, LoadFailure, Membership, Status};
pub use point::{BoundingBox, DistanceMetric, Point};
pub use surface::{Surface, SurfaceOrigin};
