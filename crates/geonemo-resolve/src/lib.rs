//! GeoNEMO Resolve - Group resolution and result aggregation
//!
//! This crate implements the click use case: load every file of every enabled
//! group once, pick one winner per group, then order and partition the
//! outcomes for display.

pub mod aggregate;
pub mod cache;
pub mod payload;
pub mod policy;
pub mod sources;

pub use aggregate::{compare_outcomes, partition, rank, sort_outcomes, Partition};
pub use cache::FeatureCache;
pub use payload::{Click, ResultPayload, Summary};
pub use policy::GroupResolver;
pub use sources::{http_client, CatalogSource, FsSource, HttpSource};
