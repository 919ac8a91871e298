//! GeoNEMO Core - Domain models, configuration, and ports
//!
//! This crate contains the domain types shared by every GeoNEMO crate: query
//! points, bounding boxes, group catalogs, per-group outcomes, the layered
//! configuration, and the port through which polygon files are loaded.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{GeonemoError, Result};
