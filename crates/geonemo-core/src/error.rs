//! Error types for GeoNEMO

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeonemoError {
    // Query errors
    #[error("Invalid query point ({lon}, {lat}): coordinates must be finite")]
    InvalidPoint { lon: f64, lat: f64 },

    // Group catalog errors
    #[error("Group catalog not found at {path}")]
    CatalogNotFound { path: PathBuf },

    #[error("Invalid group catalog: {reason}")]
    CatalogInvalid { reason: String },

    #[error("Invalid group '{group_id}': {reason}")]
    InvalidGroup { group_id: String, reason: String },

    // Source errors
    #[error("Failed to load '{reference}': {reason}")]
    Load { reference: String, reason: String },

    #[error("Invalid GeoJSON in '{reference}': {reason}")]
    GeoJson { reference: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeonemoError {
    /// Build a load error for a file reference
    pub fn load(reference: impl Into<String>, reason: impl ToString) -> Self {
        GeonemoError::Load { reference: reference.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, GeonemoError>;
