use crate::error::{GeonemoError, Result};
use crate::models::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default near/far partition threshold in meters
pub const DEFAULT_DRAW_THRESHOLD_M: f64 = 300_000.0;

/// Default vertex count above which the inspector flags a feature
pub const DEFAULT_HEAVY_VERTEX_THRESHOLD: usize = 200_000;

/// Default limit in seconds for a single HTTP fetch
pub const DEFAULT_FETCH_TIMEOUT_S: u64 = 30;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has at least the current precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() >= self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for GeoNEMO
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub groups_file: ConfigValue<PathBuf>,
    pub base_url: ConfigValue<Option<String>>,
    pub metric: ConfigValue<DistanceMetric>,
    pub draw_threshold_m: ConfigValue<f64>,
    pub compute_area: ConfigValue<bool>,
    pub heavy_vertex_threshold: ConfigValue<usize>,
    pub fetch_timeout_s: ConfigValue<u64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            groups_file: ConfigValue::new(PathBuf::from("capas/grupos.json"), ConfigSource::Default),
            base_url: ConfigValue::new(None, ConfigSource::Default),
            metric: ConfigValue::new(DistanceMetric::Geodesic, ConfigSource::Default),
            draw_threshold_m: ConfigValue::new(DEFAULT_DRAW_THRESHOLD_M, ConfigSource::Default),
            compute_area: ConfigValue::new(true, ConfigSource::Default),
            heavy_vertex_threshold: ConfigValue::new(
                DEFAULT_HEAVY_VERTEX_THRESHOLD,
                ConfigSource::Default,
            ),
            fetch_timeout_s: ConfigValue::new(DEFAULT_FETCH_TIMEOUT_S, ConfigSource::Default),
        }
    }

    /// Timeout applied to every HTTP request
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_s.value)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeonemoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeonemoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(groups_file) = file_config.groups_file {
            self.groups_file.update(groups_file, ConfigSource::File);
        }

        if let Some(base_url) = file_config.base_url {
            self.base_url.update(non_empty(base_url), ConfigSource::File);
        }

        if let Some(metric) = file_config.metric {
            self.metric.update(metric, ConfigSource::File);
        }

        if let Some(threshold) = file_config.draw_threshold_m {
            validate_threshold(threshold)?;
            self.draw_threshold_m.update(threshold, ConfigSource::File);
        }

        if let Some(compute_area) = file_config.compute_area {
            self.compute_area.update(compute_area, ConfigSource::File);
        }

        if let Some(heavy) = file_config.heavy_vertex_threshold {
            self.heavy_vertex_threshold.update(heavy, ConfigSource::File);
        }

        if let Some(timeout) = file_config.fetch_timeout_s {
            validate_timeout(timeout)?;
            self.fetch_timeout_s.update(timeout, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load the file layer only when the file exists
    pub fn load_from_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEONEMO_GROUPS
        if let Ok(groups) = env::var("GEONEMO_GROUPS") {
            if !groups.trim().is_empty() {
                self.groups_file.update(PathBuf::from(groups), ConfigSource::Environment);
            }
        }

        // GEONEMO_BASE_URL
        if let Ok(base_url) = env::var("GEONEMO_BASE_URL") {
            self.base_url.update(non_empty(base_url), ConfigSource::Environment);
        }

        // GEONEMO_METRIC
        if let Ok(metric_str) = env::var("GEONEMO_METRIC") {
            match metric_str.parse::<DistanceMetric>() {
                Ok(metric) => self.metric.update(metric, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEONEMO_METRIC value '{}': expected planar or geodesic",
                    metric_str
                ),
            }
        }

        // GEONEMO_DRAW_THRESHOLD_M
        if let Ok(threshold_str) = env::var("GEONEMO_DRAW_THRESHOLD_M") {
            match parse_threshold(&threshold_str) {
                Ok(threshold) => self.draw_threshold_m.update(threshold, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEONEMO_DRAW_THRESHOLD_M value '{}': expected a non-negative number of meters",
                    threshold_str
                ),
            }
        }

        // GEONEMO_COMPUTE_AREA
        if let Ok(flag_str) = env::var("GEONEMO_COMPUTE_AREA") {
            match parse_flag(&flag_str) {
                Some(flag) => self.compute_area.update(flag, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid GEONEMO_COMPUTE_AREA value '{}': expected true or false",
                    flag_str
                ),
            }
        }

        // GEONEMO_HEAVY_VERTICES
        if let Ok(heavy_str) = env::var("GEONEMO_HEAVY_VERTICES") {
            match heavy_str.trim().parse::<usize>() {
                Ok(heavy) => self.heavy_vertex_threshold.update(heavy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEONEMO_HEAVY_VERTICES value '{}': expected a vertex count",
                    heavy_str
                ),
            }
        }

        // GEONEMO_FETCH_TIMEOUT_S
        if let Ok(timeout_str) = env::var("GEONEMO_FETCH_TIMEOUT_S") {
            match parse_timeout(&timeout_str) {
                Ok(timeout) => self.fetch_timeout_s.update(timeout, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEONEMO_FETCH_TIMEOUT_S value '{}': expected a positive number of seconds",
                    timeout_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(groups_file) = overrides.groups_file {
            self.groups_file.update(groups_file, ConfigSource::Cli);
        }

        if let Some(base_url) = overrides.base_url {
            self.base_url.update(non_empty(base_url), ConfigSource::Cli);
        }

        if let Some(metric) = overrides.metric {
            self.metric.update(metric, ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.draw_threshold_m {
            self.draw_threshold_m.update(threshold, ConfigSource::Cli);
        }

        if let Some(heavy) = overrides.heavy_vertex_threshold {
            self.heavy_vertex_threshold.update(heavy, ConfigSource::Cli);
        }

        if let Some(timeout) = overrides.fetch_timeout_s {
            self.fetch_timeout_s.update(timeout, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "groups_file".to_string(),
            (self.groups_file.value.display().to_string(), self.groups_file.source),
        );

        map.insert(
            "base_url".to_string(),
            (
                self.base_url.value.clone().unwrap_or_else(|| "(filesystem)".to_string()),
                self.base_url.source,
            ),
        );

        map.insert("metric".to_string(), (self.metric.value.to_string(), self.metric.source));

        map.insert(
            "draw_threshold_m".to_string(),
            (format!("{}", self.draw_threshold_m.value), self.draw_threshold_m.source),
        );

        map.insert(
            "compute_area".to_string(),
            (self.compute_area.value.to_string(), self.compute_area.source),
        );

        map.insert(
            "heavy_vertex_threshold".to_string(),
            (self.heavy_vertex_threshold.value.to_string(), self.heavy_vertex_threshold.source),
        );

        map.insert(
            "fetch_timeout_s".to_string(),
            (self.fetch_timeout_s.value.to_string(), self.fetch_timeout_s.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    groups_file: Option<PathBuf>,
    base_url: Option<String>,
    metric: Option<DistanceMetric>,
    draw_threshold_m: Option<f64>,
    compute_area: Option<bool>,
    heavy_vertex_threshold: Option<usize>,
    fetch_timeout_s: Option<u64>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub groups_file: Option<PathBuf>,
    pub base_url: Option<String>,
    pub metric: Option<DistanceMetric>,
    pub draw_threshold_m: Option<f64>,
    pub heavy_vertex_threshold: Option<usize>,
    pub fetch_timeout_s: Option<u64>,
}

/// Parse a draw threshold in meters
pub fn parse_threshold(s: &str) -> Result<f64> {
    let value = s.trim().parse::<f64>().map_err(|_| GeonemoError::ConfigInvalid {
        key: "draw_threshold_m".to_string(),
        reason: format!("Invalid threshold: {}", s),
    })?;
    validate_threshold(value)?;
    Ok(value)
}

fn validate_threshold(value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(GeonemoError::ConfigInvalid {
            key: "draw_threshold_m".to_string(),
            reason: format!("Threshold must be a non-negative number of meters, got {}", value),
        });
    }
    Ok(())
}

/// Parse an HTTP fetch timeout in whole seconds
pub fn parse_timeout(s: &str) -> Result<u64> {
    let value = s.trim().parse::<u64>().map_err(|_| GeonemoError::ConfigInvalid {
        key: "fetch_timeout_s".to_string(),
        reason: format!("Invalid timeout: {}", s),
    })?;
    validate_timeout(value)?;
    Ok(value)
}

fn validate_timeout(value: u64) -> Result<()> {
    if value == 0 {
        return Err(GeonemoError::ConfigInvalid {
            key: "fetch_timeout_s".to_string(),
            reason: "Timeout must be at least one second".to_string(),
        });
    }
    Ok(())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
