//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use geonemo_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::Path;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "geonemo.toml";

/// Load layered configuration: defaults, file, environment
///
/// An explicit config file must exist; the default one is optional.
pub fn load_config(config_file: Option<&Path>) -> Result<LayeredConfig> {
    let config = match config_file {
        Some(path) => LayeredConfig::with_defaults()
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?,
        None => LayeredConfig::with_defaults()
            .load_from_optional_file(DEFAULT_CONFIG_FILE)
            .context("Failed to load configuration file")?,
    };

    Ok(config.load_from_env())
}

/// Load layered configuration with CLI overrides
pub fn load_config_with_overrides(
    config_file: Option<&Path>,
    overrides: CliConfigOverrides,
) -> Result<LayeredConfig> {
    let mut config = load_config(config_file)?;
    config.update_from_cli(overrides);
    Ok(config)
}
