use clap::{Parser, Subcommand};
use geonemo_core::config::{parse_threshold, parse_timeout};
use geonemo_core::models::DistanceMetric;
use std::path::PathBuf;

/// GeoNEMO - Which protected area is this point in, or closest to?
#[derive(Parser, Debug)]
#[command(name = "geonemo")]
#[command(about = "Resolve map clicks against groups of polygon layers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./geonemo.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Group catalog to use instead of the configured one
    #[arg(long, global = true, value_name = "FILE")]
    pub groups: Option<PathBuf>,

    /// Fetch the catalog and its files from this base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Give up on an HTTP fetch after this many seconds
    #[arg(long, global = true, value_name = "SECONDS", value_parser = parse_timeout_arg)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve one point against every enabled group
    Resolve(ResolveArgs),

    /// Validate a group catalog and every file it references
    Inspect(InspectArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Longitude of the point
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Latitude of the point
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Distance metric (geodesic or planar)
    #[arg(long, value_parser = parse_metric)]
    pub metric: Option<DistanceMetric>,

    /// Near/far threshold in meters
    #[arg(long, value_parser = parse_threshold_arg)]
    pub threshold: Option<f64>,

    /// Write the result payload to this file
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Vertex count above which a feature is flagged
    #[arg(long)]
    pub heavy_vertices: Option<usize>,

    /// Number of heaviest features to list
    #[arg(long, default_value = "10")]
    pub top: usize,
}

fn parse_metric(s: &str) -> Result<DistanceMetric, String> {
    s.parse::<DistanceMetric>().map_err(|e| e.to_string())
}

fn parse_threshold_arg(s: &str) -> Result<f64, String> {
    parse_threshold(s).map_err(|e| e.to_string())
}

fn parse_timeout_arg(s: &str) -> Result<u64, String> {
    parse_timeout(s).map_err(|e| e.to_string())
}
