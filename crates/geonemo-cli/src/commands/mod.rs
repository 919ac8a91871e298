//! Command implementations

mod config;
mod inspect;
mod resolve;

use crate::cli::{Cli, Commands};
use crate::config_loader::load_config_with_overrides;
use crate::output::OutputWriter;
use anyhow::Result;
use geonemo_core::config::CliConfigOverrides;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let mut overrides = CliConfigOverrides {
        groups_file: cli.groups,
        base_url: cli.base_url,
        fetch_timeout_s: cli.timeout,
        ..Default::default()
    };
    match &cli.command {
        Commands::Resolve(args) => {
            overrides.metric = args.metric;
            overrides.draw_threshold_m = args.threshold;
        }
        Commands::Inspect(args) => {
            overrides.heavy_vertex_threshold = args.heavy_vertices;
        }
        Commands::Config => {}
    }
    let config = load_config_with_overrides(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Resolve(args) => resolve::execute(args, &config, &output).await,
        Commands::Inspect(args) => inspect::execute(args, &config, &output).await,
        Commands::Config => config::execute(&config, &output),
    }
}
