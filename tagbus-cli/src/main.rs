//! ## tagbus-cli
//! **Command-line client for a tagbus peer**
//!
//! `tagbus demo` replays the reference exchange against a live peer.
//! `tagbus send` fires a single event built from `tag:text` arguments.

use std::sync::Arc;

use clap::Parser;
use tagbus_config::TagbusConfig;
use tagbus_telemetry::{EventLogger, MetricsRecorder};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => TagbusConfig::load_from_path(path)?,
        None => TagbusConfig::load()?,
    };
    EventLogger::init(cli.log_level.as_deref().unwrap_or(&config.telemetry.log_level));

    let metrics = if config.telemetry.metrics_enabled {
        Some(Arc::new(MetricsRecorder::new()?))
    } else {
        None
    };

    match cli.command {
        Commands::Demo(args) => commands::run_demo(args, config, metrics).await,
        Commands::Send(args) => commands::run_send(args, config, metrics),
    }
}
