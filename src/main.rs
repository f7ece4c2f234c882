//! Hostpulse Server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loaded from `--config <path>`, or the default search path
//! (`$XDG_CONFIG_HOME/hostpulse/config.toml`, `/etc/hostpulse/config.toml`,
//! `./config.toml`). Environment overrides:
//! - `HOSTPULSE_HOST`: Host to bind to (default: 0.0.0.0)
//! - `HOSTPULSE_PORT`: Port to listen on (default: 3030)
//! - `HOSTPULSE_INTERVAL_SECS`: Sampling interval (default: 3)
//! - `HOSTPULSE_LOG_LEVEL` / `HOSTPULSE_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Full filter override

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hostpulse::config::LoggingConfig;
use hostpulse::{serve, AppState, Config, Sampler};

#[derive(Parser)]
#[command(name = "hostpulse", version, about = "Live host-metrics dashboard")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config.logging);

    tracing::info!("starting hostpulse v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        interval_secs = config.sampler.interval_secs,
        queue_capacity = config.broadcast.queue_capacity,
        "sampler and hub configured"
    );

    let state = AppState::new(&config);

    let sampler = Sampler::new(Arc::clone(&state.hub), config.sampler.interval());
    tokio::spawn(sampler.run());

    serve(state).await?;

    tracing::info!("hostpulse stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "hostpulse={},tower_http=debug",
            logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
