//! # Presence Sim
//!
//! Runs a presence scenario against the mock and prints what every client
//! sees, one JSON object per line.
//!
//! ## Usage
//!
//! ```bash
//! # Run the built-in scenario
//! presence-sim
//!
//! # Run a scenario file
//! presence-sim /path/to/scenario.toml
//!
//! # Run with an environment variable
//! PRESENCE_SCENARIO=~/scenarios/room.toml presence-sim
//! ```

mod config;
mod runner;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presence_sim=info,presence_mock_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load the scenario
    let path = std::env::args().nth(1);
    let scenario = config::Scenario::load(path.as_deref())?;

    tracing::info!(
        clients = scenario.clients.len(),
        channels = scenario.channels.len(),
        "Running scenario"
    );

    for report in runner::run(&scenario).await {
        let line = serde_json::to_string(&report).context("Failed to serialize view report")?;
        println!("{line}");
    }

    Ok(())
}
