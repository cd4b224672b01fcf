//! # Escort Sim
//!
//! Headless runner for the escort NPC layer.
//!
//! Loads the tuning file and a level, then drives the simulation with a
//! scripted player and logs how the run went.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod script;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("escort=info".parse()?))
        .init();

    info!("Escort sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let options = app::RunOptions::parse();
    app::run(&options)?;

    info!("Escort sim shutdown complete");
    Ok(())
}
