//! Offline baker for precomputed visibility grids.
//!
//! ## Usage
//!
//! ```bash
//! # Bake a scene into ./assets/PVGGrid_<level>_<x>_<y>_<z>.pvg
//! cargo run --release -p pvgrid-bake -- bake scenes/courtyard.ron --output assets
//!
//! # Override build settings
//! cargo run --release -p pvgrid-bake -- bake scenes/courtyard.ron --workers 8 --mode minimal-memory
//!
//! # Inspect an asset, or a single cell of it
//! cargo run -p pvgrid-bake -- inspect assets/PVGGrid_courtyard_4_2_4.pvg --cell 5
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod bake;
mod cli;
mod inspect;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Bake(args) => bake::run(args).map(|path| {
            println!("{}", path.display());
        }),
        Command::Inspect(args) => inspect::run(args).map(|text| {
            print!("{text}");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
