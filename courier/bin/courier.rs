#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;
use courier::{config, controller};

/// Email job queue service
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to a RON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let source = config::find_config_file(args.config)?;
    let courier = match &source {
        Some(path) => config::load(path)?,
        None => controller::Courier::default(),
    };

    controller::run(courier, source.as_deref()).await
}
