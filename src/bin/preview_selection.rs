//! Offline selection preview.
//!
//! Reads a JSON object mapping beach ids to raw observations and prints
//! what the service would store for each beach. No broker, no database.
//!
//! Usage:
//!   preview_selection observations.json [--now 2024-07-03T12:00:00Z] [--config sync.toml]
//!
//! Input shape:
//!   { "<beach id>": [ { "timestamp": "...", "source": "...", "value": 18.2 }, ... ] }

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use beachtemp_service::config::SyncConfig;
use beachtemp_service::model::RawObservation;
use beachtemp_service::selection::resolve_all;
use chrono::{DateTime, Utc};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "preview_selection")]
struct Args {
    /// JSON file: beach id -> raw observations.
    input: PathBuf,

    /// Evaluation time (RFC 3339). Defaults to the current time.
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = SyncConfig::load(args.config.as_deref())?;

    let contents = fs::read_to_string(&args.input)?;
    let raw: HashMap<String, Vec<RawObservation>> = serde_json::from_str(&contents)?;
    tracing::info!("loaded observations for {} beaches from {}", raw.len(), args.input.display());

    let now = args.now.unwrap_or_else(Utc::now);
    let resolved = resolve_all(&raw, now, &config.staleness_policy(), &config.sources.markers());

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
