//! Beach Temperature Sync - Main Binary
//!
//! Synchronizes bathing-water temperatures from the context broker into
//! `geodata_cip.beaches`:
//! 1. Fetches beaches and the observations within a radius of each
//! 2. Selects one current temperature per beach (sensor > model > sample)
//! 3. Sets or clears each beach's temperature columns
//!
//! Usage:
//!   cargo run --release                          # One sync run, then exit
//!   cargo run --release -- --daemon              # Sync every schedule.interval_minutes
//!   cargo run --release -- --daemon --endpoint 8080
//!   cargo run --release -- --dry-run             # Print selections as JSON, no database
//!
//! Environment:
//!   CONTEXT_BROKER_URL - overrides broker.url
//!   PG_CONNECTION_URL  - PostgreSQL connection string (DATABASE_URL accepted)

use std::path::PathBuf;

use beachtemp_service::config::SyncConfig;
use beachtemp_service::daemon::{self, Daemon};
use beachtemp_service::{db, endpoint};
use chrono::Utc;
use clap::Parser;

/// Sync bathing-water temperatures from the context broker to the map database.
#[derive(Debug, Parser)]
#[command(name = "beachtemp", version)]
struct Cli {
    /// Config file (default: ./sync.toml if present, else built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Max distance in metres between a beach and an observation.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    distance: Option<u32>,

    /// Keep running and sync on a fixed interval.
    #[arg(long)]
    daemon: bool,

    /// Minutes between runs in daemon mode.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Serve /health and /beach/{id} on this port (daemon mode).
    #[arg(long)]
    endpoint: Option<u16>,

    /// Fetch and select, print the planned writes as JSON, touch no database.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match SyncConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    if let Some(distance) = cli.distance {
        config.broker.max_distance_m = distance;
    }
    if let Some(interval) = cli.interval {
        config.schedule.interval_minutes = interval;
    }

    let mut daemon = match Daemon::new(config) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("could not create broker client: {}", e);
            std::process::exit(1);
        }
    };

    if cli.dry_run {
        match daemon.plan(Utc::now()) {
            Ok((records, failures)) => {
                for failure in &failures {
                    tracing::warn!(source = %failure.service_guide_id, name = %failure.name, "{}", failure.reason);
                }
                match serde_json::to_string_pretty(&records) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        tracing::error!("could not serialize plan: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            Err(e) => {
                tracing::error!("dry run failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = daemon.initialize() {
        eprintln!("\n❌ Initialization failed: {}\n", e);
        std::process::exit(1);
    }

    if !cli.daemon {
        match daemon.run_once(Utc::now()) {
            Ok(report) => daemon::log_report(&report),
            Err(e) => {
                tracing::error!("error occurred when running integration: {}", e);
                std::process::exit(1);
            }
        }
        tracing::info!("done");
        return;
    }

    // Start HTTP endpoint if requested (in background thread)
    if let Some(port) = cli.endpoint {
        match db::connect_with_validation() {
            Ok(client) => {
                std::thread::spawn(move || {
                    if let Err(e) = endpoint::start_endpoint_server(port, client) {
                        tracing::error!("endpoint server error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("failed to connect to database for endpoint: {}", e);
                tracing::warn!("continuing without HTTP endpoint");
            }
        }
    }

    if let Err(e) = daemon.run() {
        tracing::error!("daemon error: {}", e);
        std::process::exit(1);
    }
}
