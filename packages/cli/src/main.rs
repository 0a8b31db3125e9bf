#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `geobatch`: batch geocoding of address tables.
//!
//! Reads a CSV of addresses, geocodes a range of its rows through the
//! selected provider, and writes `identifier, address, latitude,
//! longitude` back out. Nothing is written if the run fails; a run that
//! fails mid-batch logs the failed position, so the range can be narrowed
//! with `--start`/`--end` and re-run.
//!
//! Uses `indicatif-log-bridge` (via [`geobatch_cli_utils::init_logger`])
//! so log lines and the progress bar never fight for the terminal.

mod geocode;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geobatch_geocoder::service_registry::all_services;

#[derive(Parser)]
#[command(name = "geobatch", about = "Batch geocoding of address tables")]
struct Cli {
    /// Log every provider call (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode a CSV of addresses
    Geocode(GeocodeArgs),
    /// List the built-in geocoding providers
    Providers,
}

#[derive(Args, Debug)]
struct GeocodeArgs {
    /// Input CSV: `identifier,address` or `identifier,address,latitude,longitude`
    #[arg(short, long)]
    input: PathBuf,
    /// Output CSV (only written when the run succeeds)
    #[arg(short, long)]
    output: PathBuf,
    /// The input's first row is column names (mirrored in the output)
    #[arg(long)]
    header: bool,
    /// Input is the wide location export (`DIM_LOC_ID`, `Address Line 1`,
    /// `CTY_NM`, ...) with a header row; addresses are built from its columns
    /// and the output is written without a header
    #[arg(long, conflicts_with = "header")]
    wide: bool,
    /// First row position to geocode (0-based, header excluded)
    #[arg(long, default_value = "0")]
    start: usize,
    /// Position to stop before (exclusive); defaults to the end of the input
    #[arg(long)]
    end: Option<usize>,
    /// Geocode only the first N rows (shorthand for `--start 0 --end N`)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    limit: Option<usize>,
    /// Built-in provider id (see `geobatch providers`)
    #[arg(long, default_value = "google")]
    provider: String,
    /// TOML service definition to use instead of a built-in provider
    #[arg(long, conflicts_with = "provider")]
    service_file: Option<PathBuf>,
    /// API key; defaults to the provider's environment variable
    /// (`GOOGLE_API_KEY` for Google)
    #[arg(long)]
    api_key: Option<String>,
    /// Retries for rate-limited or timed-out requests (0 = fail fast)
    #[arg(long, default_value = "0")]
    max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    #[arg(long, default_value = "2000")]
    retry_delay_ms: u64,
    /// Do not draw a progress bar
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = geobatch_cli_utils::init_logger(cli.verbose);

    match cli.command {
        Commands::Providers => {
            println!("{:<12} {:<28} API KEY", "ID", "NAME");
            println!("{}", "-".repeat(60));
            for service in &all_services() {
                println!(
                    "{:<12} {:<28} {}",
                    service.id,
                    service.name,
                    service.api_key_env().unwrap_or("-")
                );
            }
        }
        Commands::Geocode(args) => {
            if let Err(e) = geocode::run(args, &multi).await {
                log::error!("{e}");
                if let Some(position) = geocode::failed_position(e.as_ref()) {
                    log::error!(
                        "No output was written. Re-run the same range once the provider \
                         recovers, or pass --end {position} to save the rows before the failure"
                    );
                }
                return Err(e);
            }
        }
    }

    Ok(())
}
