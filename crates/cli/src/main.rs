//! ossdu - storage usage for S3-compatible object storage
//!
//! Reports how much space a bucket prefix uses, counting the parts of
//! multipart uploads that were started and never completed.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ossdu::commands::{self, Cli};

/// Filter applied by `--debug`: our crates at debug, SDK internals quiet
const DEBUG_FILTER: &str = "warn,ossdu=debug,ossdu_core=debug,ossdu_s3=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stderr keeps logs out of JSON written to stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
