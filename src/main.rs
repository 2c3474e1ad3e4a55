//! chipquant CLI
//!
//! # Usage
//!
//! ```bash
//! # Print the resolved quantization plan
//! chipquant resolve prepare.yaml --format yaml
//!
//! # Validate a config and summarize the plan
//! chipquant validate prepare.yaml
//!
//! # List chip profiles
//! chipquant chips
//! ```

use chipquant::cli::{run_command, Cli, LogLevel};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over the level implied by `-v` / `-q`
fn setup_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.tracing_level().as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
