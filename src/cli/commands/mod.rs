//! CLI command implementations

mod chips;
mod resolve;
mod validate;


use crate::cli::LogLevel;
use crate::config::{Cli, Command};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    let log_level = LogLevel::from_flags(cli.verbose, cli.quiet);

    match cli.command {
        Command::Resolve(args) => resolve::run_resolve(args, log_level),
        Command::Validate(args) => validate::run_validate(args, log_level),
        Command::Chips => chips::run_chips(log_level),
    }
}
