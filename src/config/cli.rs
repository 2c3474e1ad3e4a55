//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! chipquant resolve prepare.yaml
//! chipquant resolve prepare.yaml --format yaml
//! chipquant validate prepare.json
//! chipquant chips
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// chipquant: chip-targeted fake-quantization preparation
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "chipquant")]
#[command(version)]
#[command(about = "Resolve and inspect chip-targeted fake-quantization configs")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Resolve a config and print the quantization plan
    Resolve(ResolveArgs),

    /// Validate and resolve a config, printing a summary
    Validate(ValidateArgs),

    /// List supported chips and their defaults
    Chips,
}

/// Output format for the resolved plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Arguments for the resolve command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ResolveArgs {
    /// Path to YAML or JSON prepare config
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML or JSON prepare config
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Parse arguments from an iterator, as `Cli::try_parse_from`.
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve_defaults_to_json() {
        let cli = parse_args(["chipquant", "resolve", "prepare.yaml"]).unwrap();
        match cli.command {
            Command::Resolve(args) => {
                assert_eq!(args.config, PathBuf::from("prepare.yaml"));
                assert_eq!(args.format, OutputFormat::Json);
            }
            _ => panic!("Expected Resolve command"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_resolve_yaml() {
        let cli = parse_args(["chipquant", "resolve", "p.json", "--format", "yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Resolve(ResolveArgs {
                format: OutputFormat::Yaml,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = parse_args(["chipquant", "chips", "-v"]).unwrap();
        assert_eq!(cli.command, Command::Chips);
        assert!(cli.verbose);

        let cli = parse_args(["chipquant", "-q", "validate", "p.yaml"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(parse_args(["chipquant", "-v", "-q", "chips"]).is_err());
    }

    #[test]
    fn test_missing_config_rejected() {
        assert!(parse_args(["chipquant", "resolve"]).is_err());
        assert!(parse_args(["chipquant", "resolve", "p.yaml", "--format", "toml"]).is_err());
    }
}
