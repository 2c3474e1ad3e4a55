//! Resolve command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, OutputFormat, PrepareConfig, ResolveArgs};
use crate::quant::{QConfigMapping, Resolver};

/// Load, validate and resolve a config file
pub fn resolve_file(config: &std::path::Path) -> Result<(PrepareConfig, QConfigMapping), String> {
    let spec = load_config(config).map_err(|e| format!("Config error: {e}"))?;
    let mapping = Resolver::builtin()
        .resolve(&spec.quant_dict, &spec.extra_qconfig_dict)
        .map_err(|e| format!("Resolution failed [{}]: {e}", e.code()))?;
    Ok((spec, mapping))
}

/// Render a resolved plan
pub fn render(mapping: &QConfigMapping, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(mapping).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(mapping).map_err(|e| e.to_string()),
    }
}

pub fn run_resolve(args: ResolveArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Verbose,
        &format!("Resolving config: {}", args.config.display()),
    );

    let (_, mapping) = resolve_file(&args.config)?;
    let rendered = render(&mapping, args.format)?;
    // printed even when quiet
    println!("{rendered}");
    Ok(())
}
