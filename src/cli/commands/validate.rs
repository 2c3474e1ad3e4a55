//! Validate command implementation

use super::resolve::resolve_file;
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{PrepareConfig, ValidateArgs};
use crate::quant::{QConfigEntry, QConfigMapping};

/// Format target information as a string
pub fn format_target_info(spec: &PrepareConfig) -> String {
    let quant = &spec.quant_dict;
    format!(
        "  Chip: {}\n  Strategy: {}\n  Quant mode: {}",
        quant.chip, quant.strategy, quant.quantmode
    )
}

fn format_entry(entry: &QConfigEntry) -> Vec<String> {
    entry
        .sides()
        .map(|side| {
            format!(
                "    {}: {} + {} ({}-bit)",
                side.side,
                side.fake_quantize,
                side.observer,
                side.scheme.bit()
            )
        })
        .collect()
}

/// Format the resolved plan as a string
pub fn format_plan_info(mapping: &QConfigMapping) -> String {
    let mut lines = vec!["  Global:".to_string()];
    lines.extend(format_entry(&mapping.global));

    let object_types = mapping.object_type.as_ref().map_or(0, |m| m.len());
    let module_names = mapping.module_name.as_ref().map_or(0, |m| m.len());
    lines.push(format!("  Object type overrides: {object_types}"));
    lines.push(format!("  Module name overrides: {module_names}"));
    lines.join("\n")
}

/// Format trace options as a string
pub fn format_trace_info(spec: &PrepareConfig) -> Option<String> {
    if spec.leaf_module.is_empty() && spec.preserve_attr.is_empty() && spec.concrete_args.is_empty()
    {
        return None;
    }
    let mut lines = vec!["  Trace:".to_string()];
    if !spec.leaf_module.is_empty() {
        lines.push(format!("    Leaf modules: {:?}", spec.leaf_module));
    }
    for (path, attrs) in &spec.preserve_attr {
        let owner = if path.is_empty() { "<root>" } else { path };
        lines.push(format!("    Preserve {owner}: {attrs:?}"));
    }
    if !spec.concrete_args.is_empty() {
        let names: Vec<_> = spec.concrete_args.keys().collect();
        lines.push(format!("    Concrete args: {names:?}"));
    }
    Some(lines.join("\n"))
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let (spec, mapping) = resolve_file(&args.config)?;

    log(level, LogLevel::Normal, "Configuration is valid");
    log(level, LogLevel::Normal, &format_target_info(&spec));
    log(level, LogLevel::Normal, &format_plan_info(&mapping));
    if let Some(trace) = format_trace_info(&spec) {
        log(level, LogLevel::Verbose, &trace);
    }

    Ok(())
}
