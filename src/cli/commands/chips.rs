//! Chips command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::quant::{Chip, ChipProfile, ChipTable};

/// Format one chip profile as a string
pub fn format_chip(chip: Chip, profile: &ChipProfile) -> String {
    let bits = match chip.allowed_bits() {
        Some(bits) => format!("{bits:?}"),
        None => "any".to_string(),
    };
    format!(
        "{chip}\n  Weight: {} + {} / {}\n  Activation: {} + {} / {}\n  Allowed bits: {bits}\n  Registry: {}",
        profile.default_weight_quantize,
        profile.default_weight_observer,
        profile.w_qscheme,
        profile.default_act_quantize,
        profile.default_act_observer,
        profile.a_qscheme,
        chip.registry_scope(),
    )
}

pub fn run_chips(level: LogLevel) -> Result<(), String> {
    for (chip, profile) in ChipTable::builtin().iter() {
        // listing is the command's output
        println!("{}", format_chip(*chip, profile));
        log(level, LogLevel::Verbose, &format!("  Type: {}", profile.qtype));
    }
    Ok(())
}
