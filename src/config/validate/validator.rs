//! Configuration validation logic

use super::error::ValidationError;
use crate::config::schema::{LayerOverride, PrepareConfig, SchemeSpec};
use std::collections::BTreeMap;

const MAX_BIT: u32 = 32;

/// Validate a preparation config
///
/// Checks:
/// - Chip and strategy are present
/// - Bit widths are positive and bounded
/// - Override keys, bulk lists, leaf types and preserved attributes are non-empty names
pub fn validate_config(config: &PrepareConfig) -> Result<(), ValidationError> {
    if config.quant_dict.chip.trim().is_empty() {
        return Err(ValidationError::EmptyChip);
    }

    if config.quant_dict.strategy.trim().is_empty() {
        return Err(ValidationError::EmptyStrategy);
    }

    let extra = &config.extra_qconfig_dict;

    // Validate scheme overrides
    validate_scheme("weight", extra.w_qscheme.as_ref())?;
    validate_scheme("activation", extra.a_qscheme.as_ref())?;

    // Validate per-layer overrides
    validate_overrides("object_type", &extra.object_type)?;
    validate_overrides("module_name", &extra.module_name)?;

    // Validate bulk lists
    for (list, names) in [
        ("int4_op", &extra.int4_op),
        ("int8_op", &extra.int8_op),
        ("f16_op", &extra.f16_op),
    ] {
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(ValidationError::EmptyName(list.to_string()));
        }
    }

    if config.leaf_module.iter().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::EmptyLeafModule);
    }

    // Root ("") is a valid submodule path; attribute names are not optional
    for (submodule, attrs) in &config.preserve_attr {
        if attrs.iter().any(|attr| attr.trim().is_empty()) {
            return Err(ValidationError::EmptyPreservedAttr(submodule.clone()));
        }
    }

    Ok(())
}

fn validate_scheme(side: &str, scheme: Option<&SchemeSpec>) -> Result<(), ValidationError> {
    match scheme {
        Some(scheme) if !bit_in_range(scheme.bit) => Err(ValidationError::InvalidSchemeBit {
            side: side.to_string(),
            bit: scheme.bit,
        }),
        _ => Ok(()),
    }
}

fn validate_overrides(
    section: &str,
    overrides: &BTreeMap<String, LayerOverride>,
) -> Result<(), ValidationError> {
    for (layer, spec) in overrides {
        if layer.trim().is_empty() {
            return Err(ValidationError::EmptyName(section.to_string()));
        }
        if !bit_in_range(spec.bit) {
            return Err(ValidationError::InvalidOverrideBit {
                layer: layer.clone(),
                bit: spec.bit,
            });
        }
    }
    Ok(())
}

fn bit_in_range(bit: u32) -> bool {
    (1..=MAX_BIT).contains(&bit)
}
