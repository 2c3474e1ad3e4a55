//! Unit tests for configuration validation

use super::error::ValidationError;
use super::validator::validate_config;
use crate::config::schema::*;

fn create_valid_config() -> PrepareConfig {
    let mut config = PrepareConfig::new("BM1688", "CNN", QuantMode::WeightActivation);
    config.extra_qconfig_dict.w_qscheme = Some(SchemeSpec {
        bit: 4,
        ..Default::default()
    });
    config
        .extra_qconfig_dict
        .module_name
        .insert("backbone.conv1".to_string(), LayerOverride::weight(4));
    config.extra_qconfig_dict.int8_op = vec!["head.fc".to_string()];
    config.preserve_attr.insert(String::new(), vec!["export".to_string()]);
    config
}

#[test]
fn test_valid_config() {
    let config = create_valid_config();
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_empty_chip() {
    let mut config = create_valid_config();
    config.quant_dict.chip = "  ".to_string();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::EmptyChip));
}

#[test]
fn test_empty_strategy() {
    let mut config = create_valid_config();
    config.quant_dict.strategy.clear();
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::EmptyStrategy));
}

#[test]
fn test_zero_scheme_bit() {
    let mut config = create_valid_config();
    config.extra_qconfig_dict.a_qscheme = Some(SchemeSpec {
        bit: 0,
        ..Default::default()
    });
    let err = validate_config(&config).unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidSchemeBit {
            side: "activation".to_string(),
            bit: 0
        }
    );
}

#[test]
fn test_oversized_override_bit() {
    let mut config = create_valid_config();
    config
        .extra_qconfig_dict
        .object_type
        .insert("Linear".to_string(), LayerOverride::activation(64));
    let err = validate_config(&config).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidOverrideBit { bit: 64, .. }));
}

#[test]
fn test_empty_module_name_key() {
    let mut config = create_valid_config();
    config
        .extra_qconfig_dict
        .module_name
        .insert(String::new(), LayerOverride::weight(8));
    let err = validate_config(&config).unwrap_err();
    assert_eq!(err, ValidationError::EmptyName("module_name".to_string()));
}

#[test]
fn test_empty_name_in_bulk_list() {
    let mut config = create_valid_config();
    config.extra_qconfig_dict.f16_op = vec!["head".to_string(), String::new()];
    let err = validate_config(&config).unwrap_err();
    assert_eq!(err, ValidationError::EmptyName("f16_op".to_string()));
}

#[test]
fn test_empty_leaf_module() {
    let mut config = create_valid_config();
    config.leaf_module.push(String::new());
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::EmptyLeafModule)
    ));
}

#[test]
fn test_empty_preserved_attr() {
    let mut config = create_valid_config();
    config
        .preserve_attr
        .insert("backbone".to_string(), vec![String::new()]);
    let err = validate_config(&config).unwrap_err();
    assert_eq!(err, ValidationError::EmptyPreservedAttr("backbone".to_string()));
}

#[test]
fn test_mode_strings_are_not_checked_here() {
    // semantic checks belong to the resolver
    let mut config = create_valid_config();
    config.quant_dict.quantmode = "int3".to_string();
    config
        .extra_qconfig_dict
        .object_type
        .insert("add".to_string(), LayerOverride {
            mode: "bias".to_string(),
            ..LayerOverride::activation(8)
        });
    assert!(validate_config(&config).is_ok());
}
