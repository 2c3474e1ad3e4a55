//! Property-based tests for configuration validation

use super::error::ValidationError;
use super::validator::validate_config;
use crate::config::schema::*;
use proptest::prelude::*;

fn arb_valid_config() -> impl Strategy<Value = PrepareConfig> {
    (
        prop::sample::select(vec!["BM1688", "BM1684X", "CV183X", "BM1690", "Academic"]),
        1u32..=32,                                           // scheme bit
        proptest::collection::vec("[a-z]{1,8}(\\.[a-z0-9]{1,6}){0,2}", 0..6), // module names
        any::<bool>(),                                       // weight_only
    )
        .prop_map(|(chip, bit, names, weight_only)| {
            let mode = if weight_only {
                QuantMode::WeightOnly
            } else {
                QuantMode::WeightActivation
            };
            let mut config = PrepareConfig::new(chip, "Transformer", mode);
            config.extra_qconfig_dict.w_qscheme = Some(SchemeSpec {
                bit,
                ..Default::default()
            });
            for name in &names {
                config
                    .extra_qconfig_dict
                    .module_name
                    .insert(name.clone(), LayerOverride::activation(bit));
            }
            config.extra_qconfig_dict.int4_op = names;
            config
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_valid_config_passes(config in arb_valid_config()) {
        prop_assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn prop_zero_scheme_bit_fails(config in arb_valid_config()) {
        let mut config = config;
        config.extra_qconfig_dict.w_qscheme = Some(SchemeSpec { bit: 0, ..Default::default() });
        let is_scheme_error = matches!(
            validate_config(&config),
            Err(ValidationError::InvalidSchemeBit { bit: 0, .. })
        );
        prop_assert!(is_scheme_error);
    }

    #[test]
    fn prop_oversized_override_bit_fails(config in arb_valid_config(), bit in 33u32..1024) {
        let mut config = config;
        config.extra_qconfig_dict.object_type.insert("Conv2d".to_string(), LayerOverride::weight(bit));
        let is_override_error = matches!(
            validate_config(&config),
            Err(ValidationError::InvalidOverrideBit { .. })
        );
        prop_assert!(is_override_error);
    }

    #[test]
    fn prop_blank_chip_fails(config in arb_valid_config(), spaces in 0usize..4) {
        let mut config = config;
        config.quant_dict.chip = " ".repeat(spaces);
        prop_assert!(matches!(validate_config(&config), Err(ValidationError::EmptyChip)));
    }
}
