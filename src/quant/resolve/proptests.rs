//! Property-based tests for config resolution

use proptest::prelude::*;

use super::Resolver;
use crate::config::{ExtraQConfig, LayerOverride, QuantDict, QuantMode, SchemeSpec};
use crate::error::ConfigError;

fn arb_chip() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["BM1688", "BM1684X", "CV183X", "BM1690", "Academic"])
}

fn arb_layer() -> impl Strategy<Value = LayerOverride> {
    (any::<bool>(), 2u32..=16).prop_map(|(weight, bit)| {
        if weight {
            LayerOverride::weight(bit)
        } else {
            LayerOverride::activation(bit)
        }
    })
}

fn dict(chip: &str, strategy: &str, mode: QuantMode) -> QuantDict {
    QuantDict {
        chip: chip.to_string(),
        strategy: strategy.to_string(),
        quantmode: mode.to_string(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// weight_only with CNN is rejected whatever else is configured
    #[test]
    fn prop_weight_only_cnn_always_rejected(
        chip in "[A-Za-z0-9]{0,10}",
        bit in 1u32..=16,
        names in proptest::collection::vec("[a-z]{1,6}", 0..4),
    ) {
        let extra = ExtraQConfig {
            w_qscheme: Some(SchemeSpec { bit, ..Default::default() }),
            int8_op: names,
            ..Default::default()
        };
        let err = Resolver::builtin()
            .resolve(&dict(&chip, "CNN", QuantMode::WeightOnly), &extra)
            .unwrap_err();
        let is_combination = matches!(err, ConfigError::InvalidCombination { .. });
        prop_assert!(is_combination);
    }

    /// object_type overrides never touch the global entry
    #[test]
    fn prop_object_type_keeps_global(
        chip in arb_chip(),
        layers in proptest::collection::btree_map("[a-z]{1,8}", arb_layer(), 0..6),
    ) {
        let resolver = Resolver::builtin();
        let quant = dict(chip, "Transformer", QuantMode::WeightActivation);
        let baseline = resolver.resolve(&quant, &ExtraQConfig::default()).unwrap();

        let extra = ExtraQConfig { object_type: layers.clone(), ..Default::default() };
        let mapping = resolver.resolve(&quant, &extra).unwrap();
        prop_assert_eq!(&mapping.global, &baseline.global);
        prop_assert_eq!(mapping.object_type.map(|m| m.len()).unwrap_or(0), layers.len());
    }

    /// Bulk entries beat module_name overrides for every listed module
    #[test]
    fn prop_bulk_lists_win(
        chip in arb_chip(),
        names in proptest::collection::btree_set("[a-z]{1,6}(\\.[a-z0-9]{1,4})?", 1..6),
        layer in arb_layer(),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let mut extra = ExtraQConfig {
            int8_op: names.clone(),
            ..Default::default()
        };
        for name in &names {
            extra.module_name.insert(name.clone(), layer.clone());
        }
        let mapping = Resolver::builtin()
            .resolve(&dict(chip, "Transformer", QuantMode::WeightActivation), &extra)
            .unwrap();
        for name in &names {
            let entry = mapping.module_name_entry(name).unwrap();
            prop_assert!(entry.is_complete());
            for side in entry.sides() {
                prop_assert_eq!(side.scheme.bit(), 8);
            }
        }
    }

    /// Every side of every resolved entry yields constructor params
    #[test]
    fn prop_resolved_entries_are_constructible(
        chip in arb_chip(),
        layers in proptest::collection::btree_map("[a-z]{1,8}", arb_layer(), 0..4),
        int4 in proptest::collection::vec("[a-z]{1,6}", 0..3),
    ) {
        let extra = ExtraQConfig {
            module_name: layers,
            int4_op: int4,
            ..Default::default()
        };
        let mapping = Resolver::builtin()
            .resolve(&dict(chip, "Transformer", QuantMode::WeightActivation), &extra)
            .unwrap();
        for entry in mapping.entries() {
            prop_assert!(entry.sides().count() >= 1);
            for side in entry.sides() {
                prop_assert!(side.constructor_params().is_ok());
            }
        }
    }
}
