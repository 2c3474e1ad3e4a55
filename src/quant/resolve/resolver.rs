//! Config resolver

use std::str::FromStr;
use tracing::{debug, info};

use super::overrides::{layer_entry, BulkPrecision};
use crate::config::{ExtraQConfig, QuantDict, QuantMode, SchemeSpec, STRATEGY_CNN};
use crate::error::ConfigError;
use crate::quant::chip::{Chip, ChipProfile, ChipTable};
use crate::quant::qconfig::{FakeQuantizeSpec, QConfigEntry, QConfigMapping, Side};
use crate::quant::registry::AlgorithmRegistry;
use crate::quant::scheme::QuantizeScheme;

/// Resolves preparation requests against a chip table and an algorithm registry.
///
/// Both tables are borrowed read-only, so one resolver can serve many
/// concurrent resolutions.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    chips: &'a ChipTable,
    registry: &'a AlgorithmRegistry,
}

impl Resolver<'static> {
    /// Resolver over the built-in chip table and registry.
    pub fn builtin() -> Self {
        Self::new(ChipTable::builtin(), AlgorithmRegistry::builtin())
    }
}

impl<'a> Resolver<'a> {
    pub fn new(chips: &'a ChipTable, registry: &'a AlgorithmRegistry) -> Self {
        Self { chips, registry }
    }

    /// Parse and check chip and mode.
    ///
    /// `weight_only` with the CNN strategy is rejected before the chip is
    /// looked at.
    pub fn target(&self, quant: &QuantDict) -> Result<(Chip, QuantMode), ConfigError> {
        let mode = QuantMode::from_str(&quant.quantmode)
            .map_err(|_| ConfigError::InvalidQuantMode(quant.quantmode.clone()))?;

        if mode == QuantMode::WeightOnly && quant.strategy == STRATEGY_CNN {
            return Err(ConfigError::InvalidCombination {
                mode: mode.to_string(),
                strategy: quant.strategy.clone(),
            });
        }

        let chip = self.chips.chip(&quant.chip)?;
        Ok((chip, mode))
    }

    /// Resolve a complete quantization plan.
    pub fn resolve(
        &self,
        quant: &QuantDict,
        extra: &ExtraQConfig,
    ) -> Result<QConfigMapping, ConfigError> {
        self.resolve_for_chip(quant, extra).map(|(_, qconfig)| qconfig)
    }

    /// Resolve a plan and return the chip it targets.
    pub fn resolve_for_chip(
        &self,
        quant: &QuantDict,
        extra: &ExtraQConfig,
    ) -> Result<(Chip, QConfigMapping), ConfigError> {
        let (chip, mode) = self.target(quant)?;
        let profile = self.chips.profile(chip)?;
        let scope = chip.registry_scope();

        // Global algorithm overrides
        let w_observer = extra
            .w_observer
            .as_deref()
            .map(|name| self.registry.lookup_observer(name))
            .transpose()?;
        let a_observer = extra
            .a_observer
            .as_deref()
            .map(|name| self.registry.lookup_observer(name))
            .transpose()?;
        let w_fakequantize = extra
            .w_fakequantize
            .as_deref()
            .map(|name| self.registry.lookup_fake_quantize(name, scope))
            .transpose()?;
        let a_fakequantize = extra
            .a_fakequantize
            .as_deref()
            .map(|name| self.registry.lookup_fake_quantize(name, scope))
            .transpose()?;

        // Schemes
        let mut w_qscheme = resolve_scheme(chip, Side::Weight, extra.w_qscheme.as_ref(), profile)?;
        let mut a_qscheme =
            resolve_scheme(chip, Side::Activation, extra.a_qscheme.as_ref(), profile)?;
        w_qscheme.merge_extra_params(extra.w_observer_extra_args.clone());
        a_qscheme.merge_extra_params(extra.a_observer_extra_args.clone());

        let weight = FakeQuantizeSpec::new(
            Side::Weight,
            w_fakequantize.unwrap_or(profile.default_weight_quantize),
            w_observer.unwrap_or(profile.default_weight_observer),
            w_qscheme,
        )
        .with_fakeq_params(extra.w_fakeq_params.clone());
        let activation = FakeQuantizeSpec::new(
            Side::Activation,
            a_fakequantize.unwrap_or(profile.default_act_quantize),
            a_observer.unwrap_or(profile.default_act_observer),
            a_qscheme,
        )
        .with_fakeq_params(extra.a_fakeq_params.clone());

        weight.constructor_params()?;
        activation.constructor_params()?;
        log_global(mode, &weight, &activation);

        let mut qconfig = QConfigMapping::new(QConfigEntry::both(activation, weight));

        for (op, spec) in &extra.object_type {
            let entry = layer_entry(self.registry, op, spec)?;
            debug!(object_type = %op, mode = %spec.mode, bit = spec.bit, "object_type override");
            qconfig.set_object_type(op.clone(), entry);
        }

        for (name, spec) in &extra.module_name {
            let entry = layer_entry(self.registry, name, spec)?;
            debug!(module = %name, mode = %spec.mode, bit = spec.bit, "module_name override");
            qconfig.set_module_name(name.clone(), entry);
        }

        // Bulk lists last: they win over module_name on collision
        for bulk in BulkPrecision::ORDER {
            let names = bulk_names(extra, bulk);
            if names.is_empty() {
                continue;
            }
            let entry = bulk.entry(self.registry)?;
            for name in names {
                bulk.log_insert(name);
                qconfig.set_module_name(name.clone(), entry.clone());
            }
        }

        Ok((chip, qconfig))
    }
}

/// Explicit override validated against the chip's bit widths, else the profile default.
fn resolve_scheme(
    chip: Chip,
    side: Side,
    spec: Option<&SchemeSpec>,
    profile: &ChipProfile,
) -> Result<QuantizeScheme, ConfigError> {
    let Some(spec) = spec else {
        return Ok(match side {
            Side::Weight => profile.w_qscheme.clone(),
            Side::Activation => profile.a_qscheme.clone(),
        });
    };

    if let Some(allowed) = chip.allowed_bits() {
        if !allowed.contains(&spec.bit) {
            return Err(ConfigError::UnsupportedBitWidth {
                chip: chip.to_string(),
                side: side.to_string(),
                bit: spec.bit,
                allowed: allowed.to_vec(),
            });
        }
    }

    info!("{side} quant scheme is overridden");
    Ok(spec.to_scheme())
}

fn bulk_names(extra: &ExtraQConfig, bulk: BulkPrecision) -> &[String] {
    match bulk {
        BulkPrecision::Int4 => &extra.int4_op,
        BulkPrecision::Int8 => &extra.int8_op,
        BulkPrecision::Fp16 => &extra.f16_op,
    }
}

fn log_global(mode: QuantMode, weight: &FakeQuantizeSpec, activation: &FakeQuantizeSpec) {
    info!("Weight qconfig:\n    {weight}");
    if mode == QuantMode::WeightActivation {
        info!("Activation qconfig:\n    {activation}");
        info!("Bias will also be quantized");
    }
}
