//! Per-layer and bulk override entries

use tracing::info;

use crate::config::LayerOverride;
use crate::error::ConfigError;
use crate::quant::qconfig::{FakeQuantizeSpec, QConfigEntry, Side};
use crate::quant::registry::{AlgorithmRegistry, FakeQuantizeKind, ObserverKind, RegistryScope};
use crate::quant::scheme::QuantizeScheme;

const MODE_ACTIVATION: &str = "activation";
const MODE_WEIGHT: &str = "weight";

/// Build the single-sided entry for an `object_type` / `module_name` override.
///
/// Activation overrides default to learnable fake quantize, weight overrides
/// to fixed fake quantize; both default to the min-max observer. Names are
/// checked against the full registry whatever the chip.
pub(super) fn layer_entry(
    registry: &AlgorithmRegistry,
    layer: &str,
    spec: &LayerOverride,
) -> Result<QConfigEntry, ConfigError> {
    match spec.mode.as_str() {
        MODE_ACTIVATION => {
            let fake_quantize = lookup_or(
                registry,
                spec.afakequantize.as_deref(),
                FakeQuantizeKind::Learnable,
            )?;
            let observer = observer_or(registry, spec.aobserver.as_deref(), ObserverKind::MinMax)?;
            let scheme = QuantizeScheme::symmetric_per_tensor(spec.bit);
            Ok(QConfigEntry::activation_only(FakeQuantizeSpec::new(
                Side::Activation,
                fake_quantize,
                observer,
                scheme,
            )))
        }
        MODE_WEIGHT => {
            let fake_quantize = lookup_or(
                registry,
                spec.wfakequantize.as_deref(),
                FakeQuantizeKind::Fixed,
            )?;
            let observer = observer_or(registry, spec.wobserver.as_deref(), ObserverKind::MinMax)?;
            let scheme = QuantizeScheme::symmetric_per_tensor(spec.bit).with_symmetric_range(true);
            Ok(QConfigEntry::weight_only(FakeQuantizeSpec::new(
                Side::Weight,
                fake_quantize,
                observer,
                scheme,
            )))
        }
        other => Err(ConfigError::InvalidMode {
            layer: layer.to_string(),
            mode: other.to_string(),
        }),
    }
}

fn lookup_or(
    registry: &AlgorithmRegistry,
    name: Option<&str>,
    default: FakeQuantizeKind,
) -> Result<FakeQuantizeKind, ConfigError> {
    let name = name.unwrap_or(default.into());
    registry.lookup_fake_quantize(name, RegistryScope::Full)
}

fn observer_or(
    registry: &AlgorithmRegistry,
    name: Option<&str>,
    default: ObserverKind,
) -> Result<ObserverKind, ConfigError> {
    let name = name.unwrap_or(default.into());
    registry.lookup_observer(name)
}

/// Bulk precision lists applied after every other override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkPrecision {
    Int4,
    Int8,
    Fp16,
}

impl BulkPrecision {
    /// Evaluation order; later lists overwrite earlier ones.
    pub const ORDER: [BulkPrecision; 3] = [Self::Int4, Self::Int8, Self::Fp16];

    pub fn bit(self) -> u32 {
        match self {
            Self::Int4 => 4,
            Self::Int8 => 8,
            Self::Fp16 => 16,
        }
    }

    /// Config key of the list.
    pub fn key(self) -> &'static str {
        match self {
            Self::Int4 => "int4_op",
            Self::Int8 => "int8_op",
            Self::Fp16 => "f16_op",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Int4 => "INT4",
            Self::Int8 => "INT8",
            Self::Fp16 => "F16",
        }
    }

    fn fake_quantize(self) -> FakeQuantizeKind {
        match self {
            Self::Int4 | Self::Int8 => FakeQuantizeKind::Learnable,
            Self::Fp16 => FakeQuantizeKind::Fp16,
        }
    }

    /// Both-sided entry shared by every module in the list.
    pub(super) fn entry(self, registry: &AlgorithmRegistry) -> Result<QConfigEntry, ConfigError> {
        let fake_quantize = lookup_or(registry, None, self.fake_quantize())?;
        let weight_observer = observer_or(registry, None, ObserverKind::MinMax)?;
        let act_observer = observer_or(registry, None, ObserverKind::EmaMinMax)?;
        let scheme = QuantizeScheme::symmetric_per_tensor(self.bit());

        Ok(QConfigEntry::both(
            FakeQuantizeSpec::new(Side::Activation, fake_quantize, act_observer, scheme.clone()),
            FakeQuantizeSpec::new(Side::Weight, fake_quantize, weight_observer, scheme),
        ))
    }

    pub(super) fn log_insert(self, name: &str) {
        info!("insert {} FakeQuantize: {name}", self.label());
    }
}
