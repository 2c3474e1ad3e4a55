//! Schema of the nested preparation config (YAML or JSON)
//!
//! Field names follow the keys users already write in their prepare
//! configs: `quant_dict`, `extra_qconfig_dict`, `preserve_attr`, ...

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

use crate::quant::{ParamMap, QuantizeScheme};

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Which tensors get fake-quantized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuantMode {
    /// Weights and activations (bias is quantized too)
    WeightActivation,
    /// Weights only
    WeightOnly,
}

/// Strategy that rejects weight-only quantization.
pub const STRATEGY_CNN: &str = "CNN";

/// Trace-time argument bindings: input name → fixed value.
pub type ConcreteArgs = ParamMap;

/// Complete preparation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Chip, strategy and quantization mode
    pub quant_dict: QuantDict,

    /// Algorithm, scheme and per-layer overrides
    #[serde(default)]
    pub extra_qconfig_dict: ExtraQConfig,

    /// Extra params for the chip quantizer
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_quantizer_dict: ParamMap,

    /// Attributes to carry across the trace: submodule path ("" = root) → names
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub preserve_attr: BTreeMap<String, Vec<String>>,

    /// Fixed trace-time bindings for forward inputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub concrete_args: ConcreteArgs,

    /// Extra module types treated as leaves during tracing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leaf_module: Vec<String>,

    /// Fusion pattern overrides, passed through to the quantizer
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_fuse_dict: ParamMap,
}

impl PrepareConfig {
    /// Minimal config for a chip with no overrides.
    pub fn new(chip: impl Into<String>, strategy: impl Into<String>, quantmode: QuantMode) -> Self {
        Self {
            quant_dict: QuantDict {
                chip: chip.into(),
                strategy: strategy.into(),
                quantmode: quantmode.to_string(),
            },
            extra_qconfig_dict: ExtraQConfig::default(),
            extra_quantizer_dict: ParamMap::new(),
            preserve_attr: BTreeMap::new(),
            concrete_args: ConcreteArgs::new(),
            leaf_module: Vec::new(),
            extra_fuse_dict: ParamMap::new(),
        }
    }
}

/// Target selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantDict {
    /// Chip identifier: "BM1688" | "BM1684X" | "CV183X" | "BM1690" | "Academic"
    pub chip: String,

    /// Model strategy, e.g. "CNN" or "Transformer" (validation only)
    pub strategy: String,

    /// "weight_activation" | "weight_only", parsed by the resolver
    pub quantmode: String,
}

/// Optional overrides on top of the chip profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraQConfig {
    /// Weight observer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_observer: Option<String>,

    /// Activation observer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_observer: Option<String>,

    /// Weight fake quantize name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_fakequantize: Option<String>,

    /// Activation fake quantize name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_fakequantize: Option<String>,

    /// Params for the weight fake quantize constructor
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub w_fakeq_params: ParamMap,

    /// Params for the activation fake quantize constructor
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub a_fakeq_params: ParamMap,

    /// Weight scheme override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_qscheme: Option<SchemeSpec>,

    /// Activation scheme override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a_qscheme: Option<SchemeSpec>,

    /// Extra args merged into the weight scheme
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub w_observer_extra_args: ParamMap,

    /// Extra args merged into the activation scheme
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub a_observer_extra_args: ParamMap,

    /// Per-operator-type overrides (e.g. "Linear", "add")
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub object_type: BTreeMap<String, LayerOverride>,

    /// Per-module-name overrides (e.g. "backbone.conv1")
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub module_name: BTreeMap<String, LayerOverride>,

    /// Modules forced to 4-bit on both sides
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub int4_op: Vec<String>,

    /// Modules forced to 8-bit on both sides
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub int8_op: Vec<String>,

    /// Modules forced to fp16 on both sides
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub f16_op: Vec<String>,
}

/// Scheme override as written in configs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeSpec {
    /// Bit width
    #[serde(default = "default_scheme_bit")]
    pub bit: u32,

    /// Symmetric quantization
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub symmetry: bool,

    /// Per-channel granularity
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub per_channel: bool,

    /// Power-of-two scale
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub pot_scale: bool,

    /// Restricted symmetric range
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub symmetric_range: bool,

    /// Algorithm-specific extras, kept verbatim
    #[serde(flatten)]
    pub extra: ParamMap,
}

impl Default for SchemeSpec {
    fn default() -> Self {
        Self {
            bit: default_scheme_bit(),
            symmetry: true,
            per_channel: false,
            pot_scale: false,
            symmetric_range: false,
            extra: ParamMap::new(),
        }
    }
}

impl SchemeSpec {
    /// Build the immutable scheme this override describes.
    pub fn to_scheme(&self) -> QuantizeScheme {
        QuantizeScheme::new(self.bit, self.symmetry, self.per_channel, self.pot_scale)
            .with_symmetric_range(self.symmetric_range)
            .with_extra_params(self.extra.clone())
    }
}

/// Single-sided override for one operator type or module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOverride {
    /// "activation" | "weight"
    pub mode: String,

    /// Bit width
    #[serde(default = "default_override_bit")]
    pub bit: u32,

    /// Activation fake quantize name (mode = activation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub afakequantize: Option<String>,

    /// Activation observer name (mode = activation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aobserver: Option<String>,

    /// Weight fake quantize name (mode = weight)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wfakequantize: Option<String>,

    /// Weight observer name (mode = weight)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wobserver: Option<String>,
}

impl LayerOverride {
    /// Activation override with default algorithm and observer.
    pub fn activation(bit: u32) -> Self {
        Self::with_mode("activation", bit)
    }

    /// Weight override with default algorithm and observer.
    pub fn weight(bit: u32) -> Self {
        Self::with_mode("weight", bit)
    }

    fn with_mode(mode: &str, bit: u32) -> Self {
        Self {
            mode: mode.to_string(),
            bit,
            afakequantize: None,
            aobserver: None,
            wfakequantize: None,
            wobserver: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_scheme_bit() -> u32 {
    8
}

fn default_override_bit() -> u32 {
    4
}
