//! Quantization scheme: the structural shape of a quantization.
//!
//! A scheme fixes bit width, symmetry and granularity independently of the
//! algorithm that realizes it. `to_observer_params` flattens it into the
//! keyword mapping a fake-quantize constructor consumes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Flat parameter mapping handed to fake-quantize/observer constructors.
pub type ParamMap = BTreeMap<String, Value>;

// Observer parameter keys
pub const PARAM_QUANT_MIN: &str = "quant_min";
pub const PARAM_QUANT_MAX: &str = "quant_max";
pub const PARAM_DTYPE: &str = "dtype";
pub const PARAM_POT_SCALE: &str = "pot_scale";
pub const PARAM_QSCHEME: &str = "qscheme";
pub const PARAM_REDUCE_RANGE: &str = "reduce_range";
pub const PARAM_CH_AXIS: &str = "ch_axis";
pub const PARAM_SYMMETRIC_RANGE: &str = "symmetric_range";

/// Granularity and symmetry combined, as observers name it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QScheme {
    PerTensorAffine,
    PerTensorSymmetric,
    PerChannelAffine,
    PerChannelSymmetric,
}

impl QScheme {
    fn as_str(self) -> &'static str {
        match self {
            Self::PerTensorAffine => "per_tensor_affine",
            Self::PerTensorSymmetric => "per_tensor_symmetric",
            Self::PerChannelAffine => "per_channel_affine",
            Self::PerChannelSymmetric => "per_channel_symmetric",
        }
    }
}

/// Immutable description of a quantization scheme.
///
/// The core flags are fixed at construction. Only `extra_params` can grow
/// afterwards, through [`QuantizeScheme::merge_extra_params`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuantizeScheme {
    bit: u32,
    symmetry: bool,
    per_channel: bool,
    pot_scale: bool,
    symmetric_range: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extra_params: ParamMap,
}

impl QuantizeScheme {
    /// Create a scheme without symmetric range or extra params.
    pub fn new(bit: u32, symmetry: bool, per_channel: bool, pot_scale: bool) -> Self {
        Self {
            bit,
            symmetry,
            per_channel,
            pot_scale,
            symmetric_range: false,
            extra_params: ParamMap::new(),
        }
    }

    /// Symmetric per-tensor scheme without power-of-two scale.
    pub fn symmetric_per_tensor(bit: u32) -> Self {
        Self::new(bit, true, false, false)
    }

    /// Symmetric per-channel scheme without power-of-two scale.
    pub fn symmetric_per_channel(bit: u32) -> Self {
        Self::new(bit, true, true, false)
    }

    /// Restrict the symmetric range to `[-(2^(b-1) - 1), 2^(b-1) - 1]`.
    #[must_use]
    pub fn with_symmetric_range(mut self, symmetric_range: bool) -> Self {
        self.symmetric_range = symmetric_range;
        self
    }

    /// Attach algorithm-specific extra params at construction.
    #[must_use]
    pub fn with_extra_params(mut self, extra: ParamMap) -> Self {
        self.merge_extra_params(extra);
        self
    }

    /// Additive union into the extra params, last write wins.
    pub fn merge_extra_params<I>(&mut self, extra: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.extra_params.extend(extra);
    }

    pub fn bit(&self) -> u32 {
        self.bit
    }

    pub fn symmetry(&self) -> bool {
        self.symmetry
    }

    pub fn per_channel(&self) -> bool {
        self.per_channel
    }

    pub fn pot_scale(&self) -> bool {
        self.pot_scale
    }

    pub fn symmetric_range(&self) -> bool {
        self.symmetric_range
    }

    pub fn extra_params(&self) -> &ParamMap {
        &self.extra_params
    }

    /// The observer qscheme implied by granularity and symmetry.
    pub fn qscheme(&self) -> QScheme {
        match (self.per_channel, self.symmetry) {
            (true, true) => QScheme::PerChannelSymmetric,
            (true, false) => QScheme::PerChannelAffine,
            (false, true) => QScheme::PerTensorSymmetric,
            (false, false) => QScheme::PerTensorAffine,
        }
    }

    /// Integer range `(quant_min, quant_max)` of the quantized domain.
    ///
    /// Symmetric: `[-2^(b-1), 2^(b-1) - 1]`, lower bound raised by one with
    /// symmetric range. Asymmetric: `[0, 2^b - 1]`.
    pub fn quant_range(&self) -> (i64, i64) {
        let bit = self.bit.min(62);
        if self.symmetry {
            let half = 1i64 << (bit.saturating_sub(1));
            let qmin = if self.symmetric_range { -half + 1 } else { -half };
            (qmin, half - 1)
        } else {
            (0, (1i64 << bit) - 1)
        }
    }

    /// Flatten into the keyword mapping consumed by fake-quantize constructors.
    ///
    /// Extra params are applied last and override the derived keys.
    pub fn to_observer_params(&self) -> ParamMap {
        let (quant_min, quant_max) = self.quant_range();
        let dtype = if self.symmetry { "qint8" } else { "quint8" };
        let ch_axis = if self.per_channel { 0 } else { -1 };

        let mut params = ParamMap::new();
        params.insert(PARAM_QUANT_MIN.into(), json!(quant_min));
        params.insert(PARAM_QUANT_MAX.into(), json!(quant_max));
        params.insert(PARAM_DTYPE.into(), json!(dtype));
        params.insert(PARAM_POT_SCALE.into(), json!(self.pot_scale));
        params.insert(PARAM_QSCHEME.into(), json!(self.qscheme().as_str()));
        params.insert(PARAM_REDUCE_RANGE.into(), json!(false));
        params.insert(PARAM_CH_AXIS.into(), json!(ch_axis));
        params.insert(PARAM_SYMMETRIC_RANGE.into(), json!(self.symmetric_range));
        params.extend(self.extra_params.clone());
        params
    }
}

impl Default for QuantizeScheme {
    fn default() -> Self {
        Self::symmetric_per_tensor(8)
    }
}

impl fmt::Display for QuantizeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Symmetric: {} / Bitwidth: {} / Per channel: {} / Pot scale: {}",
            self.symmetry, self.bit, self.per_channel, self.pot_scale
        )?;
        if self.symmetric_range {
            write!(f, " / Symmetric range: true")?;
        }
        if !self.extra_params.is_empty() {
            write!(f, " / Extra params: {}", json!(self.extra_params))?;
        }
        Ok(())
    }
}
