//! Chip targets and their default quantization choices.

use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::registry::{FakeQuantizeKind, ObserverKind, RegistryScope};
use super::scheme::QuantizeScheme;
use crate::error::ConfigError;

/// Supported deployment targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter, Serialize,
)]
pub enum Chip {
    #[strum(serialize = "BM1688")]
    #[serde(rename = "BM1688")]
    Bm1688,
    #[strum(serialize = "BM1684X")]
    #[serde(rename = "BM1684X")]
    Bm1684x,
    #[strum(serialize = "CV183X")]
    #[serde(rename = "CV183X")]
    Cv183x,
    #[strum(serialize = "BM1690")]
    #[serde(rename = "BM1690")]
    Bm1690,
    /// Software-only target with the full algorithm registry.
    #[strum(serialize = "Academic")]
    #[serde(rename = "Academic")]
    Academic,
}

impl Chip {
    /// Bit widths accepted for scheme overrides, `None` when unrestricted.
    pub fn allowed_bits(self) -> Option<&'static [u32]> {
        match self {
            Self::Bm1688 => Some(&[4, 8]),
            Self::Bm1684x | Self::Bm1690 => Some(&[8]),
            Self::Cv183x | Self::Academic => None,
        }
    }

    /// Fake-quantize registry lookups are checked against.
    pub fn registry_scope(self) -> RegistryScope {
        match self {
            Self::Academic => RegistryScope::Full,
            _ => RegistryScope::Hardware,
        }
    }

    /// Whether the quantizer runs its transformer (`prepare_swint`) path.
    pub fn uses_transformer_path(self) -> bool {
        self == Self::Academic
    }
}

/// Quantization family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuantType {
    Affine,
}

/// Static defaults for one chip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipProfile {
    pub qtype: QuantType,
    pub w_qscheme: QuantizeScheme,
    pub a_qscheme: QuantizeScheme,
    pub default_weight_quantize: FakeQuantizeKind,
    pub default_act_quantize: FakeQuantizeKind,
    pub default_weight_observer: ObserverKind,
    pub default_act_observer: ObserverKind,
}

impl ChipProfile {
    /// Learnable fake quantize, min-max weights, EMA min-max activations.
    fn learnable_affine(w_qscheme: QuantizeScheme) -> Self {
        Self {
            qtype: QuantType::Affine,
            w_qscheme,
            a_qscheme: QuantizeScheme::symmetric_per_tensor(8),
            default_weight_quantize: FakeQuantizeKind::Learnable,
            default_act_quantize: FakeQuantizeKind::Learnable,
            default_weight_observer: ObserverKind::MinMax,
            default_act_observer: ObserverKind::EmaMinMax,
        }
    }
}

/// Read-only chip profile lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipTable {
    profiles: BTreeMap<Chip, ChipProfile>,
}

static BUILTIN: LazyLock<ChipTable> = LazyLock::new(|| {
    let per_channel = QuantizeScheme::symmetric_per_channel(8);
    ChipTable::new([
        (Chip::Bm1688, ChipProfile::learnable_affine(per_channel.clone())),
        (Chip::Bm1684x, ChipProfile::learnable_affine(per_channel.clone())),
        (
            Chip::Cv183x,
            ChipProfile::learnable_affine(per_channel.clone().with_symmetric_range(true)),
        ),
        (Chip::Bm1690, ChipProfile::learnable_affine(per_channel.clone())),
        (Chip::Academic, ChipProfile::learnable_affine(per_channel)),
    ])
});

impl ChipTable {
    pub fn new(profiles: impl IntoIterator<Item = (Chip, ChipProfile)>) -> Self {
        Self {
            profiles: profiles.into_iter().collect(),
        }
    }

    /// The process-wide table of built-in chips.
    pub fn builtin() -> &'static ChipTable {
        &BUILTIN
    }

    /// Parse a chip identifier and require it to be in this table.
    pub fn chip(&self, name: &str) -> Result<Chip, ConfigError> {
        Chip::from_str(name)
            .ok()
            .filter(|chip| self.profiles.contains_key(chip))
            .ok_or_else(|| self.unsupported(name))
    }

    pub fn profile(&self, chip: Chip) -> Result<&ChipProfile, ConfigError> {
        self.profiles
            .get(&chip)
            .ok_or_else(|| self.unsupported(&chip.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Chip, &ChipProfile)> {
        self.profiles.iter()
    }

    fn unsupported(&self, name: &str) -> ConfigError {
        ConfigError::UnsupportedChip {
            chip: name.to_string(),
            supported: self
                .profiles
                .keys()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl Default for ChipTable {
    fn default() -> Self {
        ChipTable::builtin().clone()
    }
}

/// All chip identifiers, in declaration order.
pub fn chip_names() -> Vec<String> {
    Chip::iter().map(|chip| chip.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_chip() {
        let table = ChipTable::builtin();
        for chip in Chip::iter() {
            assert!(table.profile(chip).is_ok(), "missing profile for {chip}");
        }
    }

    #[test]
    fn test_chip_parse_uses_identifiers() {
        let table = ChipTable::builtin();
        assert_eq!(table.chip("BM1684X"), Ok(Chip::Bm1684x));
        assert_eq!(table.chip("Academic"), Ok(Chip::Academic));
        assert!(matches!(
            table.chip("bm1684x"),
            Err(ConfigError::UnsupportedChip { .. })
        ));
    }

    #[test]
    fn test_cv183x_weights_use_symmetric_range() {
        let profile = ChipTable::builtin().profile(Chip::Cv183x).unwrap();
        assert!(profile.w_qscheme.symmetric_range());
        assert!(profile.w_qscheme.per_channel());
        assert!(!profile.a_qscheme.per_channel());
    }

    #[test]
    fn test_allowed_bits_per_family() {
        assert_eq!(Chip::Bm1688.allowed_bits(), Some(&[4, 8][..]));
        assert_eq!(Chip::Bm1684x.allowed_bits(), Some(&[8][..]));
        assert_eq!(Chip::Bm1690.allowed_bits(), Some(&[8][..]));
        assert_eq!(Chip::Academic.allowed_bits(), None);
    }

    #[test]
    fn test_registry_scope() {
        assert_eq!(Chip::Academic.registry_scope(), RegistryScope::Full);
        assert_eq!(Chip::Bm1688.registry_scope(), RegistryScope::Hardware);
        assert!(Chip::Academic.uses_transformer_path());
        assert!(!Chip::Cv183x.uses_transformer_path());
    }

    #[test]
    fn test_substitute_table_rejects_missing_chip() {
        let table = ChipTable::new([(
            Chip::Bm1688,
            ChipProfile::learnable_affine(QuantizeScheme::default()),
        )]);
        assert!(table.chip("BM1688").is_ok());
        let err = table.chip("BM1690").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedChip { ref supported, .. } if supported == "BM1688"));
    }
}
