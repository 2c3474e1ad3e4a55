//! Observer and fake-quantize algorithm registries.
//!
//! Algorithms are a closed enumeration addressed by their class names
//! (`"LearnableFakeQuantize"`, `"EMAMinMaxObserver"`). The registry value
//! decides which of them a lookup may return, so tests can substitute a
//! narrower table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::ConfigError;

/// Statistics collectors deriving scale and zero point.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum ObserverKind {
    #[strum(serialize = "MinMaxObserver")]
    #[serde(rename = "MinMaxObserver")]
    MinMax,
    /// More general choice.
    #[strum(serialize = "EMAMinMaxObserver")]
    #[serde(rename = "EMAMinMaxObserver")]
    EmaMinMax,
    #[strum(serialize = "MinMaxFloorObserver")]
    #[serde(rename = "MinMaxFloorObserver")]
    MinMaxFloor,
    #[strum(serialize = "PoTModeObserver")]
    #[serde(rename = "PoTModeObserver")]
    PotMode,
    #[strum(serialize = "EMAQuantileObserver")]
    #[serde(rename = "EMAQuantileObserver")]
    EmaQuantile,
    /// Usually paired with DSQ.
    #[strum(serialize = "ClipStdObserver")]
    #[serde(rename = "ClipStdObserver")]
    ClipStd,
    /// Usually paired with LSQ.
    #[strum(serialize = "LSQObserver")]
    #[serde(rename = "LSQObserver")]
    Lsq,
    #[strum(serialize = "MSEObserver")]
    #[serde(rename = "MSEObserver")]
    Mse,
    #[strum(serialize = "EMAMSEObserver")]
    #[serde(rename = "EMAMSEObserver")]
    EmaMse,
    #[strum(serialize = "KLDObserver")]
    #[serde(rename = "KLDObserver")]
    Kld,
}

/// Fake-quantize algorithms.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub enum FakeQuantizeKind {
    /// Unlearnable scale/zero point.
    #[strum(serialize = "FixedFakeQuantize")]
    #[serde(rename = "FixedFakeQuantize")]
    Fixed,
    /// Learnable scale/zero point.
    #[strum(serialize = "LearnableFakeQuantize")]
    #[serde(rename = "LearnableFakeQuantize")]
    Learnable,
    #[strum(serialize = "NNIEFakeQuantize")]
    #[serde(rename = "NNIEFakeQuantize")]
    Nnie,
    #[strum(serialize = "DoReFaFakeQuantize")]
    #[serde(rename = "DoReFaFakeQuantize")]
    DoReFa,
    #[strum(serialize = "DSQFakeQuantize")]
    #[serde(rename = "DSQFakeQuantize")]
    Dsq,
    #[strum(serialize = "PACTFakeQuantize")]
    #[serde(rename = "PACTFakeQuantize")]
    Pact,
    #[strum(serialize = "TqtFakeQuantize")]
    #[serde(rename = "TqtFakeQuantize")]
    Tqt,
    #[strum(serialize = "AdaRoundFakeQuantize")]
    #[serde(rename = "AdaRoundFakeQuantize")]
    AdaRound,
    /// BRECQ and QDrop.
    #[strum(serialize = "QDropFakeQuantize")]
    #[serde(rename = "QDropFakeQuantize")]
    QDrop,
    #[strum(serialize = "E4M3FakeQuantize")]
    #[serde(rename = "E4M3FakeQuantize")]
    E4M3,
    #[strum(serialize = "E5M2FakeQuantize")]
    #[serde(rename = "E5M2FakeQuantize")]
    E5M2,
    #[strum(serialize = "GPTQFakeQuantize")]
    #[serde(rename = "GPTQFakeQuantize")]
    Gptq,
    #[strum(serialize = "FP4FakeQuantize")]
    #[serde(rename = "FP4FakeQuantize")]
    Fp4,
    #[strum(serialize = "GPTQFP4FakeQuantize")]
    #[serde(rename = "GPTQFP4FakeQuantize")]
    GptqFp4,
    #[strum(serialize = "FP4GROUPFakeQuantize")]
    #[serde(rename = "FP4GROUPFakeQuantize")]
    Fp4Group,
    #[strum(serialize = "FP4GROUPFakeQuantize1")]
    #[serde(rename = "FP4GROUPFakeQuantize1")]
    Fp4Group1,
    #[strum(serialize = "Fp16FakeQuantize")]
    #[serde(rename = "Fp16FakeQuantize")]
    Fp16,
    #[strum(serialize = "BF16FakeQuantize")]
    #[serde(rename = "BF16FakeQuantize")]
    Bf16,
}

impl FakeQuantizeKind {
    /// Algorithms the hardware toolchains can lower.
    pub const HARDWARE: [FakeQuantizeKind; 12] = [
        Self::Fixed,
        Self::Learnable,
        Self::DoReFa,
        Self::Dsq,
        Self::Pact,
        Self::Tqt,
        Self::AdaRound,
        Self::QDrop,
        Self::E4M3,
        Self::E5M2,
        Self::Fp16,
        Self::Bf16,
    ];
}

/// Which fake-quantize set a lookup is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RegistryScope {
    /// Every algorithm, used by the academic (software-only) target.
    Full,
    /// The subset real chips support.
    Hardware,
}

static BUILTIN: LazyLock<AlgorithmRegistry> = LazyLock::new(|| {
    AlgorithmRegistry::new(
        ObserverKind::iter(),
        FakeQuantizeKind::iter(),
        FakeQuantizeKind::HARDWARE,
    )
});

/// Immutable name tables for observers and fake-quantize algorithms.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmRegistry {
    observers: BTreeSet<ObserverKind>,
    fake_quantize: BTreeSet<FakeQuantizeKind>,
    hardware_fake_quantize: BTreeSet<FakeQuantizeKind>,
}

impl AlgorithmRegistry {
    /// Build a registry from explicit sets.
    ///
    /// The hardware set is intersected with the full set.
    pub fn new(
        observers: impl IntoIterator<Item = ObserverKind>,
        fake_quantize: impl IntoIterator<Item = FakeQuantizeKind>,
        hardware_fake_quantize: impl IntoIterator<Item = FakeQuantizeKind>,
    ) -> Self {
        let fake_quantize: BTreeSet<_> = fake_quantize.into_iter().collect();
        let hardware_fake_quantize = hardware_fake_quantize
            .into_iter()
            .filter(|kind| fake_quantize.contains(kind))
            .collect();
        Self {
            observers: observers.into_iter().collect(),
            fake_quantize,
            hardware_fake_quantize,
        }
    }

    /// The process-wide registry with every known algorithm.
    pub fn builtin() -> &'static AlgorithmRegistry {
        &BUILTIN
    }

    /// Fake-quantize set for a scope.
    pub fn fake_quantize(&self, scope: RegistryScope) -> &BTreeSet<FakeQuantizeKind> {
        match scope {
            RegistryScope::Full => &self.fake_quantize,
            RegistryScope::Hardware => &self.hardware_fake_quantize,
        }
    }

    pub fn observers(&self) -> &BTreeSet<ObserverKind> {
        &self.observers
    }

    /// Look up an observer by class name.
    pub fn lookup_observer(&self, name: &str) -> Result<ObserverKind, ConfigError> {
        ObserverKind::from_str(name)
            .ok()
            .filter(|kind| self.observers.contains(kind))
            .ok_or_else(|| ConfigError::UnknownObserver {
                name: name.to_string(),
                supported: join_names(self.observers.iter()),
            })
    }

    /// Look up a fake-quantize algorithm by class name within a scope.
    pub fn lookup_fake_quantize(
        &self,
        name: &str,
        scope: RegistryScope,
    ) -> Result<FakeQuantizeKind, ConfigError> {
        let allowed = self.fake_quantize(scope);
        FakeQuantizeKind::from_str(name)
            .ok()
            .filter(|kind| allowed.contains(kind))
            .ok_or_else(|| ConfigError::UnknownFakeQuantize {
                name: name.to_string(),
                scope: scope.to_string(),
                supported: join_names(allowed.iter()),
            })
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

fn join_names<'a, T>(items: impl Iterator<Item = &'a T>) -> String
where
    T: std::fmt::Display + 'a,
{
    items.map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
