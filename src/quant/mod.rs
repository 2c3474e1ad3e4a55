//! Quantization configuration
//!
//! Chip profiles, algorithm registries and the resolver that turns a sparse
//! request into a complete quantization plan:
//! - Quantization schemes and their observer params
//! - Observer / fake-quantize registries (full and hardware subsets)
//! - Per-chip defaults
//! - Global, per-operator-type and per-module-name overrides

pub mod chip;
pub mod qconfig;
pub mod registry;
pub mod resolve;
pub mod scheme;

pub use chip::{chip_names, Chip, ChipProfile, ChipTable, QuantType};
pub use qconfig::{FakeQuantizeSpec, QConfigEntry, QConfigMapping, Side};
pub use registry::{AlgorithmRegistry, FakeQuantizeKind, ObserverKind, RegistryScope};
pub use resolve::{BulkPrecision, Resolver};
pub use scheme::{ParamMap, QScheme, QuantizeScheme};
