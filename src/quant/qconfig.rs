//! Resolved quantization configuration tree.
//!
//! Everything here is plain data. A quantizer turns each
//! [`FakeQuantizeSpec`] into a live fake-quantize module when it splices the
//! graph; nothing callable crosses the resolver boundary.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::registry::{FakeQuantizeKind, ObserverKind};
use super::scheme::{ParamMap, QuantizeScheme};
use crate::error::ConfigError;

/// Which tensor a fake-quantize spec applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Weight,
    Activation,
}

impl Side {
    /// Config key prefix (`w` / `a`).
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Weight => "w",
            Self::Activation => "a",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weight => write!(f, "weight"),
            Self::Activation => write!(f, "activation"),
        }
    }
}

/// Deferred fake-quantize construction: algorithm, observer and parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FakeQuantizeSpec {
    pub side: Side,
    pub fake_quantize: FakeQuantizeKind,
    pub observer: ObserverKind,
    pub scheme: QuantizeScheme,
    /// Algorithm parameters supplied alongside the scheme (`*_fakeq_params`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fakeq_params: ParamMap,
}

impl FakeQuantizeSpec {
    pub fn new(
        side: Side,
        fake_quantize: FakeQuantizeKind,
        observer: ObserverKind,
        scheme: QuantizeScheme,
    ) -> Self {
        Self {
            side,
            fake_quantize,
            observer,
            scheme,
            fakeq_params: ParamMap::new(),
        }
    }

    #[must_use]
    pub fn with_fakeq_params(mut self, params: ParamMap) -> Self {
        self.fakeq_params = params;
        self
    }

    /// All constructor keyword arguments, flattened.
    ///
    /// A key supplied by both the fake-quantize params and the scheme is
    /// rejected rather than silently shadowed.
    pub fn constructor_params(&self) -> Result<ParamMap, ConfigError> {
        let mut params = self.fakeq_params.clone();
        for (key, value) in self.scheme.to_observer_params() {
            if params.contains_key(&key) {
                return Err(ConfigError::DuplicateParam {
                    key,
                    side: self.side.to_string(),
                    side_prefix: self.side.prefix().to_string(),
                });
            }
            params.insert(key, value);
        }
        Ok(params)
    }
}

impl fmt::Display for FakeQuantizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FakeQuantize: {} Params: {:?}\n    Observer:     {} Params: {}",
            self.fake_quantize, self.fakeq_params, self.observer, self.scheme
        )
    }
}

/// One configuration node: either side may be absent in overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QConfigEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<FakeQuantizeSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<FakeQuantizeSpec>,
}

impl QConfigEntry {
    pub fn both(activation: FakeQuantizeSpec, weight: FakeQuantizeSpec) -> Self {
        Self {
            activation: Some(activation),
            weight: Some(weight),
        }
    }

    pub fn activation_only(activation: FakeQuantizeSpec) -> Self {
        Self {
            activation: Some(activation),
            weight: None,
        }
    }

    /// Weight-only override; activations fall back to the global config.
    pub fn weight_only(weight: FakeQuantizeSpec) -> Self {
        Self {
            activation: None,
            weight: Some(weight),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.activation.is_some() && self.weight.is_some()
    }

    pub fn sides(&self) -> impl Iterator<Item = &FakeQuantizeSpec> {
        self.activation.iter().chain(self.weight.iter())
    }
}

/// Complete quantization plan: global default plus keyed overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QConfigMapping {
    pub global: QConfigEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<BTreeMap<String, QConfigEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<BTreeMap<String, QConfigEntry>>,
}

impl QConfigMapping {
    pub fn new(global: QConfigEntry) -> Self {
        Self {
            global,
            object_type: None,
            module_name: None,
        }
    }

    /// Insert an operator-type override, replacing an earlier one.
    pub fn set_object_type(&mut self, op: impl Into<String>, entry: QConfigEntry) {
        self.object_type
            .get_or_insert_with(BTreeMap::new)
            .insert(op.into(), entry);
    }

    /// Insert a module-name override, replacing an earlier one.
    pub fn set_module_name(&mut self, name: impl Into<String>, entry: QConfigEntry) {
        self.module_name
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), entry);
    }

    pub fn object_type_entry(&self, op: &str) -> Option<&QConfigEntry> {
        self.object_type.as_ref().and_then(|map| map.get(op))
    }

    pub fn module_name_entry(&self, name: &str) -> Option<&QConfigEntry> {
        self.module_name.as_ref().and_then(|map| map.get(name))
    }

    /// Every entry: global first, then object types, then module names.
    pub fn entries(&self) -> impl Iterator<Item = &QConfigEntry> {
        std::iter::once(&self.global)
            .chain(self.object_type.iter().flat_map(BTreeMap::values))
            .chain(self.module_name.iter().flat_map(BTreeMap::values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn learnable(side: Side, bit: u32) -> FakeQuantizeSpec {
        FakeQuantizeSpec::new(
            side,
            FakeQuantizeKind::Learnable,
            ObserverKind::MinMax,
            QuantizeScheme::symmetric_per_tensor(bit),
        )
    }

    #[test]
    fn test_constructor_params_merge_scheme_and_fakeq() {
        let spec = learnable(Side::Weight, 8)
            .with_fakeq_params(ParamMap::from([("use_grad_scaling".into(), json!(true))]));
        let params = spec.constructor_params().unwrap();
        assert_eq!(params["use_grad_scaling"], json!(true));
        assert_eq!(params["quant_max"], json!(127));
    }

    #[test]
    fn test_constructor_params_reject_duplicate_key() {
        let spec = learnable(Side::Activation, 8)
            .with_fakeq_params(ParamMap::from([("quant_min".into(), json!(0))]));
        let err = spec.constructor_params().unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateParam {
                key: "quant_min".into(),
                side: "activation".into(),
                side_prefix: "a".into(),
            }
        );
    }

    #[test]
    fn test_module_name_last_write_wins() {
        let mut mapping = QConfigMapping::new(QConfigEntry::both(
            learnable(Side::Activation, 8),
            learnable(Side::Weight, 8),
        ));
        mapping.set_module_name("layer1", QConfigEntry::weight_only(learnable(Side::Weight, 4)));
        mapping.set_module_name(
            "layer1",
            QConfigEntry::both(learnable(Side::Activation, 16), learnable(Side::Weight, 16)),
        );
        let entry = mapping.module_name_entry("layer1").unwrap();
        assert!(entry.is_complete());
        assert_eq!(entry.weight.as_ref().unwrap().scheme.bit(), 16);
        assert_eq!(mapping.module_name.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_override_maps_absent_until_used() {
        let mapping = QConfigMapping::new(QConfigEntry::both(
            learnable(Side::Activation, 8),
            learnable(Side::Weight, 8),
        ));
        assert!(mapping.object_type.is_none());
        assert!(mapping.module_name.is_none());
        assert_eq!(mapping.entries().count(), 1);
        let value = serde_json::to_value(&mapping).unwrap();
        assert!(value.get("object_type").is_none());
    }
}
