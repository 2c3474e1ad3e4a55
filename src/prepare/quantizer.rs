//! Chip quantizers
//!
//! A quantizer splices fake-quantize modules into a graph module following a
//! resolved [`QConfigMapping`]. Quantizers are built per request from a
//! factory registered for the target chip.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::QuantDict;
use crate::error::{Error, QuantizerError, Result};
use crate::graph::GraphModule;
use crate::quant::{Chip, ParamMap, QConfigMapping};

/// Inserts quantization into a prepared graph module.
pub trait Quantizer {
    /// Convolutional path.
    fn prepare(
        &self,
        model: GraphModule,
        qconfig: &QConfigMapping,
    ) -> std::result::Result<GraphModule, QuantizerError>;

    /// Transformer path, used by the academic target.
    fn prepare_swint(
        &self,
        model: GraphModule,
        qconfig: &QConfigMapping,
    ) -> std::result::Result<GraphModule, QuantizerError> {
        self.prepare(model, qconfig)
    }
}

/// Everything a quantizer factory receives.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizerArgs {
    pub extra_quantizer_dict: ParamMap,
    pub extra_fuse_dict: ParamMap,
    pub quant_dict: QuantDict,
    pub chip: Chip,
}

/// Builds a quantizer for one request.
pub type QuantizerFactory = Box<dyn Fn(QuantizerArgs) -> Box<dyn Quantizer> + Send + Sync>;

/// Chip → quantizer factory.
#[derive(Default)]
pub struct QuantizerRegistry {
    factories: BTreeMap<Chip, QuantizerFactory>,
}

impl QuantizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a chip, replacing any earlier one.
    pub fn register<F>(&mut self, chip: Chip, factory: F)
    where
        F: Fn(QuantizerArgs) -> Box<dyn Quantizer> + Send + Sync + 'static,
    {
        self.factories.insert(chip, Box::new(factory));
    }

    /// Builder form of [`QuantizerRegistry::register`].
    #[must_use]
    pub fn with<F>(mut self, chip: Chip, factory: F) -> Self
    where
        F: Fn(QuantizerArgs) -> Box<dyn Quantizer> + Send + Sync + 'static,
    {
        self.register(chip, factory);
        self
    }

    pub fn contains(&self, chip: Chip) -> bool {
        self.factories.contains_key(&chip)
    }

    pub fn chips(&self) -> impl Iterator<Item = Chip> + '_ {
        self.factories.keys().copied()
    }

    /// Build the quantizer for the chip named in `args`.
    pub fn build(&self, args: QuantizerArgs) -> Result<Box<dyn Quantizer>> {
        let factory = self
            .factories
            .get(&args.chip)
            .ok_or_else(|| Error::QuantizerNotRegistered(args.chip.to_string()))?;
        Ok(factory(args))
    }
}

impl fmt::Debug for QuantizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantizerRegistry")
            .field("chips", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
