//! Preparation pipeline
//!
//! Resolve the quantization plan, trace the model, rewrite the graph and hand
//! it to the chip quantizer.

use strum::Display;
use tracing::{info, warn};

use super::preserve::PreservedAttrs;
use super::quantizer::{QuantizerArgs, QuantizerRegistry};
use crate::config::{validate_config, PrepareConfig};
use crate::error::Result;
use crate::graph::{
    deduplicate, extract_constants, swap_functional_modules, GraphModule, LeafModulePolicy,
    Module, PlaceholderShapes, Shape, ShapePropagator, Tracer,
};
use crate::quant::{AlgorithmRegistry, ChipTable, ParamMap, Resolver};

/// Model mode at preparation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ModelMode {
    Training,
    Eval,
}

impl ModelMode {
    pub fn of(model: &Module) -> Self {
        if model.is_training() {
            Self::Training
        } else {
            Self::Eval
        }
    }
}

/// Runs the full preparation flow with a tracer and a quantizer registry.
pub struct Preparer<T> {
    tracer: T,
    quantizers: QuantizerRegistry,
    chips: &'static ChipTable,
    registry: &'static AlgorithmRegistry,
    shapes: Box<dyn ShapePropagator>,
    fuse_patterns: ParamMap,
}

impl<T: Tracer> Preparer<T> {
    /// Preparer over the built-in chip table and algorithm registry.
    pub fn new(tracer: T, quantizers: QuantizerRegistry) -> Self {
        Self {
            tracer,
            quantizers,
            chips: ChipTable::builtin(),
            registry: AlgorithmRegistry::builtin(),
            shapes: Box::new(PlaceholderShapes),
            fuse_patterns: ParamMap::new(),
        }
    }

    #[must_use]
    pub fn with_shape_propagator(mut self, shapes: impl ShapePropagator + 'static) -> Self {
        self.shapes = Box::new(shapes);
        self
    }

    /// Fusion patterns merged into every `extra_fuse_dict`.
    ///
    /// These replace user entries with the same key.
    #[must_use]
    pub fn with_fuse_patterns(mut self, patterns: ParamMap) -> Self {
        self.fuse_patterns = patterns;
        self
    }

    pub fn quantizers(&self) -> &QuantizerRegistry {
        &self.quantizers
    }

    /// Prepare `model` for quantization-aware training or calibration.
    ///
    /// `model` is modified in place: functional wrappers are swapped for
    /// their traceable versions. Shape propagation runs only when
    /// `input_shapes` is given and its failure is not fatal.
    pub fn prepare(
        &self,
        model: &mut Module,
        config: &PrepareConfig,
        input_shapes: Option<&[Shape]>,
    ) -> Result<GraphModule> {
        validate_config(config)?;

        let quant = &config.quant_dict;
        let mode = ModelMode::of(model);
        info!("Quantize model Scheme: {} Mode: {mode}", quant.strategy);

        let resolver = Resolver::new(self.chips, self.registry);
        let (chip, qconfig) = resolver.resolve_for_chip(quant, &config.extra_qconfig_dict)?;

        swap_functional_modules(model);
        let preserved = PreservedAttrs::snapshot(model, &config.preserve_attr)?;

        let leaf = LeafModulePolicy::new(config.leaf_module.iter().cloned());
        let graph = self.tracer.trace(model, &config.concrete_args, &leaf)?;

        let mut modules = GraphModule::referenced_modules(&graph, model)?;
        let (graph, duplicated) = deduplicate(graph, &modules)?;
        let constants = extract_constants(&graph, model)?;
        modules.extend(duplicated);
        let mut graph_module = GraphModule::new(
            root_name(model),
            graph,
            modules,
            constants,
            model.is_training(),
        )?;

        if let Some(shapes) = input_shapes {
            if let Err(err) = self.shapes.propagate(&mut graph_module, shapes) {
                warn!("{err}, continuing without shapes");
            }
        }

        let mut extra_fuse_dict = config.extra_fuse_dict.clone();
        extra_fuse_dict.extend(self.fuse_patterns.clone());
        let quantizer = self.quantizers.build(QuantizerArgs {
            extra_quantizer_dict: config.extra_quantizer_dict.clone(),
            extra_fuse_dict,
            quant_dict: quant.clone(),
            chip,
        })?;
        let mut prepared = if chip.uses_transformer_path() {
            quantizer.prepare_swint(graph_module, &qconfig)?
        } else {
            quantizer.prepare(graph_module, &qconfig)?
        };

        preserved.restore(&mut prepared);
        Ok(prepared)
    }
}

/// Graph module name: last segment of the root type path.
fn root_name(model: &Module) -> String {
    model
        .kind()
        .rsplit('.')
        .next()
        .unwrap_or_else(|| model.kind())
        .to_string()
}
