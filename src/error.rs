//! Error types with actionable diagnostics.
//!
//! Configuration and graph errors always abort preparation: a silently
//! defaulted quantization plan would ship the wrong numerics to the chip.
//! Shape propagation is the one best-effort stage and its error is only
//! logged by the pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ValidationError;

/// Result type alias for chipquant operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning a user request into a quantization plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Chip identifier is not in the chip table.
    #[error("Unsupported chip: '{chip}'\n  → Supported chips: {supported}")]
    UnsupportedChip { chip: String, supported: String },

    /// Observer name is not in the observer registry.
    #[error("Unknown observer: '{name}'\n  → Supported observers: {supported}")]
    UnknownObserver { name: String, supported: String },

    /// Fake-quantize name is not in the registry selected for the chip.
    #[error("Unknown fake quantize '{name}' for the {scope} registry\n  → Supported: {supported}")]
    UnknownFakeQuantize {
        name: String,
        scope: String,
        supported: String,
    },

    /// Scheme bit width is not allowed on the target chip.
    #[error("Unsupported {side} bit width {bit} on {chip}\n  → Allowed bit widths: {allowed:?}")]
    UnsupportedBitWidth {
        chip: String,
        side: String,
        bit: u32,
        allowed: Vec<u32>,
    },

    /// Layer override mode is neither `activation` nor `weight`.
    #[error("Invalid mode '{mode}' for override '{layer}'\n  → Mode must be \"activation\" or \"weight\"")]
    InvalidMode { layer: String, mode: String },

    /// Quantization mode string is not recognised.
    #[error("Invalid quantmode '{0}'\n  → Use weight_activation or weight_only")]
    InvalidQuantMode(String),

    /// Mode and strategy cannot be combined.
    #[error("Unsupported combination: quantmode={mode} with strategy={strategy}\n  → Fake-quantizing only weights is not supported for CNN models")]
    InvalidCombination { mode: String, strategy: String },

    /// The same constructor parameter came from both the scheme and the fake-quantize params.
    #[error("Parameter '{key}' is set twice for {side} fake quantize\n  → Remove it from {side_prefix}_fakeq_params or from the scheme extras")]
    DuplicateParam {
        key: String,
        side: String,
        side_prefix: String,
    },
}

impl ConfigError {
    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedChip { .. } => "Q001",
            Self::UnknownObserver { .. } => "Q002",
            Self::UnknownFakeQuantize { .. } => "Q003",
            Self::UnsupportedBitWidth { .. } => "Q004",
            Self::InvalidMode { .. } => "Q005",
            Self::InvalidQuantMode(_) => "Q006",
            Self::InvalidCombination { .. } => "Q007",
            Self::DuplicateParam { .. } => "Q008",
        }
    }
}

/// Structural errors in a graph or in the model it was traced from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A dotted attribute path has a segment that does not exist.
    #[error("Attribute path '{path}' cannot be resolved: no attribute '{segment}'")]
    AttributePath { path: String, segment: String },

    /// A dotted attribute path resolves to something other than a tensor.
    #[error("Attribute path '{path}' does not name a tensor (found {found})")]
    NotATensor { path: String, found: String },

    /// A node targets something missing from the module or constant table.
    #[error("Node '{node}' targets '{target}' which is not in the module table")]
    DanglingTarget { node: String, target: String },

    /// A node argument references a node that is not defined before it.
    #[error("Node '{node}' uses '{argument}' before it is defined")]
    UnknownArgument { node: String, argument: String },

    /// Two nodes share a name.
    #[error("Duplicate node name '{0}'")]
    DuplicateNodeName(String),

    /// The graph has no output node.
    #[error("Graph has no output node")]
    MissingOutput,

    /// The output node is not the last node, or there are several.
    #[error("Output node '{0}' must be the single, final node of the graph")]
    OutputNotLast(String),
}

/// Errors raised by a symbolic tracer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraceError {
    /// A forward step calls a child the module does not have.
    #[error("Module '{module}' has no child '{child}'")]
    MissingChild { module: String, child: String },

    /// A non-leaf module has no forward program to trace through.
    #[error("Module '{0}' is not a leaf and has no forward program")]
    MissingForward(String),

    /// A forward operand refers to an unknown input or step.
    #[error("Module '{module}' references unknown operand {operand}")]
    BadOperand { module: String, operand: String },

    /// A child is called with the wrong number of arguments.
    #[error("Module '{module}' expects {expected} inputs, got {actual}")]
    Arity {
        module: String,
        expected: usize,
        actual: usize,
    },
}

/// Best-effort shape propagation failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Shape propagation failed: {0}")]
pub struct ShapePropagationError(pub String);

/// Errors raised by a chip quantizer.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Quantizer for {chip} failed: {message}")]
pub struct QuantizerError {
    pub chip: String,
    pub message: String,
}

/// Top-level error for chipquant operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Trace failed: {0}")]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Quantizer(#[from] QuantizerError),

    /// No quantizer factory is registered for the chip.
    #[error("No quantizer registered for chip {0}\n  → Register a factory with QuantizerRegistry::register")]
    QuantizerNotRegistered(String),

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file has invalid syntax.
    #[error("Invalid configuration syntax in {path}:\n  {message}\n  → Check YAML/JSON syntax at the indicated line")]
    Parse { path: PathBuf, message: String },
}

impl Error {
    /// Create an IO error with the offending path.
    pub fn io(context: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if this error is caused by user input rather than a collaborator.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Validation(_) | Self::Parse { .. } | Self::Io { .. }
        )
    }
}
