//! Validation error types
//!
//! Structural problems serde cannot catch: zero bit widths, empty names.
//! Semantic checks against chip tables and registries live in the resolver.

/// Validation error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Chip identifier is empty")]
    EmptyChip,

    #[error("Strategy is empty (e.g. CNN, Transformer)")]
    EmptyStrategy,

    #[error("Invalid {side} scheme bit width: {bit} (must be in 1..=32)")]
    InvalidSchemeBit { side: String, bit: u32 },

    #[error("Invalid bit width for override '{layer}': {bit} (must be in 1..=32)")]
    InvalidOverrideBit { layer: String, bit: u32 },

    #[error("Empty name in {0}")]
    EmptyName(String),

    #[error("Leaf module type names cannot be empty")]
    EmptyLeafModule,

    #[error("Preserved attribute list for '{0}' contains an empty name")]
    EmptyPreservedAttr(String),
}
