//! Model preparation: from model and config to a quantizer-ready graph module

mod pipeline;
mod preserve;
mod quantizer;

pub use pipeline::{ModelMode, Preparer};
pub use preserve::PreservedAttrs;
pub use quantizer::{Quantizer, QuantizerArgs, QuantizerFactory, QuantizerRegistry};
