//! chipquant: chip-targeted fake-quantization preparation
//!
//! Resolves a sparse quantization request into a complete per-chip plan and
//! prepares a model graph for a chip quantizer.
//!
//! # Architecture
//!
//! - [`quant`]: schemes, algorithm registries, chip profiles, config resolution
//! - [`graph`]: model tree, graph IR, tracing, dedup and constant extraction
//! - [`prepare`]: end-to-end preparation and the quantizer interface
//! - [`config`]: YAML/JSON prepare configs and CLI arguments
//! - [`cli`]: command handlers for the `chipquant` binary
//!
//! # Example
//!
//! ```
//! use chipquant::config::{ExtraQConfig, QuantDict};
//! use chipquant::quant::Resolver;
//!
//! let quant = QuantDict {
//!     chip: "BM1688".to_string(),
//!     strategy: "Transformer".to_string(),
//!     quantmode: "weight_activation".to_string(),
//! };
//! let plan = Resolver::builtin().resolve(&quant, &ExtraQConfig::default()).unwrap();
//! assert!(plan.global.is_complete());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod prepare;
pub mod quant;

pub use error::{Error, Result};
