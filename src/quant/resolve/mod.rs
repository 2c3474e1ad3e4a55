//! Quantization config resolution
//!
//! Turns a sparse request (chip, mode, strategy, optional overrides) into a
//! complete [`QConfigMapping`](super::QConfigMapping). Precedence, lowest to
//! highest:
//!
//! 1. chip profile defaults
//! 2. global algorithm / observer / scheme overrides
//! 3. `object_type` overrides (keyed separately from module names)
//! 4. `module_name` overrides
//! 5. bulk `int4_op`, `int8_op`, `f16_op` lists, in that order

mod overrides;
mod resolver;

#[cfg(test)]
mod proptests;

pub use overrides::BulkPrecision;
pub use resolver::Resolver;
