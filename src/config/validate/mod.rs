//! Configuration validation
//!
//! Validates preparation configs for structural correctness before resolution.

mod error;
mod validator;

#[cfg(test)]
mod proptests;
#[cfg(test)]
mod tests;

pub use error::ValidationError;
pub use validator::validate_config;
