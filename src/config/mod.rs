//! Preparation config: schema, loading and structural validation

mod cli;
mod loader;
pub mod schema;
mod validate;

pub use cli::{parse_args, Cli, Command, OutputFormat, ResolveArgs, ValidateArgs};
pub use loader::load_config;
pub use schema::{
    ConcreteArgs, ExtraQConfig, LayerOverride, PrepareConfig, QuantDict, QuantMode, SchemeSpec,
    STRATEGY_CNN,
};
pub use validate::{validate_config, ValidationError};
