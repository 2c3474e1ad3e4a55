//! Load preparation configs from YAML or JSON files

use super::schema::PrepareConfig;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load and validate a preparation config
///
/// `.json` files are parsed as JSON, everything else as YAML.
///
/// # Example
///
/// ```no_run
/// use chipquant::config::load_config;
///
/// let config = load_config("prepare.yaml")?;
/// println!("target chip: {}", config.quant_dict.chip);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<PrepareConfig> {
    let path = config_path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: PrepareConfig = if is_json {
        serde_json::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    validate_config(&config)?;

    Ok(config)
}
