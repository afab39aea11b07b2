//! Loading training specs from YAML

use super::schema::TrainSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Parse and validate a training spec from a YAML string
pub fn parse_config(yaml: &str) -> Result<TrainSpec> {
    let spec: TrainSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

/// Load training spec from YAML file
///
/// # Example
///
/// ```no_run
/// use gradiente::config::{build_trainer, load_config};
///
/// let spec = load_config("train.yaml")?;
/// let trainer = build_trainer(&spec)?;
/// # Ok::<(), gradiente::Error>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<TrainSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    tracing::debug!(path = %config_path.as_ref().display(), "loaded config");
    Ok(spec)
}
