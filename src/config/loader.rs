//! Loading search configuration from YAML

use std::fs;
use std::path::Path;

use super::search::SearchConfig;
use super::validate::validate_config;
use crate::error::{Error, Result};

/// Load and validate a search configuration file
///
/// Missing fields take their defaults, so an empty file is a valid config.
///
/// # Example
///
/// ```no_run
/// use colloquy::config::load_config;
///
/// let config = load_config("search.yaml")?;
/// # Ok::<(), colloquy::Error>(())
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SearchConfig> {
    let yaml_content = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    parse_config(&yaml_content)
}

/// Parse and validate a search configuration from YAML text
pub fn parse_config(yaml: &str) -> Result<SearchConfig> {
    let config: SearchConfig = if yaml.trim().is_empty() {
        SearchConfig::default()
    } else {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?
    };
    validate_config(&config)?;
    Ok(config)
}
