//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trc_decoder::ReaderConfig;

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub convert: ConvertConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertConfig {
    /// Field delimiter of the CSV output
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Directory for CSV files (default: next to each trace)
    pub output_dir: Option<PathBuf>,
}

fn default_delimiter() -> char {
    ','
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            output_dir: None,
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    log::debug!("Configuration loaded: {:?}", config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trc_decoder::ErrorPolicy;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [reader]
            on_error = "skip"
            poll_interval_ms = 50

            [convert]
            delimiter = ";"
            output_dir = "csv"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.reader.on_error, ErrorPolicy::Skip);
        assert_eq!(config.reader.poll_interval(), Duration::from_millis(50));
        assert!(!config.reader.messages_only);
        assert_eq!(config.convert.delimiter, ';');
        assert_eq!(config.convert.output_dir, Some(PathBuf::from("csv")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.reader, ReaderConfig::default());
        assert_eq!(config.convert.delimiter, ',');
        assert!(config.convert.output_dir.is_none());
    }
}
