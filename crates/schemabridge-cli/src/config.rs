//! Configuration management for the CLI
//!
//! Configuration is loaded from the first file found among:
//! - the path given by `--config` or `SCHEMABRIDGE_CONFIG`
//! - `.schemabridge.yaml`, `.schemabridge.json` or `.schemabridge.toml` in the
//!   working directory
//! - `schemabridge/config.{yaml,json,toml}` in the user config directory
//!
//! A missing file yields the defaults. Logging keys are further overridden by
//! environment variables (see [`crate::logging`]).

use crate::error::{Error, Result};
use schemabridge_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_EXTENSIONS: [&str; 3] = ["yaml", "json", "toml"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Library settings applied to every schema the CLI compiles
    pub settings: Settings,

    /// Logging settings
    pub logging: LoggingSection,

    /// Output settings
    pub output: OutputSection,
}

/// Logging section of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level filter used when no verbosity flag is given
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

/// Output section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Use colored output when the terminal supports it
    pub color: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Load configuration from a file, choosing the parser by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let config = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(Error::config(format!(
                    "unsupported configuration file '{}': expected .yaml, .json or .toml",
                    path.display()
                )))
            }
        };
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable configuration"),
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Default configuration file paths, in search order
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = CONFIG_EXTENSIONS
            .iter()
            .map(|ext| PathBuf::from(format!(".schemabridge.{ext}")))
            .collect();

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("schemabridge");
            paths.extend(CONFIG_EXTENSIONS.iter().map(|ext| dir.join(format!("config.{ext}"))));
        }

        paths
    }
}
