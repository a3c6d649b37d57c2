//! Shared utilities for command handlers

use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use schemabridge_core::{load_models_from_path, ModelSet, SourceModel};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load a model document
pub fn load_models(path: &Path) -> Result<ModelSet> {
    let _timer = Timer::with_details("load_models", &path.display().to_string());
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let models = load_models_from_path(path)?;
    debug!(models = models.len(), enums = models.enums().len(), "Model document loaded");
    Ok(models)
}

/// Look up a model by name
pub fn find_model<'a>(models: &'a ModelSet, name: &str) -> Result<&'a Arc<SourceModel>> {
    models.get(name).ok_or_else(|| Error::ModelNotFound {
        name: name.to_string(),
        available: models.names().into_iter().map(str::to_string).collect(),
    })
}

/// Load a data file, as YAML for `.yaml`/`.yml` and JSON otherwise
pub fn load_data(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("yaml") || s.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        serde_yaml::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "YAML".to_string(),
        })
    } else {
        serde_json::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "JSON".to_string(),
        })
    }
}
