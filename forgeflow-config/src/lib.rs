//! ABOUTME: Loads system and app configuration files from disk and merges them
//! ABOUTME: merge semantics themselves live in forgeflow_core::context::deep_merge

use forgeflow_core::context::deep_merge;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigLoadError>;

/// Loads a single TOML configuration file into a `serde_json::Value` tree.
/// A missing file is reported as `NotFound` rather than silently returning
/// an empty config, so a mistyped `--config` path fails loudly at startup.
pub fn load_config(path: &Path) -> Result<Value> {
    info!(path = %path.display(), "config.load.starting");

    if !path.exists() {
        error!(path = %path.display(), "config.load.file_not_found");
        return Err(ConfigLoadError::NotFound(path.display().to_string()));
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let toml_value: toml::Value = toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let value = toml_to_json(toml_value);
    info!(path = %path.display(), "config.load.success");
    Ok(value)
}

/// Loads a system config and an app config and deep-merges the app config
/// over the system config. Either path may be omitted; an omitted path
/// yields an empty config rather than an error, matching the behavior of
/// `load_with_app_config` when a caller only wants one layer.
pub fn load_with_app_config(system_path: Option<&Path>, app_path: Option<&Path>) -> Result<Value> {
    let system_config = match system_path {
        Some(p) => load_config(p)?,
        None => Value::Object(serde_json::Map::new()),
    };
    let app_config = match app_path {
        Some(p) => load_config(p)?,
        None => Value::Object(serde_json::Map::new()),
    };

    let merged = deep_merge(&system_config, &app_config);
    info!(
        system_keys = system_config.as_object().map(|m| m.len()).unwrap_or(0),
        app_keys = app_config.as_object().map(|m| m.len()).unwrap_or(0),
        "config.merge.complete"
    );
    Ok(merged)
}

/// Merges any number of additional override layers (e.g. `--system-configs`
/// on the CLI) onto an already-loaded base config, in order.
pub fn apply_overlays(base: Value, overlay_paths: &[impl AsRef<Path>]) -> Result<Value> {
    let mut result = base;
    for p in overlay_paths {
        let overlay = load_config(p.as_ref())?;
        result = deep_merge(&result, &overlay);
    }
    if overlay_paths.is_empty() {
        warn!("config.apply_overlays.no_overlays_provided");
    }
    Ok(result)
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn load_config_errors_on_missing_file() {
        let err = load_config(Path::new("/nonexistent/forgeflow.toml")).unwrap_err();
        assert!(matches!(err, ConfigLoadError::NotFound(_)));
    }

    #[test]
    fn load_config_parses_nested_tables() {
        let f = write_toml(
            r#"
            [project]
            path = "/tmp/p"

            [llm_config.agents.discovery]
            model = "claude-3-opus"
            "#,
        );
        let value = load_config(f.path()).unwrap();
        assert_eq!(
            value["llm_config"]["agents"]["discovery"]["model"],
            serde_json::json!("claude-3-opus")
        );
    }

    #[test]
    fn load_with_app_config_merges_app_over_system() {
        let system = write_toml(
            r#"
            [llm_config]
            default_model = "claude-3-opus"
            "#,
        );
        let app = write_toml(
            r#"
            [llm_config]
            default_model = "claude-3-sonnet"
            "#,
        );
        let merged = load_with_app_config(Some(system.path()), Some(app.path())).unwrap();
        assert_eq!(
            merged["llm_config"]["default_model"],
            serde_json::json!("claude-3-sonnet")
        );
    }

    #[test]
    fn apply_overlays_applies_in_order() {
        let base = serde_json::json!({"a": 1});
        let overlay1 = write_toml("a = 2\n");
        let overlay2 = write_toml("a = 3\n");
        let merged = apply_overlays(base, &[overlay1.path(), overlay2.path()]).unwrap();
        assert_eq!(merged["a"], serde_json::json!(3));
    }
}
