//! ABOUTME: Project domain model: the path invariants every agent relies on
//! ABOUTME: paths are resolved once at workflow start and never recomputed downstream

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Standard project path layout, all derived from `project.path` plus a
/// set of optional `*_root` overrides. `workspace` and `output` are created
/// on disk at construction time; `source` and `config` are not, since they
/// are expected to already exist as part of the target project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub workspace: PathBuf,
    pub source: PathBuf,
    pub output: PathBuf,
    pub config: PathBuf,
}

impl ProjectPaths {
    pub fn from_config(config: &Value) -> Result<Self> {
        let project = config.get("project").cloned().unwrap_or(Value::Null);

        let raw_root = project
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InputValidation("no project path specified".to_string()))?;

        let mut root = PathBuf::from(raw_root);
        if !root.is_absolute() {
            let cwd = std::env::current_dir()
                .map_err(|e| Error::InputValidation(format!("cannot resolve cwd: {e}")))?;
            root = cwd.join(root);
        }

        let sub = |key: &str, default: &str| -> PathBuf {
            let rel = project
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default);
            root.join(rel)
        };

        let workspace = sub("workspace_root", "workspaces");
        let source = sub("source_root", ".");
        let output = sub("output_root", ".");
        let config_dir = sub("config_root", "config");

        std::fs::create_dir_all(&workspace)
            .map_err(|e| Error::InputValidation(format!("cannot create workspace dir: {e}")))?;
        std::fs::create_dir_all(&output)
            .map_err(|e| Error::InputValidation(format!("cannot create output dir: {e}")))?;

        Ok(Self {
            root,
            workspace,
            source,
            output,
            config: config_dir,
        })
    }
}

/// Free-form project metadata: name, description, version, and arbitrary
/// settings an agent may want to read through `Project`.
#[derive(Debug, Clone, Default)]
pub struct ProjectMetadata {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

/// Immutable project record: paths plus the full configuration the project
/// was constructed from. Agents reach into `config` for anything beyond the
/// standard paths.
#[derive(Debug, Clone)]
pub struct Project {
    pub paths: ProjectPaths,
    pub metadata: ProjectMetadata,
    pub config: Value,
}

impl Project {
    pub fn from_config(config: Value) -> Result<Self> {
        let paths = ProjectPaths::from_config(&config)?;
        let project_section = config.get("project").cloned().unwrap_or(Value::Null);
        let name = project_section
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                paths
                    .root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "project".to_string())
            });
        let metadata = ProjectMetadata {
            name,
            description: project_section
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            version: project_section
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        Ok(Self {
            paths,
            metadata,
            config,
        })
    }

    /// Resolves `path` relative to the project root, leaving absolute paths
    /// untouched.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.paths.root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn from_config_creates_workspace_and_output_dirs() {
        let dir = tempdir().unwrap();
        let config = json!({"project": {"path": dir.path().to_str().unwrap()}});
        let project = Project::from_config(config).unwrap();
        assert!(project.paths.workspace.exists());
        assert!(project.paths.output.exists());
    }

    #[test]
    fn missing_project_path_is_input_validation_error() {
        let err = Project::from_config(json!({})).unwrap_err();
        assert!(matches!(err, Error::InputValidation(_)));
    }

    #[test]
    fn resolve_path_leaves_absolute_paths_untouched() {
        let dir = tempdir().unwrap();
        let config = json!({"project": {"path": dir.path().to_str().unwrap()}});
        let project = Project::from_config(config).unwrap();
        let abs = PathBuf::from("/tmp/elsewhere");
        assert_eq!(project.resolve_path(&abs), abs);
    }
}
