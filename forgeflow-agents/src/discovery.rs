//! ABOUTME: Discovery agent — scans a project tree into a file manifest
//! ABOUTME: the only pipeline agent that never calls the continuation engine
//!
//! Grounded on `c4h_agents/agents/discovery.py`: `process()` there bypasses
//! the LLM entirely and shells out to a companion `tartxt` script, then
//! parses its `== Manifest ==` / `== Content ==` stdout sections. Shelling
//! out to a Python helper script has no place in this workspace, so the
//! scan itself is a native recursive directory walk; the manifest text
//! format (and `_parse_manifest`'s section markers) are kept, since lineage
//! events and any downstream tooling depend on that shape, not on how the
//! scan was performed.

use async_trait::async_trait;
use chrono::Utc;
use forgeflow_core::{Agent, AgentResponse, Context};
use forgeflow_lineage::event::LlmInputRef;
use forgeflow_lineage::LineageTracker;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct DiscoveryAgent {
    lineage: LineageTracker,
}

impl DiscoveryAgent {
    pub fn new(config: &Value) -> Self {
        Self {
            lineage: LineageTracker::from_config("discovery", "discovery", config),
        }
    }

    fn tartxt_config(config: &Value) -> Value {
        config
            .pointer("/llm_config/agents/discovery/tartxt_config")
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    fn resolve_input_paths(project_root: &Path, tartxt_config: &Value) -> Vec<PathBuf> {
        let configured = tartxt_config
            .get("input_paths")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_else(|| vec!["./"]);

        configured
            .into_iter()
            .map(|p| {
                let path = Path::new(p);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    project_root.join(path)
                }
            })
            .collect()
    }

    fn exclusion_patterns(tartxt_config: &Value) -> Vec<String> {
        match tartxt_config.get("exclusions") {
            Some(Value::String(s)) => s.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Recursively walks `root`, returning every regular file's path
    /// relative to `project_root`, normalized to forward slashes, skipping
    /// any path that contains one of `exclusions` as a substring.
    fn scan_dir(root: &Path, project_root: &Path, exclusions: &[String], out: &mut Vec<String>) {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %root.display(), error = %err, "discovery.read_dir_failed");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let rel = path.strip_prefix(project_root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            if exclusions.iter().any(|pat| rel.contains(pat.as_str())) {
                continue;
            }
            if path.is_dir() {
                Self::scan_dir(&path, project_root, exclusions, out);
            } else if path.is_file() {
                out.push(rel);
            }
        }
    }

    fn build_manifest(files: &[String]) -> String {
        let mut manifest = String::from("== Manifest ==\n");
        for f in files {
            manifest.push_str(f);
            manifest.push('\n');
        }
        manifest.push_str("== Content ==\n");
        manifest
    }
}

#[async_trait]
impl Agent for DiscoveryAgent {
    fn agent_name(&self) -> &str {
        "discovery"
    }

    fn required_keys(&self) -> Vec<&str> {
        vec!["project_path"]
    }

    fn system_prompt(&self) -> String {
        String::new()
    }

    async fn process(&self, context: &Context) -> AgentResponse {
        let project_path = context
            .get_str("project_path")
            .or_else(|| context.get_str("project.path"))
            .map(str::to_string);

        let Some(project_path) = project_path else {
            return self.failure_with_lineage(context, "no project path provided").await;
        };

        let root = Path::new(&project_path);
        if !root.exists() {
            return self
                .failure_with_lineage(context, &format!("project path does not exist: {project_path}"))
                .await;
        }

        let config = context.get("config").cloned().unwrap_or(Value::Null);
        let tartxt_config = Self::tartxt_config(&config);
        let input_paths = Self::resolve_input_paths(root, &tartxt_config);
        let exclusions = Self::exclusion_patterns(&tartxt_config);

        debug!(project_path = %project_path, input_paths = ?input_paths, "discovery.scanning");

        let mut files = Vec::new();
        for input_path in &input_paths {
            Self::scan_dir(input_path, root, &exclusions, &mut files);
        }
        files.sort();

        let raw_output = Self::build_manifest(&files);
        let mut file_map: HashMap<String, bool> = HashMap::new();
        for f in &files {
            file_map.insert(f.clone(), true);
        }

        let mut data = HashMap::new();
        data.insert("files".to_string(), json!(file_map));
        data.insert("raw_output".to_string(), json!(raw_output));
        data.insert("project_path".to_string(), json!(project_path));
        data.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));

        self.lineage
            .track_llm_interaction(
                context.as_value(),
                LlmInputRef {
                    system: String::new(),
                    user: String::new(),
                    formatted_request: String::new(),
                },
                json!({"content": raw_output, "file_count": files.len()}),
                json!({"file_count": files.len()}),
                None,
            )
            .await;

        let mut response = AgentResponse::success(data, None);
        response.raw_output = Some(raw_output);
        response
    }
}

impl DiscoveryAgent {
    async fn failure_with_lineage(&self, context: &Context, error: &str) -> AgentResponse {
        self.lineage
            .track_llm_interaction(
                context.as_value(),
                LlmInputRef {
                    system: String::new(),
                    user: String::new(),
                    formatted_request: String::new(),
                },
                Value::Null,
                json!({}),
                Some(error.to_string()),
            )
            .await;
        AgentResponse::failure(error, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeflow_core::Context as Ctx;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fails_when_project_path_missing() {
        let agent = DiscoveryAgent::new(&json!({}));
        let response = agent.process(&Ctx::new()).await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn fails_when_project_path_does_not_exist() {
        let agent = DiscoveryAgent::new(&json!({}));
        let ctx = Ctx::from_value(json!({"project_path": "/nonexistent/path/xyz"}));
        let response = agent.process(&ctx).await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn scans_project_directory_into_a_manifest() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.rs"), "struct B;").unwrap();

        let agent = DiscoveryAgent::new(&json!({}));
        let ctx = Ctx::from_value(json!({"project_path": dir.path().to_str().unwrap()}));
        let response = agent.process(&ctx).await;

        assert!(response.success);
        let files = response.data.get("files").unwrap();
        assert!(files.get("a.rs").is_some());
        assert!(files.get("sub/b.rs").is_some());
    }

    #[tokio::test]
    async fn exclusion_patterns_filter_matching_paths() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("target")).unwrap();
        std::fs::write(dir.path().join("target/ignored.rs"), "").unwrap();
        std::fs::write(dir.path().join("kept.rs"), "").unwrap();

        let config = json!({"llm_config": {"agents": {"discovery": {"tartxt_config": {"exclusions": ["target"]}}}}});
        let agent = DiscoveryAgent::new(&config);
        let ctx = Ctx::from_value(json!({
            "project_path": dir.path().to_str().unwrap(),
            "config": config,
        }));
        let response = agent.process(&ctx).await;

        assert!(response.success);
        let files = response.data.get("files").unwrap();
        assert!(files.get("kept.rs").is_some());
        assert!(files.get("target/ignored.rs").is_none());
    }
}
