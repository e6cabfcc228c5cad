//! ABOUTME: Entry point agents call after every LLM interaction to record lineage
//! ABOUTME: failures here are logged and swallowed, never propagated to the caller

use crate::backend::LineageBackend;
use crate::event::{
    append_execution_path, extract_lineage_metadata, serialize_llm_output, AgentRef, LineageEvent,
    LlmInputRef, WorkflowRef,
};
use crate::runid::extract_run_id;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Tracks lineage for a single agent instance, fanning each event out to
/// every configured backend independently — one backend's failure never
/// prevents another from receiving the event.
pub struct LineageTracker {
    agent_name: String,
    agent_type: String,
    backends: Vec<Arc<dyn LineageBackend>>,
    enabled: bool,
}

impl LineageTracker {
    pub fn new(
        agent_name: impl Into<String>,
        agent_type: impl Into<String>,
        backends: Vec<Arc<dyn LineageBackend>>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            agent_type: agent_type.into(),
            backends,
            enabled: true,
        }
    }

    /// Builds a tracker from a run's merged config, looking up lineage
    /// settings at `llm_config.agents.lineage` first and falling back to
    /// `runtime.lineage`, matching `BaseLineage.__init__`'s own lookup order.
    /// When lineage is disabled or no root directory is configured, the
    /// returned tracker is a no-op rather than an error.
    pub fn from_config(agent_name: impl Into<String>, agent_type: impl Into<String>, config: &Value) -> Self {
        let lineage_config = config
            .get("llm_config")
            .and_then(|v| v.get("agents"))
            .and_then(|v| v.get("lineage"))
            .or_else(|| config.get("runtime").and_then(|v| v.get("lineage")));

        let enabled = lineage_config
            .and_then(|c| c.get("enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let root = lineage_config
            .and_then(|c| c.get("root_dir"))
            .and_then(Value::as_str)
            .unwrap_or("workspaces/lineage")
            .to_string();

        let backends: Vec<Arc<dyn LineageBackend>> = if enabled {
            vec![Arc::new(crate::backend::FileLineageBackend::new(root))]
        } else {
            vec![Arc::new(crate::backend::NullLineageBackend)]
        };

        Self {
            agent_name: agent_name.into(),
            agent_type: agent_type.into(),
            backends,
            enabled,
        }
    }

    pub fn disabled(agent_name: impl Into<String>, agent_type: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            agent_type: agent_type.into(),
            backends: vec![Arc::new(crate::backend::NullLineageBackend)],
            enabled: false,
        }
    }

    /// Records one LLM interaction. `context` supplies the run id and
    /// execution-path ancestry; everything else describes the interaction
    /// itself. Never returns an error — a backend write failure is logged
    /// and the call otherwise completes normally.
    pub async fn track_llm_interaction(
        &self,
        context: &Value,
        llm_input: LlmInputRef,
        llm_output: Value,
        metrics: Value,
        error: Option<String>,
    ) {
        if !self.enabled {
            return;
        }

        let run_id = extract_run_id(context);
        let meta = extract_lineage_metadata(context, &run_id);
        let execution_path = append_execution_path(meta.execution_path, &self.agent_type, &meta.event_id);

        let event = LineageEvent {
            event_id: meta.event_id,
            timestamp: Utc::now(),
            agent: AgentRef {
                name: self.agent_name.clone(),
                kind: self.agent_type.clone(),
            },
            workflow: WorkflowRef {
                run_id,
                parent_id: meta.parent_id,
                step: meta.step,
                execution_path,
            },
            llm_input,
            llm_output: serialize_llm_output(&llm_output),
            metrics,
            error,
        };

        let mut successes = 0usize;
        for backend in &self.backends {
            match backend.write_event(&event).await {
                Ok(()) => successes += 1,
                Err(err) => warn!(
                    agent = %self.agent_name,
                    event_id = %event.event_id,
                    error = %err,
                    "lineage.write_event.failed"
                ),
            }
        }
        info!(
            agent = %self.agent_name,
            event_id = %event.event_id,
            backends_succeeded = successes,
            backends_total = self.backends.len(),
            "lineage.track_llm_interaction.complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn disabled_tracker_writes_nothing() {
        let tracker = LineageTracker::disabled("discovery", "discovery");
        tracker
            .track_llm_interaction(
                &json!({}),
                LlmInputRef {
                    system: String::new(),
                    user: "hi".into(),
                    formatted_request: "hi".into(),
                },
                json!({"content": "ok"}),
                json!({}),
                None,
            )
            .await;
    }

    #[tokio::test]
    async fn enabled_tracker_writes_an_event_file() {
        let dir = tempdir().unwrap();
        let config = json!({
            "llm_config": {"agents": {"lineage": {"enabled": true, "root_dir": dir.path().to_str().unwrap()}}}
        });
        let tracker = LineageTracker::from_config("solution_designer", "solution_designer", &config);
        let context = json!({"workflow_run_id": "run-abc"});
        tracker
            .track_llm_interaction(
                &context,
                LlmInputRef {
                    system: "sys".into(),
                    user: "hi".into(),
                    formatted_request: "hi".into(),
                },
                json!({"content": "ok"}),
                json!({"duration_ms": 12}),
                None,
            )
            .await;

        let today = Utc::now().format("%Y%m%d").to_string();
        let events_dir = dir.path().join(today).join("run-abc").join("events");
        assert!(events_dir.exists());
        let entries: Vec<_> = std::fs::read_dir(events_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
