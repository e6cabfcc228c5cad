//! ABOUTME: Lineage Replay — re-enters the workflow at a given stage using a
//! ABOUTME: previously recorded lineage event as that stage's input
//!
//! Grounded on `c4h_agents/agents/lineage_context.py` (context-shape
//! rebuilding per target stage) and `c4h_services/src/utils/lineage_utils.py`
//! (event file loading). The three stage-keyed `input_data` shapes below are
//! unchanged from those sources.

use crate::orchestrator::{Orchestrator, WorkflowResult, DEFAULT_MAX_TEAMS};
use forgeflow_core::{Context, Error, Result};
use forgeflow_lineage::LineageEvent;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Maps a stage name (as it appears in a lineage event's target or as passed
/// by a caller, e.g. `solution_designer`) to the team id this workspace uses
/// to key its team graph (`solution`). Stages with no special-cased team id
/// pass through unchanged, matching teams named after their agent kind
/// (`discovery`, `coder`).
pub fn team_id_for_stage(stage: &str) -> &str {
    match stage {
        "solution_designer" => "solution",
        other => other,
    }
}

/// Rebuilds the `input_data` a workflow re-entering at `stage` needs, from a
/// previously recorded event. `response` is always the event's verbatim
/// `llm_output` per the replay contract; `raw_output` mirrors it since the
/// source event carries no separately extracted raw form at replay time.
fn build_input_data(event: &LineageEvent, stage: &str) -> Value {
    match stage {
        "solution_designer" => json!({
            "discovery_data": {
                "response": event.llm_output,
                "raw_output": event.llm_output,
            },
            "intent": Value::Null,
        }),
        "coder" => json!({
            "response": event.llm_output,
            "raw_output": event.llm_output,
        }),
        _ => json!({
            "response": event.llm_output,
            "raw_output": event.llm_output,
            "intent": Value::Null,
        }),
    }
}

/// Loads `event_file`, rebuilds the context a fresh entry at `stage` would
/// have produced, builds an `Orchestrator` from `config`, and resumes the
/// workflow there.
///
/// `keep_runid`: when true, continues under the event's original
/// `workflow.run_id`; when false (the default a caller should generally
/// prefer), a fresh run id is generated so the replayed run doesn't collide
/// with lineage already recorded for the original.
pub async fn run_workflow_from_lineage(
    event_file: &Path,
    stage: &str,
    config: Value,
    keep_runid: bool,
) -> Result<WorkflowResult> {
    let mut orchestrator = Orchestrator::new(config.clone())?;
    run_workflow_from_lineage_with(&mut orchestrator, event_file, stage, config, keep_runid).await
}

/// Same as [`run_workflow_from_lineage`] but runs against an
/// already-constructed `Orchestrator` — lets a caller share a
/// `ProviderManager` (and its cached transports) across several replays, or
/// inject a fake transport in tests, instead of building a fresh one per
/// call.
pub async fn run_workflow_from_lineage_with(
    orchestrator: &mut Orchestrator,
    event_file: &Path,
    stage: &str,
    config: Value,
    keep_runid: bool,
) -> Result<WorkflowResult> {
    let raw = std::fs::read_to_string(event_file)
        .map_err(|e| Error::InputValidation(format!("cannot read lineage event file {}: {e}", event_file.display())))?;
    let event: LineageEvent = serde_json::from_str(&raw)
        .map_err(|e| Error::InputValidation(format!("cannot parse lineage event file {}: {e}", event_file.display())))?;

    let run_id = if keep_runid {
        event.workflow.run_id.clone()
    } else {
        format!("wf_{}_{}", chrono::Utc::now().format("%H%M"), Uuid::new_v4())
    };

    let project_path = config
        .pointer("/project/path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let intent = config.get("intent").cloned().unwrap_or(Value::Null);

    let mut input_data = build_input_data(&event, stage);
    if let Some(map) = input_data.as_object_mut() {
        if map.get("intent").map(Value::is_null).unwrap_or(false) {
            map.insert("intent".to_string(), intent);
        }
    }

    let mut context = Context::new();
    context.set("workflow_run_id", json!(run_id));
    context.set("system.runid", json!(run_id));
    context.set("project_path", json!(project_path.clone()));
    context.set("project.path", json!(project_path));
    context.set("config", config);
    context.set("input_data", input_data);

    let entry_team = team_id_for_stage(stage).to_string();
    info!(stage = %stage, entry_team = %entry_team, run_id = %run_id, "replay.resuming_workflow");

    Ok(orchestrator.execute_workflow(&entry_team, context, DEFAULT_MAX_TEAMS).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgeflow_lineage::{AgentRef, LlmInputRef, WorkflowRef};

    fn sample_event(llm_output: Value) -> LineageEvent {
        LineageEvent {
            event_id: "evt-1".to_string(),
            timestamp: Utc::now(),
            agent: AgentRef { name: "discovery".to_string(), kind: "discovery".to_string() },
            workflow: WorkflowRef {
                run_id: "wf_0000_original".to_string(),
                parent_id: None,
                step: Some(1),
                execution_path: vec!["discovery:evt-1".to_string()],
            },
            llm_input: LlmInputRef { system: String::new(), user: String::new(), formatted_request: String::new() },
            llm_output,
            metrics: json!({}),
            error: None,
        }
    }

    #[test]
    fn team_id_for_stage_maps_solution_designer_to_solution_team() {
        assert_eq!(team_id_for_stage("solution_designer"), "solution");
        assert_eq!(team_id_for_stage("coder"), "coder");
        assert_eq!(team_id_for_stage("discovery"), "discovery");
    }

    #[test]
    fn build_input_data_for_solution_designer_nests_discovery_data_and_mirrors_llm_output() {
        let event = sample_event(json!({"files": ["a.rs", "b.rs"]}));
        let input_data = build_input_data(&event, "solution_designer");
        assert_eq!(input_data["discovery_data"]["response"], event.llm_output);
        assert_eq!(input_data["discovery_data"]["raw_output"], event.llm_output);
    }

    #[test]
    fn build_input_data_for_coder_is_flat() {
        let event = sample_event(json!("diff content"));
        let input_data = build_input_data(&event, "coder");
        assert_eq!(input_data["response"], json!("diff content"));
        assert_eq!(input_data["raw_output"], json!("diff content"));
        assert!(input_data.get("discovery_data").is_none());
    }

    #[test]
    fn build_input_data_for_other_stages_includes_intent_placeholder() {
        let event = sample_event(json!("solution design text"));
        let input_data = build_input_data(&event, "assurance");
        assert_eq!(input_data["response"], json!("solution design text"));
        assert_eq!(input_data["intent"], Value::Null);
    }

    #[tokio::test]
    async fn run_workflow_from_lineage_resumes_at_mapped_team_with_fresh_run_id() {
        use crate::orchestrator::Orchestrator;

        let dir = tempfile::tempdir().unwrap();
        let event = sample_event(json!({"files": {"a.rs": true}}));
        let event_path = dir.path().join("event.json");
        std::fs::write(&event_path, serde_json::to_string(&event).unwrap()).unwrap();

        let config = json!({
            "project": {"path": dir.path().to_str().unwrap()},
            "orchestration": {
                "teams": {
                    "solution": {
                        "name": "Solution",
                        "tasks": [{"agent_type": "discovery", "task_name": "solution"}],
                        "routing": {}
                    }
                }
            }
        });

        let mut orchestrator = Orchestrator::new(config.clone()).unwrap();
        let result = run_workflow_from_lineage_with(&mut orchestrator, &event_path, "solution_designer", config, false)
            .await
            .unwrap();

        assert_eq!(result.execution_path, vec!["solution".to_string()]);
        assert_ne!(result.workflow_run_id, "wf_0000_original");
    }
}
