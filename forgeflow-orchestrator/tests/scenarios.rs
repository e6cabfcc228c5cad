//! ABOUTME: Integration tests covering the concrete scenarios named in the
//! ABOUTME: orchestration design's testable-properties section
//!
//! Scenario numbering matches spec.md §8: scenario 1 (minimal workflow),
//! scenario 4 (routing by condition), scenario 5 (replay from a discovery
//! event), scenario 6 (max-teams trip). Scenarios 2/3 (length-limited
//! continuation, rate-limit backoff) are covered by
//! `forgeflow-providers`'s own test suite, since they exercise the
//! continuation engine directly with no orchestration involved.

use async_trait::async_trait;
use forgeflow_core::{Context, LlmProvider, Usage};
use forgeflow_orchestrator::{run_workflow_from_lineage_with, Orchestrator, DEFAULT_MAX_TEAMS};
use forgeflow_providers::{CompletionRequest, CompletionResponse, FinishReason, LlmTransport, ProviderCapabilities, ProviderManager};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

struct FixedTransport {
    content: String,
    capabilities: ProviderCapabilities,
}

impl FixedTransport {
    fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            capabilities: ProviderCapabilities {
                supports_streaming: false,
                supports_multimodal: false,
                max_context_tokens: Some(100_000),
                max_output_tokens: Some(4_096),
                available_models: vec!["test-model".to_string()],
                custom_features: Default::default(),
            },
        }
    }
}

#[async_trait]
impl LlmTransport for FixedTransport {
    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, _request: &CompletionRequest) -> forgeflow_core::Result<CompletionResponse> {
        Ok(CompletionResponse {
            content: self.content.clone(),
            finish_reason: FinishReason::Stop,
            usage: Usage { prompt_tokens: 10, completion_tokens: 10, total_tokens: 20 },
        })
    }
}

fn providers_with_fixed_response(content: &str) -> Arc<Mutex<ProviderManager>> {
    let mut manager = ProviderManager::new();
    manager.register(LlmProvider::Anthropic, "test-model", Arc::new(FixedTransport::new(content)));
    Arc::new(Mutex::new(manager))
}

fn scaffold_project(dir: &std::path::Path) {
    std::fs::write(dir.join("lib.rs"), "fn main() {}\n").unwrap();
}

#[tokio::test]
async fn scenario_1_minimal_workflow_runs_discovery_solution_coder_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path());

    let config = json!({
        "llm_config": {"default_model": "test-model"},
    });
    let providers = providers_with_fixed_response("solution design: rename Foo to Bar");

    let (prepared_config, context) = Orchestrator::initialize_workflow(
        dir.path().to_str().unwrap(),
        json!({"description": "rename Foo to Bar"}),
        config,
    )
    .unwrap();

    let mut orchestrator = Orchestrator::with_providers(prepared_config, providers).unwrap();
    let result = orchestrator.execute_workflow("discovery", context, DEFAULT_MAX_TEAMS).await;

    assert_eq!(result.status, "success");
    assert_eq!(result.execution_path, vec!["discovery".to_string(), "solution".to_string(), "coder".to_string()]);
    assert_eq!(result.teams_executed, 3);
}

#[tokio::test]
async fn scenario_4_routing_by_condition_sends_failed_team_down_the_failure_branch() {
    let dir = tempfile::tempdir().unwrap();
    // No project path set: discovery's required `project_path` key will be
    // present but point at a directory that doesn't exist, so the task fails.
    let missing = dir.path().join("does-not-exist");

    let config = json!({
        "project": {"path": missing.to_str().unwrap()},
        "orchestration": {
            "teams": {
                "discovery": {
                    "name": "Discovery",
                    "tasks": [{"agent_type": "discovery", "task_name": "discovery", "max_retries": 1, "retry_delay_seconds": 0}],
                    "stop_on_failure": false,
                    "routing": {
                        "rules": [{"condition": "any_failure", "next_team": "recovery"}],
                        "default": "solution"
                    }
                },
                "recovery": {
                    "name": "Recovery",
                    "tasks": [],
                    "routing": {}
                }
            }
        }
    });

    let mut orchestrator = Orchestrator::new(config).unwrap();
    let context = Context::from_value(json!({"project_path": missing.to_str().unwrap()}));
    let result = orchestrator.execute_workflow("discovery", context, DEFAULT_MAX_TEAMS).await;

    assert_eq!(result.execution_path, vec!["discovery".to_string(), "recovery".to_string()]);
}

#[tokio::test]
async fn scenario_5_replay_from_discovery_event_resumes_at_solution_with_fresh_run_id() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path());

    let event = json!({
        "event_id": "evt-discovery-1",
        "timestamp": "2026-01-01T00:00:00Z",
        "agent": {"name": "discovery", "type": "discovery"},
        "workflow": {"run_id": "wf_0000_original", "execution_path": ["discovery:evt-discovery-1"]},
        "llm_input": {"system": "", "user": "", "formatted_request": ""},
        "llm_output": "== Manifest ==\nlib.rs\n== Content ==\n",
        "metrics": {},
    });
    let event_path = dir.path().join("discovery_event.json");
    std::fs::write(&event_path, serde_json::to_string(&event).unwrap()).unwrap();

    let config = json!({
        "project": {"path": dir.path().to_str().unwrap()},
        "llm_config": {"default_model": "test-model"},
        "intent": {"description": "rename Foo to Bar"},
        "orchestration": {
            "teams": {
                "solution": {
                    "name": "Solution",
                    "tasks": [{"agent_type": "solution_designer", "task_name": "solution_designer"}],
                    "routing": {}
                }
            }
        }
    });
    let providers = providers_with_fixed_response("solution design text");

    let mut orchestrator = Orchestrator::with_providers(config.clone(), providers).unwrap();
    let result = run_workflow_from_lineage_with(&mut orchestrator, &event_path, "solution_designer", config, false)
        .await
        .unwrap();

    assert_eq!(result.execution_path, vec!["solution".to_string()]);
    assert_ne!(result.workflow_run_id, "wf_0000_original");
    assert_eq!(result.status, "success");
}

#[tokio::test]
async fn scenario_6_cyclic_routing_trips_max_teams_with_exact_count() {
    let dir = tempfile::tempdir().unwrap();
    scaffold_project(dir.path());

    let config = json!({
        "project": {"path": dir.path().to_str().unwrap()},
        "orchestration": {
            "teams": {
                "a": {
                    "name": "A",
                    "tasks": [{"agent_type": "discovery", "task_name": "a"}],
                    "routing": {"default": "b"}
                },
                "b": {
                    "name": "B",
                    "tasks": [{"agent_type": "discovery", "task_name": "b"}],
                    "routing": {"default": "a"}
                }
            }
        }
    });

    let mut orchestrator = Orchestrator::new(config).unwrap();
    let context = Context::from_value(json!({"project_path": dir.path().to_str().unwrap()}));
    let result = orchestrator.execute_workflow("a", context, 4).await;

    assert_eq!(result.status, "error");
    assert_eq!(result.teams_executed, 4);
    assert!(result.error.unwrap().contains("exceeded maximum team limit"));
}
