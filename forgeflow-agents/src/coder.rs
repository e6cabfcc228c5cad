//! ABOUTME: Coder — turns a proposed solution into a change-set, then hands
//! ABOUTME: the change-set to a `ChangeApplier` for the actual file writes
//!
//! Grounded on `c4h_agents/agents/coder.py`, which overrides `process()`
//! entirely and delegates to `SemanticIterator`/`SemanticMerge`/
//! `AssetManager` — all three named-interface-only per spec.md §1. This
//! implementation keeps Coder itself on the standard LLM continuation path
//! (since turning a solution design into concrete edits is an LLM
//! operation) and narrows the stubbed-out part to the one genuinely
//! external concern: writing the result to disk.

use crate::runtime::LlmAgentRuntime;
use async_trait::async_trait;
use forgeflow_core::{Agent, AgentResponse, Context};
use forgeflow_providers::ProviderManager;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

const DEFAULT_TEMPLATE: &str = "Solution design:\n{solution_design}\n\nIntent:\n{intent}";

/// Applies a generated change-set to the project on disk. The only
/// implementation shipped here is `StubChangeApplier`; a real one would
/// parse the model's diff/patch output and write files under
/// `Project::resolve_path`, honoring the same path invariants the
/// Orchestrator assumes (see DESIGN.md's open-question resolution on
/// asset-manager filesystem ops).
#[async_trait]
pub trait ChangeApplier: Send + Sync {
    async fn apply(&self, project_path: &str, changes: &str) -> Result<Value, String>;
}

pub struct StubChangeApplier;

#[async_trait]
impl ChangeApplier for StubChangeApplier {
    async fn apply(&self, _project_path: &str, _changes: &str) -> Result<Value, String> {
        Err("asset_manager is an external collaborator; no file-write implementation is bundled with this workspace".to_string())
    }
}

pub struct CoderAgent {
    config: Value,
    runtime: LlmAgentRuntime,
    change_applier: Arc<dyn ChangeApplier>,
}

impl CoderAgent {
    pub fn new(config: Value, providers: Arc<Mutex<ProviderManager>>, change_applier: Arc<dyn ChangeApplier>) -> Self {
        let runtime = LlmAgentRuntime::new("coder", &config, providers);
        Self { config, runtime, change_applier }
    }

    fn prompt_template(&self) -> String {
        self.config
            .pointer("/llm_config/agents/coder/prompts/coder")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TEMPLATE)
            .to_string()
    }
}

fn extract_context_data(context: &Context) -> Result<Value, String> {
    let solution_design = context
        .get_str("input_data.response")
        .or_else(|| context.get_str("response"))
        .ok_or("missing required key: input_data.response")?;
    let intent = context
        .get_str("input_data.intent.description")
        .or_else(|| context.get_str("intent.description"))
        .unwrap_or_default();
    Ok(json!({"solution_design": solution_design, "intent": intent}))
}

#[async_trait]
impl Agent for CoderAgent {
    fn agent_name(&self) -> &str {
        "coder"
    }

    fn required_keys(&self) -> Vec<&str> {
        vec!["input_data"]
    }

    fn system_prompt(&self) -> String {
        self.config
            .pointer("/llm_config/agents/coder/prompts/system")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn format_request(&self, data: &Value) -> String {
        let solution_design = data.get("solution_design").and_then(Value::as_str).unwrap_or_default();
        let intent = data.get("intent").and_then(Value::as_str).unwrap_or_default();
        self.prompt_template()
            .replace("{solution_design}", solution_design)
            .replace("{intent}", intent)
    }

    async fn process(&self, context: &Context) -> AgentResponse {
        let data = match extract_context_data(context) {
            Ok(data) => data,
            Err(error) => return AgentResponse::failure(error, None),
        };
        let user_message = self.format_request(&data);
        let mut response = self
            .runtime
            .run(&self.config, self.system_prompt(), user_message, data, context)
            .await;

        if response.success {
            let project_path = context.get_str("project_path").unwrap_or_default();
            let changes = response.raw_output.clone().unwrap_or_default();
            match self.change_applier.apply(project_path, &changes).await {
                Ok(result) => {
                    response.data.insert("asset_manager_result".to_string(), result);
                }
                Err(error) => {
                    warn!(error = %error, "coder.change_applier_unavailable");
                    response.data.insert("asset_manager_error".to_string(), json!(error));
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeflow_core::Context as Ctx;

    #[test]
    fn extract_context_data_requires_solution_response() {
        let ctx = Ctx::from_value(json!({}));
        assert!(extract_context_data(&ctx).is_err());
    }

    #[test]
    fn extract_context_data_reads_nested_shape() {
        let ctx = Ctx::from_value(json!({"input_data": {"response": "diff content", "intent": {"description": "x"}}}));
        let data = extract_context_data(&ctx).unwrap();
        assert_eq!(data["solution_design"], json!("diff content"));
    }

    #[tokio::test]
    async fn change_applier_failure_is_recorded_but_not_fatal() {
        let applier = Arc::new(StubChangeApplier);
        let result = applier.apply("/tmp/project", "diff").await;
        assert!(result.is_err());
    }
}
