//! ABOUTME: Solution Designer — turns discovery's file manifest plus an
//! ABOUTME: intent description into a proposed solution via the continuation engine
//!
//! Grounded on `c4h_agents/agents/solution_designer.py`, which (unlike
//! discovery) uses the standard LLM flow unchanged and only overrides the
//! agent name and `_format_request`.

use crate::runtime::LlmAgentRuntime;
use async_trait::async_trait;
use forgeflow_core::{Agent, AgentResponse, Context};
use forgeflow_providers::ProviderManager;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_TEMPLATE: &str = "Source code:\n{source_code}\n\nIntent:\n{intent}";

pub struct SolutionDesignerAgent {
    config: Value,
    runtime: LlmAgentRuntime,
}

impl SolutionDesignerAgent {
    pub fn new(config: Value, providers: Arc<Mutex<ProviderManager>>) -> Self {
        let runtime = LlmAgentRuntime::new("solution_designer", &config, providers);
        Self { config, runtime }
    }

    fn prompt_template(&self) -> String {
        self.config
            .pointer("/llm_config/agents/solution_designer/prompts/solution")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TEMPLATE)
            .to_string()
    }
}

/// Reads `intent.description` and discovery's `raw_output`, accepting both
/// the nested `input_data.discovery_data` shape the Orchestrator builds for
/// a discovery→solution transition and a flat shape for direct invocation,
/// matching `_extract_context_data`'s dual lookup.
fn extract_context_data(context: &Context) -> Result<Value, String> {
    let intent = context
        .get_str("input_data.intent.description")
        .or_else(|| context.get_str("intent.description"))
        .ok_or("missing required key: intent.description")?;
    let raw_output = context
        .get_str("input_data.discovery_data.raw_output")
        .or_else(|| context.get_str("discovery_data.raw_output"))
        .ok_or("missing required key: discovery_data.raw_output")?;
    Ok(json!({"source_code": raw_output, "intent": intent}))
}

#[async_trait]
impl Agent for SolutionDesignerAgent {
    fn agent_name(&self) -> &str {
        "solution_designer"
    }

    fn required_keys(&self) -> Vec<&str> {
        vec!["input_data"]
    }

    fn system_prompt(&self) -> String {
        self.config
            .pointer("/llm_config/agents/solution_designer/prompts/system")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn format_request(&self, data: &Value) -> String {
        let source_code = data.get("source_code").and_then(Value::as_str).unwrap_or_default();
        let intent = data.get("intent").and_then(Value::as_str).unwrap_or_default();
        self.prompt_template()
            .replace("{source_code}", source_code)
            .replace("{intent}", intent)
    }

    async fn process(&self, context: &Context) -> AgentResponse {
        let data = match extract_context_data(context) {
            Ok(data) => data,
            Err(error) => return AgentResponse::failure(error, None),
        };
        let user_message = self.format_request(&data);
        self.runtime
            .run(&self.config, self.system_prompt(), user_message, data, context)
            .await
    }
}
