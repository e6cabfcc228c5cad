//! ABOUTME: Assurance — runs the project's test suite, then asks the model
//! ABOUTME: to analyze the result against the original intent
//!
//! Grounded on `c4h_agents/agents/assurance.py`, which hardcodes its system
//! message (rather than reading it from config, like the other pipeline
//! agents do) and manages a subprocess `pytest` invocation. Running an
//! arbitrary project's test suite by shelling out to a fixed interpreter
//! has no general Rust equivalent, so test execution is a named interface
//! (`TestRunner`) with one stub implementation; the LLM analysis step is
//! real and follows the standard continuation path.

use crate::runtime::LlmAgentRuntime;
use async_trait::async_trait;
use forgeflow_core::{Agent, AgentResponse, Context};
use forgeflow_providers::ProviderManager;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are a test assurance agent. Analyze the provided test output \
against the original intent and report whether the change satisfies it, calling out any \
regressions or unmet requirements.";

/// Executes a project's test suite. `StubTestRunner` is the only
/// implementation shipped here; a real one would invoke the project's own
/// test command from `Project::paths` and capture stdout/stderr.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_tests(&self, project_path: &str) -> Result<String, String>;
}

pub struct StubTestRunner;

#[async_trait]
impl TestRunner for StubTestRunner {
    async fn run_tests(&self, _project_path: &str) -> Result<String, String> {
        Err("test execution is an external collaborator; no test runner is bundled with this workspace".to_string())
    }
}

pub struct AssuranceAgent {
    config: Value,
    runtime: LlmAgentRuntime,
    test_runner: Arc<dyn TestRunner>,
}

impl AssuranceAgent {
    pub fn new(config: Value, providers: Arc<Mutex<ProviderManager>>, test_runner: Arc<dyn TestRunner>) -> Self {
        let runtime = LlmAgentRuntime::new("assurance", &config, providers);
        Self { config, runtime, test_runner }
    }
}

fn extract_context_data(context: &Context, test_output: &str) -> Value {
    let intent = context
        .get_str("input_data.intent.description")
        .or_else(|| context.get_str("intent.description"))
        .unwrap_or_default();
    let coder_output = context
        .get_str("input_data.response")
        .or_else(|| context.get_str("response"))
        .unwrap_or_default();
    json!({"intent": intent, "coder_output": coder_output, "test_output": test_output})
}

#[async_trait]
impl Agent for AssuranceAgent {
    fn agent_name(&self) -> &str {
        "assurance"
    }

    fn required_keys(&self) -> Vec<&str> {
        vec!["input_data"]
    }

    fn system_prompt(&self) -> String {
        SYSTEM_PROMPT.to_string()
    }

    fn format_request(&self, data: &Value) -> String {
        format!(
            "Intent:\n{}\n\nCode changes:\n{}\n\nTest output:\n{}",
            data.get("intent").and_then(Value::as_str).unwrap_or_default(),
            data.get("coder_output").and_then(Value::as_str).unwrap_or_default(),
            data.get("test_output").and_then(Value::as_str).unwrap_or_default(),
        )
    }

    async fn process(&self, context: &Context) -> AgentResponse {
        let project_path = context.get_str("project_path").unwrap_or_default();
        let test_output = match self.test_runner.run_tests(project_path).await {
            Ok(output) => output,
            Err(error) => format!("(test runner unavailable: {error})"),
        };

        let data = extract_context_data(context, &test_output);
        let user_message = self.format_request(&data);
        self.runtime
            .run(&self.config, self.system_prompt(), user_message, data, context)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgeflow_core::Context as Ctx;

    #[test]
    fn format_request_includes_all_three_sections() {
        let providers = Arc::new(Mutex::new(ProviderManager::new()));
        let agent = AssuranceAgent::new(json!({}), providers, Arc::new(StubTestRunner));
        let data = json!({"intent": "rename", "coder_output": "diff", "test_output": "2 passed"});
        let request = agent.format_request(&data);
        assert!(request.contains("rename"));
        assert!(request.contains("diff"));
        assert!(request.contains("2 passed"));
    }

    #[tokio::test]
    async fn stub_test_runner_reports_unavailability() {
        let runner = StubTestRunner;
        let err = runner.run_tests("/tmp/p").await.unwrap_err();
        assert!(err.contains("external collaborator"));
    }

    #[test]
    fn system_prompt_is_hardcoded_not_config_driven() {
        let providers = Arc::new(Mutex::new(ProviderManager::new()));
        let agent = AssuranceAgent::new(
            json!({"llm_config": {"agents": {"assurance": {"prompts": {"system": "ignored"}}}}}),
            providers,
            Arc::new(StubTestRunner),
        );
        assert_eq!(agent.system_prompt(), SYSTEM_PROMPT);
        let _ = Ctx::new();
    }
}
