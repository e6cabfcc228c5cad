//! ABOUTME: Task Wrapper — retry loop, no-op approval gate, AgentResponse → TaskResult
//!
//! Grounded on `c4h_services/src/intent/impl/prefect/tasks.py::run_agent_task`.
//! Retry uses a fixed delay between attempts (not the continuation engine's
//! exponential backoff) — `retry_delay_seconds` is slept verbatim between
//! attempts, matching the original.

use forgeflow_core::{Agent, AgentResponse, AgentTaskConfig, Context};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Normalized result of one task invocation, mirroring the original's
/// `StageData`-wrapped return shape.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub success: bool,
    pub result_data: Value,
    pub stage_data: Value,
    pub error: Option<String>,
}

fn to_stage_data(response: &AgentResponse) -> Value {
    json!({
        "status": if response.success { "success" } else { "error" },
        "raw_output": response.raw_output,
        "files": response.data.get("files"),
        "timestamp": response.timestamp.to_rfc3339(),
        "error": response.error,
        "metrics": response.metrics,
    })
}

fn to_task_result(response: AgentResponse) -> TaskResult {
    let stage_data = to_stage_data(&response);
    TaskResult {
        success: response.success,
        result_data: json!(response.data),
        stage_data,
        error: response.error,
    }
}

/// Runs `agent` against `context`, retrying up to `task_config.max_retries`
/// times with a fixed `retry_delay_seconds` pause between attempts on
/// failure. The approval gate is a no-op: `requires_approval` is only
/// logged, reserved for a future human-in-the-loop checkpoint.
pub async fn run_agent_task(agent: &dyn Agent, task_config: &AgentTaskConfig, context: &Context) -> TaskResult {
    if task_config.requires_approval {
        info!(agent = agent.agent_name(), "task.approval_gate_noop");
    }

    let max_attempts = task_config.max_retries.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let response = agent.process(context).await;

        if response.success || attempt >= max_attempts {
            if !response.success {
                warn!(agent = agent.agent_name(), attempt, "task.giving_up_after_retries");
            }
            return to_task_result(response);
        }

        warn!(
            agent = agent.agent_name(),
            attempt,
            max_attempts,
            error = response.error.as_deref().unwrap_or("unknown"),
            "task.retrying_after_failure"
        );
        sleep(Duration::from_secs(task_config.retry_delay_seconds)).await;
    }
}

#[cfg(not(test))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
async fn sleep(_duration: Duration) {
    // Tests exercise the retry loop's attempt count only; no benefit in
    // actually waiting out `retry_delay_seconds`.
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forgeflow_core::AgentKind;
    use std::sync::Mutex;

    struct FlakyAgent {
        failures_before_success: u32,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Agent for FlakyAgent {
        fn agent_name(&self) -> &str {
            "flaky"
        }

        fn system_prompt(&self) -> String {
            String::new()
        }

        async fn process(&self, _context: &Context) -> AgentResponse {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures_before_success {
                AgentResponse::failure("transient failure", None)
            } else {
                AgentResponse::success(Default::default(), None)
            }
        }
    }

    fn task_config(max_retries: u32) -> AgentTaskConfig {
        AgentTaskConfig {
            agent_kind: AgentKind::Coder,
            config: json!({}),
            task_name: None,
            requires_approval: false,
            max_retries,
            retry_delay_seconds: 0,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_without_retrying() {
        let agent = FlakyAgent { failures_before_success: 0, calls: Mutex::new(0) };
        let result = run_agent_task(&agent, &task_config(3), &Context::new()).await;
        assert!(result.success);
        assert_eq!(*agent.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn retries_up_to_max_retries_then_succeeds() {
        let agent = FlakyAgent { failures_before_success: 2, calls: Mutex::new(0) };
        let result = run_agent_task(&agent, &task_config(5), &Context::new()).await;
        assert!(result.success);
        assert_eq!(*agent.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries_exhausted() {
        let agent = FlakyAgent { failures_before_success: 10, calls: Mutex::new(0) };
        let result = run_agent_task(&agent, &task_config(2), &Context::new()).await;
        assert!(!result.success);
        assert_eq!(*agent.calls.lock().unwrap(), 2);
    }
}
