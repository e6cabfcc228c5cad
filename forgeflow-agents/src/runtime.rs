//! ABOUTME: Shared execution path for every LLM-backed agent: resolve
//! ABOUTME: provider/model, run the continuation engine, track lineage and metrics
//!
//! Grounded on `c4h_agents/agents/base_agent.py::_process`/`_process_response`
//! and `base_config.py`'s metrics/log-gating. Where the original wires this
//! behavior in through multiple inheritance, this is the "explicit
//! higher-order function" replacement spec.md's design notes call for: each
//! concrete agent builds its own system/user strings, then hands off to
//! `LlmAgentRuntime::run` for the part that is identical across agents.

use crate::config::{agent_config, provider_config, resolve_model, resolve_provider};
use chrono::Utc;
use forgeflow_core::{AgentInput, AgentResponse, Context, LogDetail};
use forgeflow_lineage::LineageTracker;
use forgeflow_providers::continuation::{get_completion_with_continuation, ContinuationConfig, Message};
use forgeflow_providers::ProviderManager;
use parking_lot::Mutex as SyncMutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Running counters kept on every LLM-backed agent, mirroring
/// `BaseAgent.metrics` in the original.
#[derive(Debug, Clone, Default)]
pub struct AgentMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_duration_ms: u64,
    pub continuation_attempts: u64,
    pub last_error: Option<String>,
}

impl AgentMetrics {
    fn record(&mut self, duration_ms: u64, continuation_attempts: u32, success: bool, error: Option<&str>) {
        self.total_requests += 1;
        self.total_duration_ms += duration_ms;
        self.continuation_attempts += continuation_attempts as u64;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
            self.last_error = error.map(str::to_string);
        }
    }

    pub fn as_value(&self) -> Value {
        json!({
            "total_requests": self.total_requests,
            "successful_requests": self.successful_requests,
            "failed_requests": self.failed_requests,
            "total_duration_ms": self.total_duration_ms,
            "continuation_attempts": self.continuation_attempts,
            "last_error": self.last_error,
        })
    }
}

/// The part of `process()` every LLM-backed concrete agent shares: config
/// resolution, transport acquisition, the continuation loop, response
/// normalization, lineage emission, and metrics bookkeeping.
pub struct LlmAgentRuntime {
    agent_name: String,
    providers: Arc<SyncMutex<ProviderManager>>,
    lineage: LineageTracker,
    log_detail: LogDetail,
    metrics: SyncMutex<AgentMetrics>,
}

impl LlmAgentRuntime {
    /// Builds a runtime for `agent_name`, reading its log level from
    /// `llm_config.agents.<name>.log_level` (falling back to
    /// `logging.agent_level`), matching `_should_log`'s own lookup order.
    pub fn new(agent_name: impl Into<String>, config: &Value, providers: Arc<SyncMutex<ProviderManager>>) -> Self {
        let agent_name = agent_name.into();
        let lineage = LineageTracker::from_config(agent_name.clone(), agent_name.clone(), config);

        let agent_cfg = agent_config(config, &agent_name);
        let log_level = agent_cfg
            .get("log_level")
            .and_then(Value::as_str)
            .or_else(|| config.pointer("/logging/agent_level").and_then(Value::as_str))
            .map(LogDetail::from_str_lossy)
            .unwrap_or(LogDetail::Basic);

        Self {
            agent_name,
            providers,
            lineage,
            log_detail: log_level,
            metrics: SyncMutex::new(AgentMetrics::default()),
        }
    }

    pub fn metrics_snapshot(&self) -> Value {
        self.metrics.lock().as_value()
    }

    fn should_log(&self, level: LogDetail) -> bool {
        self.log_detail >= level
    }

    /// Runs one full agent turn: resolves provider/model from `config`,
    /// acquires (or builds) a transport, drives the continuation engine
    /// with `system_prompt`/`user_message`, and returns a normalized
    /// `AgentResponse`. Emits exactly one lineage event regardless of
    /// outcome and never retries — retry policy is the Task Wrapper's job.
    pub async fn run(
        &self,
        config: &Value,
        system_prompt: String,
        user_message: String,
        raw_context: Value,
        lineage_context: &Context,
    ) -> AgentResponse {
        let start = Instant::now();
        let llm_input = AgentInput::new(system_prompt.clone(), user_message.clone(), raw_context);

        let agent_cfg = agent_config(config, &self.agent_name);

        let provider = match resolve_provider(&agent_cfg) {
            Ok(p) => p,
            Err(err) => return self.fail(llm_input, lineage_context, start, 0, err.to_string()).await,
        };
        let provider_cfg = provider_config(config, provider);
        let model = match resolve_model(None, &self.agent_name, config, &provider_cfg) {
            Ok(m) => m,
            Err(err) => return self.fail(llm_input, lineage_context, start, 0, err.to_string()).await,
        };

        let transport = {
            let mut providers = self.providers.lock();
            match providers.get_or_build(provider, &model, &provider_cfg) {
                Ok(t) => t,
                Err(err) => return self.fail(llm_input, lineage_context, start, 0, err.to_string()).await,
            }
        };

        let continuation_cfg = continuation_config_from(&agent_cfg);

        if self.should_log(LogDetail::Detailed) {
            debug!(agent = %self.agent_name, provider = %provider, model = %model, "agent.request_starting");
        }

        let messages = vec![Message::system(system_prompt.clone()), Message::user(user_message.clone())];
        let outcome = get_completion_with_continuation(transport.as_ref(), &messages, &continuation_cfg, None).await;

        match outcome {
            Ok(outcome) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                {
                    let mut metrics = self.metrics.lock();
                    metrics.record(duration_ms, outcome.continuation_attempts, true, None);
                }

                let mut data = HashMap::new();
                data.insert("response".to_string(), json!(outcome.content));
                data.insert("raw_output".to_string(), json!(outcome.content));
                data.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));

                let usage = outcome.raw_final.usage;
                let llm_output = json!({
                    "content": outcome.content,
                    "usage": {
                        "prompt_tokens": usage.prompt_tokens,
                        "completion_tokens": usage.completion_tokens,
                        "total_tokens": usage.total_tokens,
                    },
                });
                let metrics_value = json!({
                    "duration_ms": duration_ms,
                    "continuation_attempts": outcome.continuation_attempts,
                    "usage": llm_output["usage"].clone(),
                });

                self.lineage
                    .track_llm_interaction(
                        lineage_context.as_value(),
                        forgeflow_lineage::event::LlmInputRef {
                            system: system_prompt,
                            user: user_message,
                            formatted_request: llm_input.formatted_request.clone(),
                        },
                        llm_output,
                        metrics_value.clone(),
                        None,
                    )
                    .await;

                let mut response = AgentResponse::success(data, Some(llm_input));
                response.raw_output = Some(outcome.content);
                response.metrics = metrics_value
                    .as_object()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .collect();
                response
            }
            Err(err) => {
                let attempts = 0;
                self.fail(llm_input, lineage_context, start, attempts, err.to_string()).await
            }
        }
    }

    async fn fail(
        &self,
        llm_input: AgentInput,
        lineage_context: &Context,
        start: Instant,
        continuation_attempts: u32,
        error: String,
    ) -> AgentResponse {
        let duration_ms = start.elapsed().as_millis() as u64;
        {
            let mut metrics = self.metrics.lock();
            metrics.record(duration_ms, continuation_attempts, false, Some(&error));
        }
        warn!(agent = %self.agent_name, error = %error, "agent.request_failed");

        self.lineage
            .track_llm_interaction(
                lineage_context.as_value(),
                forgeflow_lineage::event::LlmInputRef {
                    system: llm_input.system_prompt.clone(),
                    user: llm_input.user_message.clone(),
                    formatted_request: llm_input.formatted_request.clone(),
                },
                Value::Null,
                json!({"duration_ms": duration_ms}),
                Some(error.clone()),
            )
            .await;

        AgentResponse::failure(error, Some(llm_input))
    }
}

fn continuation_config_from(agent_cfg: &Value) -> ContinuationConfig {
    let mut cfg = ContinuationConfig::default();
    if let Some(v) = agent_cfg.get("max_continuation_attempts").and_then(Value::as_u64) {
        cfg.max_continuation_attempts = v as u32;
    }
    if let Some(v) = agent_cfg.get("temperature").and_then(Value::as_f64) {
        cfg.temperature = v;
    }
    if let Some(v) = agent_cfg.get("max_tokens").and_then(Value::as_u64) {
        cfg.max_tokens = v as u32;
    }
    if let Some(v) = agent_cfg.get("extended_thinking_budget").and_then(Value::as_u64) {
        cfg.extended_thinking_budget = v as u32;
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn continuation_config_reads_overrides_from_agent_config() {
        let agent_cfg = json!({"max_continuation_attempts": 2, "temperature": 0.7, "max_tokens": 512});
        let cfg = continuation_config_from(&agent_cfg);
        assert_eq!(cfg.max_continuation_attempts, 2);
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.max_tokens, 512);
    }

    #[test]
    fn continuation_config_defaults_when_agent_config_is_empty() {
        let cfg = continuation_config_from(&json!({}));
        assert_eq!(cfg.max_continuation_attempts, ContinuationConfig::default().max_continuation_attempts);
    }

    #[test]
    fn metrics_record_tracks_success_and_failure_counts() {
        let mut metrics = AgentMetrics::default();
        metrics.record(10, 1, true, None);
        metrics.record(20, 0, false, Some("boom"));
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.last_error.as_deref(), Some("boom"));
    }
}
