//! ABOUTME: The continuation loop itself — sends messages, detects length
//! ABOUTME: truncation, drives the join ladder, and retries on transient errors
//!
//! Grounded on `c4h_agents/agents/base_llm_continuation.py::get_completion_with_continuation`
//! in full; this module is the orchestration glue around `content_type`,
//! `overlap`, `join`, `backoff`, `repair`, and `transport`.

use crate::backoff::{initial_rate_limit_backoff, overload_delay, rate_limit_delay, MAX_RETRIES};
use crate::content_type::{detect_content_type, ContentType};
use crate::diagnostics::ContinuationDiagnostics;
use crate::join::{join_with_overlap, SpliceCompletion};
use crate::overlap::{create_continuation_prompt, last_n_lines, overlap_line_count};
use crate::repair::repair_artifacts;
use crate::transport::{CompletionRequest, CompletionResponse, FinishReason, LlmTransport};
use forgeflow_core::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Request-construction knobs that don't belong on `CompletionRequest` itself
/// (which models the wire-level shape sent to the transport). `max_tokens`
/// plus `extended_thinking_budget` exceeding `streaming_threshold` is the
/// source's rule for preferring a streaming transport; `RigTransport` has no
/// streaming backend, so this system only logs the recommendation rather
/// than switching transports — see DESIGN.md's open-question resolution.
#[derive(Debug, Clone)]
pub struct ContinuationConfig {
    pub max_continuation_attempts: u32,
    pub temperature: f64,
    pub max_tokens: u32,
    pub extended_thinking_budget: u32,
    pub streaming_threshold: u32,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            max_continuation_attempts: 5,
            temperature: 0.0,
            max_tokens: 4096,
            extended_thinking_budget: 0,
            streaming_threshold: 1_000_000,
        }
    }
}

impl ContinuationConfig {
    pub fn wants_streaming(&self) -> bool {
        (self.max_tokens as u64 + self.extended_thinking_budget as u64) > self.streaming_threshold as u64
    }
}

pub struct ContinuationOutcome {
    pub content: String,
    pub raw_final: CompletionResponse,
    pub continuation_attempts: u32,
    pub diagnostics: ContinuationDiagnostics,
}

enum Transient {
    RateLimit,
    Overload,
    Permanent,
}

/// Classifies a transport error's displayed message into the two retryable
/// categories spec.md §4.C names, or `Permanent` (propagate immediately).
/// `rig`'s errors don't expose a typed status code at this layer, so this
/// mirrors the original's `litellm` exception-class dispatch by inspecting
/// substrings in the error text instead.
fn classify_transient(message: &str) -> Transient {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("ratelimit") {
        Transient::RateLimit
    } else if lower.contains("500")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("overload")
        || lower.contains("internal server error")
        || lower.contains("service unavailable")
    {
        Transient::Overload
    } else {
        Transient::Permanent
    }
}

fn build_request(messages: &[Message], cfg: &ContinuationConfig) -> CompletionRequest {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let user = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| match m.role {
            Role::User => m.content.clone(),
            Role::Assistant => format!("[assistant]\n{}", m.content),
            Role::System => unreachable!(),
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    CompletionRequest {
        system,
        user,
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
    }
}

/// Lightweight post-join sanity check: balanced brackets, and for JSON
/// content a best-effort parse of the largest prefix ending at the last
/// `}`. Mismatches are logged, never turned into a hard failure — per
/// spec.md §4.C, "warn (do not fail) on mismatches."
fn validate_content(content_type: ContentType, content: &str) {
    let mut stack = Vec::new();
    let mut balanced = true;
    for ch in content.chars() {
        match ch {
            '{' | '[' | '(' => stack.push(ch),
            '}' => {
                if stack.pop() != Some('{') {
                    balanced = false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    balanced = false;
                }
            }
            ')' => {
                if stack.pop() != Some('(') {
                    balanced = false;
                }
            }
            _ => {}
        }
    }
    if !stack.is_empty() || !balanced {
        warn!(content_type = %content_type, "continuation.validation.unbalanced_brackets");
    }

    if matches!(content_type, ContentType::Json | ContentType::JsonCode) {
        if let Some(last_brace) = content.rfind('}') {
            let prefix = &content[..=last_brace];
            if serde_json::from_str::<serde_json::Value>(prefix).is_err() {
                warn!("continuation.validation.json_prefix_unparseable");
            }
        }
    }
}

/// Drives the continuation loop for one agent request: sends a completion,
/// and if truncated by length, asks the model to repeat an overlap window
/// and continue, joining chunks with the strategy ladder in `join` until
/// the model stops on a non-`length` finish reason or the attempt budget is
/// exhausted. Rate-limit and overload errors are retried with their
/// respective backoff schedules without consuming a continuation attempt.
pub async fn get_completion_with_continuation(
    transport: &dyn LlmTransport,
    messages: &[Message],
    cfg: &ContinuationConfig,
    splice: Option<&dyn SpliceCompletion>,
) -> Result<ContinuationOutcome> {
    let first_user = messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("");
    let content_type = detect_content_type(first_user);

    if cfg.wants_streaming() {
        debug!(
            max_tokens = cfg.max_tokens,
            extended_thinking_budget = cfg.extended_thinking_budget,
            "continuation.streaming_recommended_but_unsupported"
        );
    }

    let mut attempt: u32 = 0;
    let mut accumulated = String::new();
    let mut final_response: Option<CompletionResponse> = None;
    let mut diagnostics = ContinuationDiagnostics::default();

    let mut rate_limit_retries: u32 = 0;
    let mut rate_limit_backoff = initial_rate_limit_backoff();
    let mut overload_retries: u32 = 0;

    info!(
        max_attempts = cfg.max_continuation_attempts,
        content_type = %content_type,
        "continuation.starting"
    );

    while attempt < cfg.max_continuation_attempts {
        let mut overlap_text = String::new();
        let current_messages: Vec<Message> = if attempt == 0 {
            messages.to_vec()
        } else {
            let lines: Vec<&str> = accumulated.lines().collect();
            let n = overlap_line_count(content_type, &lines);
            overlap_text = last_n_lines(&accumulated, n);
            let prompt = create_continuation_prompt(content_type, &overlap_text);
            let mut extended = messages.to_vec();
            extended.push(Message::assistant(accumulated.clone()));
            extended.push(Message::user(prompt));
            extended
        };

        let request = build_request(&current_messages, cfg);

        match transport.complete(&request).await {
            Ok(response) => {
                rate_limit_retries = 0;
                rate_limit_backoff = initial_rate_limit_backoff();
                overload_retries = 0;

                if attempt == 0 {
                    accumulated = response.content.clone();
                } else {
                    accumulated = join_with_overlap(
                        content_type,
                        &accumulated,
                        &response.content,
                        &overlap_text,
                        splice,
                        &mut diagnostics,
                    )
                    .await;
                }

                let finish_reason = response.finish_reason.clone();
                final_response = Some(response);

                if finish_reason == FinishReason::Length {
                    info!(attempt, accumulated_len = accumulated.len(), "continuation.length_limit_reached");
                    attempt += 1;
                    continue;
                }
                info!(continuation_count = attempt, final_len = accumulated.len(), "continuation.completed");
                break;
            }
            // Only `LlmTransient` failures are eligible for the continuation
            // engine's own retry schedules; any other variant (e.g. a
            // `ConfigurationMissing` from the transport) is the caller's
            // problem and propagates untouched.
            Err(err) if matches!(err, Error::LlmTransient(_)) => {
                match classify_transient(&err.to_string()) {
                    Transient::RateLimit => {
                        rate_limit_retries += 1;
                        if rate_limit_retries > MAX_RETRIES {
                            warn!(retries = rate_limit_retries, "continuation.rate_limit_retries_exhausted");
                            return Err(err);
                        }
                        let delay = rate_limit_delay(&mut rate_limit_backoff);
                        warn!(retries = rate_limit_retries, delay_secs = delay.as_secs_f64(), "continuation.rate_limit_backoff");
                        sleep(delay).await;
                    }
                    Transient::Overload => {
                        overload_retries += 1;
                        if overload_retries > MAX_RETRIES {
                            warn!(retries = overload_retries, "continuation.overload_retries_exhausted");
                            return Err(err);
                        }
                        let delay = overload_delay(overload_retries);
                        warn!(retries = overload_retries, delay_secs = delay.as_secs_f64(), "continuation.overload_backoff");
                        sleep(delay).await;
                    }
                    Transient::Permanent => {
                        return Err(Error::LlmPermanent(err.to_string()));
                    }
                }
            }
            Err(err) => return Err(err),
        }
    }

    let Some(raw_final) = final_response else {
        return Err(Error::ContinuationGiveUp {
            attempts: attempt,
            reason: "no response received from transport".to_string(),
        });
    };

    if content_type.repairs_artifacts() && attempt > 0 {
        let original_len = accumulated.len();
        let (repaired, repairs) = repair_artifacts(&accumulated);
        accumulated = repaired;
        diagnostics.structure_repairs += repairs;
        if accumulated.len() != original_len {
            info!(content_type = %content_type, continuation_count = attempt, "continuation.artifacts_repaired");
        }
    }

    validate_content(content_type, &accumulated);

    Ok(ContinuationOutcome {
        content: accumulated,
        raw_final,
        continuation_attempts: attempt,
        diagnostics,
    })
}

#[cfg(not(test))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
async fn sleep(_duration: Duration) {
    // Tests run with a simulated provider; real-time sleeps would make the
    // retry-budget test slow for no benefit, so time is not actually spent.
}
