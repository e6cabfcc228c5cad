//! ABOUTME: Provider transport wiring over rig-core, plus the provider
//! ABOUTME: manager that resolves a configured provider/model into a transport

use async_trait::async_trait;
use forgeflow_core::{Error, LlmProvider, Result};
use rig::completion::CompletionModel as _;
use rig::providers;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: forgeflow_core::Usage,
}

/// Capabilities reported for a configured provider/model pair, following
/// the shape of the teacher's `ProviderCapabilities` (trimmed to the fields
/// this system actually consults: model selection and streaming/multimodal
/// gating for the orchestrator's transport choice).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProviderCapabilities {
    pub supports_streaming: bool,
    pub supports_multimodal: bool,
    pub max_context_tokens: Option<u64>,
    pub max_output_tokens: Option<u64>,
    pub available_models: Vec<String>,
    #[serde(default)]
    pub custom_features: HashMap<String, Value>,
}

/// A single provider/model completion endpoint. Implementations never
/// retry internally — retry/backoff policy lives in the continuation
/// engine, which is the only caller that knows whether a given failure is
/// a rate limit, an overload, or permanent.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    fn capabilities(&self) -> &ProviderCapabilities;
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

enum RigModel {
    OpenAi(providers::openai::CompletionModel),
    Anthropic(providers::anthropic::completion::CompletionModel),
}

pub struct RigTransport {
    provider: LlmProvider,
    model_name: String,
    model: RigModel,
    capabilities: ProviderCapabilities,
}

impl RigTransport {
    /// Builds a transport for `provider`/`model` from that provider's
    /// config section (`llm_config.providers.<name>`). `rig-core` 0.21
    /// ships no Gemini backend, so `LlmProvider::Gemini` is rejected here
    /// with `ConfigurationMissing` even though the type exists so config
    /// and lineage can still name it.
    pub fn new(provider: LlmProvider, model_name: &str, provider_config: &Value) -> Result<Self> {
        if matches!(provider, LlmProvider::Gemini) {
            return Err(Error::ConfigurationMissing(
                "gemini provider has no rig-core backend in this build".to_string(),
            ));
        }

        let api_key = provider_config
            .get("api_key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| std::env::var(env_var_name(provider)).ok())
            .ok_or_else(|| {
                Error::ConfigurationMissing(format!("{provider} api_key not configured"))
            })?;

        let model = match provider {
            LlmProvider::OpenAi => {
                let client = providers::openai::Client::new(&api_key);
                RigModel::OpenAi(client.completion_model(model_name))
            }
            LlmProvider::Anthropic => {
                let base_url = provider_config
                    .get("base_url")
                    .and_then(Value::as_str)
                    .unwrap_or("https://api.anthropic.com");
                let version = provider_config
                    .get("api_version")
                    .and_then(Value::as_str)
                    .unwrap_or("2023-06-01");
                let client = providers::anthropic::Client::new(&api_key, base_url, None, version);
                RigModel::Anthropic(client.completion_model(model_name))
            }
            LlmProvider::Gemini => unreachable!("rejected above"),
        };

        let capabilities = default_capabilities(provider, model_name);

        Ok(Self {
            provider,
            model_name: model_name.to_string(),
            model,
            capabilities,
        })
    }
}

fn env_var_name(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "OPENAI_API_KEY",
        LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        LlmProvider::Gemini => "GEMINI_API_KEY",
    }
}

fn default_capabilities(provider: LlmProvider, model_name: &str) -> ProviderCapabilities {
    let max_context_tokens = match provider {
        LlmProvider::OpenAi => match model_name {
            "gpt-4" | "gpt-4-turbo" => 128_000,
            "gpt-3.5-turbo" => 16_384,
            _ => 8_192,
        },
        LlmProvider::Anthropic => match model_name {
            "claude-3-opus" | "claude-3-sonnet" | "claude-3-5-sonnet" => 200_000,
            _ => 100_000,
        },
        LlmProvider::Gemini => 0,
    };
    ProviderCapabilities {
        supports_streaming: false,
        supports_multimodal: matches!(provider, LlmProvider::OpenAi | LlmProvider::Anthropic),
        max_context_tokens: Some(max_context_tokens),
        max_output_tokens: Some(4096),
        available_models: vec![model_name.to_string()],
        custom_features: HashMap::new(),
    }
}

/// `rig-core`'s simple completion API exposes no token usage accounting, so
/// usage is estimated at roughly 4 characters per token. This is accurate
/// enough for lineage metrics and the continuation loop's length-based
/// finish-reason heuristic, but is not a billing-accurate count.
fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64 / 4).max(1)
}

fn classify_finish_reason(content: &str, max_tokens: u32) -> FinishReason {
    let estimated = estimate_tokens(content);
    if estimated as f64 >= 0.95 * max_tokens as f64 {
        FinishReason::Length
    } else {
        FinishReason::Stop
    }
}

#[async_trait]
impl LlmTransport for RigTransport {
    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let prompt = if request.system.is_empty() {
            request.user.clone()
        } else {
            format!("{}\n\n{}", request.system, request.user)
        };

        let content = match &self.model {
            RigModel::OpenAi(model) => run_completion(model, &prompt, request, self.provider).await?,
            RigModel::Anthropic(model) => {
                run_completion(model, &prompt, request, self.provider).await?
            }
        };

        let finish_reason = classify_finish_reason(&content, request.max_tokens);
        let prompt_tokens = estimate_tokens(&prompt);
        let completion_tokens = estimate_tokens(&content);
        Ok(CompletionResponse {
            content,
            finish_reason,
            usage: forgeflow_core::Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        })
    }
}

async fn run_completion<M>(
    model: &M,
    prompt: &str,
    request: &CompletionRequest,
    provider: LlmProvider,
) -> Result<String>
where
    M: rig::completion::CompletionModel,
{
    let response = model
        .completion_request(prompt)
        .temperature(request.temperature)
        .max_tokens(request.max_tokens as u64)
        .send()
        .await
        .map_err(|e| Error::LlmTransient(format!("{provider} completion failed: {e}")))?;

    match response.choice {
        rig::completion::ModelChoice::Message(text) => Ok(text),
        rig::completion::ModelChoice::ToolCall(name, _params) => Err(Error::LlmPermanent(format!(
            "unexpected tool call in simple completion response: {name}"
        ))),
    }
}

/// Resolves a configured `(provider, model)` pair into a transport,
/// building and caching transports lazily as agents request them.
pub struct ProviderManager {
    transports: HashMap<(LlmProvider, String), Arc<dyn LlmTransport>>,
}

impl ProviderManager {
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: LlmProvider, model: impl Into<String>, transport: Arc<dyn LlmTransport>) {
        self.transports.insert((provider, model.into()), transport);
    }

    pub fn transport(&self, provider: LlmProvider, model: &str) -> Result<Arc<dyn LlmTransport>> {
        self.transports
            .get(&(provider, model.to_string()))
            .cloned()
            .ok_or_else(|| {
                Error::ConfigurationMissing(format!("no transport registered for {provider}/{model}"))
            })
    }

    /// Lazily builds and caches a `RigTransport` for `provider`/`model`
    /// from `provider_config`, returning the cached instance on repeat
    /// calls for the same pair.
    pub fn get_or_build(
        &mut self,
        provider: LlmProvider,
        model: &str,
        provider_config: &Value,
    ) -> Result<Arc<dyn LlmTransport>> {
        let key = (provider, model.to_string());
        if let Some(existing) = self.transports.get(&key) {
            return Ok(existing.clone());
        }
        let transport: Arc<dyn LlmTransport> = Arc::new(RigTransport::new(provider, model, provider_config)?);
        self.transports.insert(key, transport.clone());
        Ok(transport)
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gemini_provider_is_unconfigured_by_design() {
        let err = RigTransport::new(LlmProvider::Gemini, "gemini-pro", &json!({})).unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(_)));
    }

    #[test]
    fn openai_without_api_key_or_env_errors() {
        std::env::remove_var("OPENAI_API_KEY");
        let err = RigTransport::new(LlmProvider::OpenAi, "gpt-4", &json!({})).unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(_)));
    }

    #[test]
    fn estimate_tokens_is_roughly_four_chars_per_token() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn classifies_finish_reason_as_length_near_the_token_budget() {
        let long_content = "a".repeat(400);
        assert_eq!(classify_finish_reason(&long_content, 100), FinishReason::Length);
        assert_eq!(classify_finish_reason("short", 100), FinishReason::Stop);
    }

    #[test]
    fn provider_manager_reports_missing_transport() {
        let manager = ProviderManager::new();
        let err = manager.transport(LlmProvider::OpenAi, "gpt-4").unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing(_)));
    }
}
