//! ABOUTME: Per-agent config resolution — provider, model, and provider-config lookup
//! ABOUTME: mirrors `base_config.py`'s `_resolve_model`/`_get_provider_config`

use forgeflow_core::{Error, LlmProvider, Result};
use serde_json::{json, Value};
use tracing::warn;

/// Returns `llm_config.agents.<agent_name>`, or an empty object if absent.
pub fn agent_config(config: &Value, agent_name: &str) -> Value {
    config
        .pointer(&format!("/llm_config/agents/{agent_name}"))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

/// Returns `llm_config.providers.<provider>`, or an empty object if absent.
pub fn provider_config(config: &Value, provider: LlmProvider) -> Value {
    config
        .pointer(&format!("/llm_config/providers/{provider}"))
        .cloned()
        .unwrap_or_else(|| json!({}))
}

/// Resolves the provider for an agent: `llm_config.agents.<name>.provider`,
/// defaulting to `anthropic` the way `base_agent.py`'s constructor does.
pub fn resolve_provider(agent_cfg: &Value) -> Result<LlmProvider> {
    let name = agent_cfg.get("provider").and_then(Value::as_str).unwrap_or("anthropic");
    name.parse()
}

/// Resolves the model name for `agent_name` using the same chain as
/// `_resolve_model`: an explicit override, then the agent's own config,
/// then the provider's `default_model`, then `llm_config.default_model`.
/// If the resolved model isn't in the provider's `valid_models` list (when
/// one is configured), falls back to the provider's default model, or
/// errors if there isn't one.
pub fn resolve_model(
    explicit_model: Option<&str>,
    agent_name: &str,
    config: &Value,
    provider_cfg: &Value,
) -> Result<String> {
    let agent_model_path = format!("/llm_config/agents/{agent_name}/model");

    let mut model = if let Some(m) = explicit_model {
        m.to_string()
    } else if let Some(m) = config.pointer(&agent_model_path).and_then(Value::as_str) {
        m.to_string()
    } else if let Some(m) = provider_cfg.get("default_model").and_then(Value::as_str) {
        m.to_string()
    } else if let Some(m) = config.pointer("/llm_config/default_model").and_then(Value::as_str) {
        m.to_string()
    } else {
        return Err(Error::ConfigurationMissing(format!(
            "no model specified for agent '{agent_name}' and no defaults found"
        )));
    };

    if let Some(valid_models) = provider_cfg.get("valid_models").and_then(Value::as_array) {
        let valid: Vec<&str> = valid_models.iter().filter_map(Value::as_str).collect();
        if !valid.is_empty() && !valid.contains(&model.as_str()) {
            let default = provider_cfg.get("default_model").and_then(Value::as_str);
            warn!(
                model = %model,
                valid_models = ?valid,
                using_default = ?default,
                "config.invalid_model"
            );
            model = default
                .ok_or_else(|| {
                    Error::ConfigurationMissing(format!(
                        "invalid model '{model}' for agent '{agent_name}' and no default available"
                    ))
                })?
                .to_string();
        }
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explicit_model_wins_over_everything() {
        let config = json!({"llm_config": {"agents": {"coder": {"model": "ignored"}}, "default_model": "also-ignored"}});
        let provider_cfg = json!({"default_model": "still-ignored"});
        let model = resolve_model(Some("explicit-model"), "coder", &config, &provider_cfg).unwrap();
        assert_eq!(model, "explicit-model");
    }

    #[test]
    fn falls_back_down_the_chain() {
        let config = json!({"llm_config": {"default_model": "fallback-model"}});
        let provider_cfg = json!({});
        let model = resolve_model(None, "coder", &config, &provider_cfg).unwrap();
        assert_eq!(model, "fallback-model");
    }

    #[test]
    fn errors_when_nothing_resolves() {
        let config = json!({});
        let provider_cfg = json!({});
        assert!(resolve_model(None, "coder", &config, &provider_cfg).is_err());
    }

    #[test]
    fn invalid_model_falls_back_to_provider_default() {
        let config = json!({"llm_config": {"agents": {"coder": {"model": "nonexistent"}}}});
        let provider_cfg = json!({"valid_models": ["gpt-4"], "default_model": "gpt-4"});
        let model = resolve_model(None, "coder", &config, &provider_cfg).unwrap();
        assert_eq!(model, "gpt-4");
    }

    #[test]
    fn resolve_provider_defaults_to_anthropic() {
        let provider = resolve_provider(&json!({})).unwrap();
        assert_eq!(provider, LlmProvider::Anthropic);
    }
}
