//! ABOUTME: The execution contract every agent in the pipeline satisfies
//! ABOUTME: composition over the original's Config+LLM+Base multiple inheritance

use crate::context::Context;
use crate::types::AgentResponse;
use async_trait::async_trait;

/// Contract shared by every agent in the pipeline.
///
/// Where the original implementation built an agent by inheriting from a
/// config mixin, an LLM mixin, and a base class, this trait expresses the
/// same capability set as a single interface: a name, a resolved system
/// prompt, a request formatter, the context keys it needs, and the one
/// entry point that turns a context into a response.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use forgeflow_core::agent::Agent;
/// use forgeflow_core::context::Context;
/// use forgeflow_core::types::AgentResponse;
/// use std::collections::HashMap;
///
/// struct EchoAgent;
///
/// #[async_trait]
/// impl Agent for EchoAgent {
///     fn agent_name(&self) -> &str {
///         "echo"
///     }
///
///     fn system_prompt(&self) -> String {
///         "You repeat the input verbatim.".to_string()
///     }
///
///     async fn process(&self, _context: &Context) -> AgentResponse {
///         AgentResponse::success(HashMap::new(), None)
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let agent = EchoAgent;
/// let response = agent.process(&Context::new()).await;
/// assert!(response.success);
/// # });
/// ```
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name used for config lookup (`llm_config.agents.<name>`) and as the
    /// `agent.type` field on emitted lineage events.
    fn agent_name(&self) -> &str;

    /// Context keys this agent requires to do its work. Used by
    /// `get_data` style extraction; an empty default means "accepts
    /// whatever is in context."
    fn required_keys(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Resolved from `llm_config.agents.<name>.prompts.system`.
    fn system_prompt(&self) -> String;

    /// Formats the extracted data into the user message. The default
    /// behavior stringifies the JSON value; agents with a structured
    /// prompt template override this.
    fn format_request(&self, data: &serde_json::Value) -> String {
        data.to_string()
    }

    /// Main entry point: resolve data from context, build messages, hand
    /// off to the continuation engine, wrap the result, and emit lineage.
    /// Does not retry on failure — that is the Task Wrapper's job.
    async fn process(&self, context: &Context) -> AgentResponse;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockAgent {
        name: &'static str,
    }

    #[async_trait]
    impl Agent for MockAgent {
        fn agent_name(&self) -> &str {
            self.name
        }

        fn system_prompt(&self) -> String {
            "mock".to_string()
        }

        async fn process(&self, _context: &Context) -> AgentResponse {
            AgentResponse::success(HashMap::new(), None)
        }
    }

    #[tokio::test]
    async fn default_required_keys_is_empty() {
        let agent = MockAgent { name: "mock" };
        assert!(agent.required_keys().is_empty());
    }

    #[tokio::test]
    async fn default_format_request_stringifies_json() {
        let agent = MockAgent { name: "mock" };
        let data = serde_json::json!({"a": 1});
        assert_eq!(agent.format_request(&data), data.to_string());
    }

    #[tokio::test]
    async fn process_returns_successful_response() {
        let agent = MockAgent { name: "mock" };
        let response = agent.process(&Context::new()).await;
        assert!(response.success);
    }
}
