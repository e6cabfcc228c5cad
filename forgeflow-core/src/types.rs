//! ABOUTME: Domain types shared by every crate in the workspace
//! ABOUTME: provider/agent enums, task configuration, and the agent response envelope

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Supported LLM providers. Serializes as the lowercase provider name so
/// config files and lineage events read naturally (`"provider": "anthropic"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(crate::error::Error::ConfigurationMissing(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

/// Verbosity of agent-runtime tracing. Mirrors the four-level scheme the
/// original orchestrator used to gate structured log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDetail {
    Minimal,
    Basic,
    Detailed,
    Debug,
}

impl LogDetail {
    /// Parses a level name, falling back to `Basic` for anything
    /// unrecognized rather than failing config resolution over a log knob.
    pub fn from_str_lossy(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "detailed" => Self::Detailed,
            "debug" => Self::Debug,
            _ => Self::Basic,
        }
    }
}

/// The known agent variants an `AgentTaskConfig` may select.
///
/// `SemanticIterator`, `SemanticMerge`, `SemanticExtract`, and `AssetManager`
/// are named here because the routing and config layers must be able to
/// refer to them, but they are external collaborators: forgeflow-agents
/// ships only a stub for each that reports `InputValidation` rather than a
/// working implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Discovery,
    SolutionDesigner,
    Coder,
    Assurance,
    SemanticIterator,
    SemanticMerge,
    SemanticExtract,
    AssetManager,
}

impl AgentKind {
    /// Canonical lookup name, used both for config paths
    /// (`llm_config.agents.<name>`) and for lineage's `agent.type` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::SolutionDesigner => "solution_designer",
            Self::Coder => "coder",
            Self::Assurance => "assurance",
            Self::SemanticIterator => "semantic_iterator",
            Self::SemanticMerge => "semantic_merge",
            Self::SemanticExtract => "semantic_extract",
            Self::AssetManager => "asset_manager",
        }
    }

    /// Whether this kind has a real pipeline implementation in
    /// `forgeflow-agents`, as opposed to a named-interface stub.
    pub fn is_core_pipeline_agent(&self) -> bool {
        matches!(
            self,
            Self::Discovery | Self::SolutionDesigner | Self::Coder | Self::Assurance
        )
    }
}

/// Normalized token accounting, regardless of which provider SDK produced
/// the raw response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Configuration for one task within a team: which agent runs, with what
/// merged config, and the retry/approval policy the Task Wrapper applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTaskConfig {
    pub agent_kind: AgentKind,
    pub config: serde_json::Value,
    pub task_name: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    30
}

/// The three messages every agent invocation builds before handing off to
/// the continuation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessages {
    pub system: String,
    pub user: String,
    pub formatted_request: String,
    pub raw_context: serde_json::Value,
}

/// Full capture of what was sent to the model, attached to `AgentResponse`
/// and folded into lineage's `llm_input` facet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInput {
    pub system_prompt: String,
    pub user_message: String,
    pub formatted_request: String,
    pub raw_context: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AgentInput {
    pub fn new(system_prompt: String, user_message: String, raw_context: serde_json::Value) -> Self {
        Self {
            system_prompt,
            formatted_request: user_message.clone(),
            user_message,
            raw_context,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Standard response envelope returned by every agent.
///
/// Invariant: `success == false` implies `error.is_some()`. On success,
/// `data` contains at minimum `{response, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,
    pub data: HashMap<String, serde_json::Value>,
    pub error: Option<String>,
    pub llm_input: Option<AgentInput>,
    pub raw_output: Option<String>,
    #[serde(default)]
    pub metrics: HashMap<String, serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AgentResponse {
    pub fn success(data: HashMap<String, serde_json::Value>, llm_input: Option<AgentInput>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            llm_input,
            raw_output: None,
            metrics: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn failure(error: impl Into<String>, llm_input: Option<AgentInput>) -> Self {
        Self {
            success: false,
            data: HashMap::new(),
            error: Some(error.into()),
            llm_input,
            raw_output: None,
            metrics: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }
}
