//! ABOUTME: Error taxonomy shared across the forgeflow workspace
//! ABOUTME: one variant per failure kind the orchestration design names, not per crate

use thiserror::Error;

/// Error kinds surfaced by the orchestration core.
///
/// `LineageWrite` is deliberately not propagated by the lineage tracker
/// itself — any backend failure is logged and swallowed there. The variant
/// exists so other layers (tests, a strict-mode caller) have somewhere to
/// put it if they choose to observe it.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration value was absent after the full resolution
    /// chain ran. Fatal at startup.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Missing project path, malformed intent, or a missing required
    /// context key.
    #[error("input validation failed: {0}")]
    InputValidation(String),

    /// Rate-limit or overload response from the LLM provider.
    #[error("transient LLM error: {0}")]
    LlmTransient(String),

    /// Bad request, authentication failure, or content filter rejection.
    #[error("permanent LLM error: {0}")]
    LlmPermanent(String),

    /// All continuation join strategies were exhausted and validation
    /// still failed.
    #[error("continuation exhausted after {attempts} attempt(s): {reason}")]
    ContinuationGiveUp { attempts: u32, reason: String },

    /// A lineage backend failed to persist an event.
    #[error("lineage write failed: {0}")]
    LineageWrite(String),

    /// `max_teams` was exceeded during workflow execution.
    #[error("exceeded maximum team limit of {max_teams}")]
    ExecutionLimit { max_teams: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
