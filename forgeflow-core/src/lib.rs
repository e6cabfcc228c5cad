//! ABOUTME: Shared types, context model, and error taxonomy for the forgeflow workspace
//! ABOUTME: every other crate in the workspace depends on this one; it depends on none of them

pub mod agent;
pub mod context;
pub mod error;
pub mod project;
pub mod types;

pub use agent::Agent;
pub use context::{Context, ConfigNode};
pub use error::{Error, Result};
pub use project::{Project, ProjectMetadata, ProjectPaths};
pub use types::{
    AgentInput, AgentKind, AgentResponse, AgentTaskConfig, LlmMessages, LlmProvider, LogDetail,
    Usage,
};
