//! ABOUTME: Lineage event tracking for forgeflow workflow runs
//! ABOUTME: writes append-only JSON events describing every LLM interaction in a run

pub mod backend;
pub mod event;
pub mod runid;
pub mod tracker;

pub use backend::{FileLineageBackend, LineageBackend, NullLineageBackend};
pub use event::{AgentRef, LineageEvent, LlmInputRef, WorkflowRef};
pub use tracker::LineageTracker;

#[cfg(feature = "remote-lineage")]
pub use backend::RemoteLineageBackend;
