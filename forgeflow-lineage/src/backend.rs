//! ABOUTME: Storage backends for lineage events — an atomic-write file backend
//! ABOUTME: is the default; a null backend and a feature-gated remote backend round it out

use crate::event::LineageEvent;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tracing::warn;

/// A place lineage events can be written to. Every implementation is
/// expected to fail soft: callers (see [`crate::tracker::LineageTracker`])
/// log and swallow backend errors rather than let a lineage write failure
/// abort the agent interaction that produced it.
#[async_trait]
pub trait LineageBackend: Send + Sync {
    async fn write_event(&self, event: &LineageEvent) -> Result<(), LineageBackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LineageBackendError {
    #[error("failed to serialize lineage event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write lineage event to {path}: {source}")]
    Io { path: String, source: io::Error },
    #[cfg(feature = "remote-lineage")]
    #[error("remote lineage backend request failed: {0}")]
    Remote(#[from] reqwest::Error),
}

/// Writes each event as `<root>/<YYYYMMDD>/<run_id>/events/<event_id>.json`,
/// using a temp-file-then-rename sequence so a reader never observes a
/// partially written file. `errors/`, `inputs/`, and `outputs/` sibling
/// directories are created alongside `events/` for forward compatibility
/// with richer event kinds, though nothing in this crate writes to them yet.
pub struct FileLineageBackend {
    root: PathBuf,
}

impl FileLineageBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, event: &LineageEvent) -> PathBuf {
        let date = event.timestamp.format("%Y%m%d").to_string();
        self.root.join(date).join(&event.workflow.run_id)
    }
}

#[async_trait]
impl LineageBackend for FileLineageBackend {
    async fn write_event(&self, event: &LineageEvent) -> Result<(), LineageBackendError> {
        let run_dir = self.run_dir(event);
        let events_dir = run_dir.join("events");
        for sub in ["events", "errors", "inputs", "outputs"] {
            let dir = run_dir.join(sub);
            std::fs::create_dir_all(&dir).map_err(|source| LineageBackendError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }

        let final_path = events_dir.join(format!("{}.json", event.event_id));
        let tmp_path = events_dir.join(format!("{}.json.tmp", event.event_id));

        let body = serde_json::to_vec_pretty(event)?;
        std::fs::write(&tmp_path, &body).map_err(|source| LineageBackendError::Io {
            path: tmp_path.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|source| LineageBackendError::Io {
            path: final_path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

/// Discards every event. Used when lineage tracking is disabled in config,
/// so callers don't need to special-case "no backend configured".
#[derive(Debug, Default)]
pub struct NullLineageBackend;

#[async_trait]
impl LineageBackend for NullLineageBackend {
    async fn write_event(&self, _event: &LineageEvent) -> Result<(), LineageBackendError> {
        Ok(())
    }
}

/// Posts events to an OpenLineage/Marquez-compatible HTTP endpoint. Out of
/// scope for the core pipeline per spec.md's Non-goals, but kept behind a
/// feature flag since the run-id and event shape already line up with it.
#[cfg(feature = "remote-lineage")]
pub struct RemoteLineageBackend {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "remote-lineage")]
impl RemoteLineageBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[cfg(feature = "remote-lineage")]
#[async_trait]
impl LineageBackend for RemoteLineageBackend {
    async fn write_event(&self, event: &LineageEvent) -> Result<(), LineageBackendError> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;
        if let Err(source) = response.error_for_status_ref() {
            warn!(endpoint = %self.endpoint, error = %source, "lineage.remote.non_success_status");
        }
        Ok(())
    }
}
