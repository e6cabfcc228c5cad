//! ABOUTME: Workflow-state persistence and the in-memory record the HTTP
//! ABOUTME: service tracks per submitted workflow
//!
//! Grounded on spec.md §6's persisted-state layout:
//! `<workflow_root>/<YYMMDD_HHMM>_<run_id>/workflow_state.txt` plus
//! per-stage raw event logs in `events/<NN>_<stage>.txt`.

use chrono::Utc;
use forgeflow_utils::{atomic_write, AtomicWriteError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKFLOW_ROOT: &str = "workspaces/workflow_state";

/// One entry in the service's in-memory `workflow_id -> record` map, and
/// the literal shape both HTTP endpoints return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

fn run_dir(root: &Path, run_id: &str) -> PathBuf {
    let prefix = Utc::now().format("%y%m%d_%H%M").to_string();
    root.join(format!("{prefix}_{run_id}"))
}

/// Writes `workflow_state.txt` as a timestamp line followed by a status
/// word (`started`, `completed`, or `error: <message>`).
pub fn write_workflow_state(root: &Path, run_id: &str, status: &str) -> Result<PathBuf, AtomicWriteError> {
    let dir = run_dir(root, run_id);
    let path = dir.join("workflow_state.txt");
    let body = format!("{}\n{}\n", Utc::now().to_rfc3339(), status);
    atomic_write(&path, body.as_bytes())?;
    Ok(path)
}

/// Writes one stage's raw event log to `events/<NN>_<stage>.txt`, where
/// `NN` is `index` zero-padded to two digits.
pub fn write_stage_event(root: &Path, run_id: &str, index: u32, stage: &str, content: &str) -> Result<PathBuf, AtomicWriteError> {
    let path = run_dir(root, run_id).join("events").join(format!("{index:02}_{stage}.txt"));
    atomic_write(&path, content.as_bytes())?;
    Ok(path)
}
