//! ABOUTME: `forgeflow workflow` — runs one workflow in-process and reports
//! ABOUTME: its terminal status via the process exit code

use crate::cli::WorkflowArgs;
use crate::state::{write_workflow_state, DEFAULT_WORKFLOW_ROOT};
use anyhow::{Context as _, Result};
use forgeflow_config::{apply_overlays, load_config};
use forgeflow_orchestrator::Orchestrator;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// Runs the `workflow` subcommand to completion and returns the process
/// exit code: `0` on a `success` workflow status, `1` otherwise.
pub async fn run(args: WorkflowArgs) -> Result<i32> {
    let base = load_config(&args.config).context("loading --config")?;
    let config = apply_overlays(base, &args.system_configs).context("applying --system-configs overlays")?;

    let project_path = args
        .project_path
        .clone()
        .or_else(|| config.pointer("/project/path").and_then(Value::as_str).map(str::to_string))
        .context("no --project-path given and config has no project.path")?;

    let intent = match &args.intent_file {
        Some(path) => read_intent(path)?,
        None => json!({}),
    };

    let (prepared_config, context) = Orchestrator::initialize_workflow(&project_path, intent, config)?;
    let run_id = context.get_str("workflow_run_id").unwrap_or_default().to_string();

    let workflow_root = Path::new(DEFAULT_WORKFLOW_ROOT);
    write_workflow_state(workflow_root, &run_id, "started")?;

    let mut orchestrator = Orchestrator::new(prepared_config)?;
    let result = orchestrator.execute_workflow("discovery", context, forgeflow_orchestrator::DEFAULT_MAX_TEAMS).await;

    let status_line = if result.status == "success" {
        "completed".to_string()
    } else {
        format!("error: {}", result.error.as_deref().unwrap_or("unknown error"))
    };
    write_workflow_state(workflow_root, &run_id, &status_line)?;

    info!(run_id = %run_id, status = %result.status, "workflow.cli_run_finished");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.status == "success" { 0 } else { 1 })
}

fn read_intent(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading intent file {}", path.display()))?;
    Ok(json!({"description": raw.trim()}))
}
