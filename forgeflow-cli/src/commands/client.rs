//! ABOUTME: `forgeflow client` — submits a workflow to a running service and
//! ABOUTME: optionally polls it until it reaches a terminal status

use crate::cli::ClientArgs;
use crate::state::WorkflowRecord;
use anyhow::{Context, Result};
use serde_json::json;
use std::time::Duration;
use tracing::info;

pub async fn run(args: ClientArgs) -> Result<i32> {
    let intent_text = std::fs::read_to_string(&args.intent_file)
        .with_context(|| format!("reading intent file {}", args.intent_file.display()))?;

    let client = reqwest::Client::new();
    let submit_url = format!("{}/api/v1/workflow", args.url.trim_end_matches('/'));

    let mut record: WorkflowRecord = client
        .post(&submit_url)
        .json(&json!({
            "project_path": args.project_path,
            "intent": {"description": intent_text.trim()},
        }))
        .send()
        .await
        .context("submitting workflow")?
        .json()
        .await
        .context("parsing submit response")?;

    info!(workflow_id = %record.workflow_id, status = %record.status, "client.workflow_submitted");

    if args.poll {
        let status_url = format!("{}/api/v1/workflow/{}", args.url.trim_end_matches('/'), record.workflow_id);
        for attempt in 0..args.max_polls {
            if is_terminal(&record.status) {
                break;
            }
            tokio::time::sleep(Duration::from_secs(args.poll_interval)).await;
            record = client.get(&status_url).send().await.context("polling workflow status")?.json().await.context("parsing poll response")?;
            info!(workflow_id = %record.workflow_id, status = %record.status, attempt, "client.polled");
        }
    }

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(if record.status == "completed" { 0 } else { 1 })
}

fn is_terminal(status: &str) -> bool {
    status == "completed" || status.starts_with("error")
}
