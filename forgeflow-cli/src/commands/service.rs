//! ABOUTME: `forgeflow service` — a minimal axum HTTP server exposing the
//! ABOUTME: two-endpoint workflow submission/status contract
//!
//! Router/handler shape grounded on `AxumHttpAdapter::start` in
//! `cloudllm/src/cloudllm/mcp_http_adapter.rs`: a `Router` of closures
//! capturing shared state, `Json` extraction/response, and
//! `TcpListener::bind` + `axum::serve` run from `tokio::spawn`.

use crate::cli::ServiceArgs;
use crate::state::{write_workflow_state, WorkflowRecord, DEFAULT_WORKFLOW_ROOT};
use anyhow::Result;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use forgeflow_orchestrator::Orchestrator;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path as StdPath;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Clone)]
struct ServiceState {
    records: Arc<RwLock<HashMap<String, WorkflowRecord>>>,
}

#[derive(Debug, Deserialize)]
struct SubmitWorkflowRequest {
    project_path: String,
    intent: Value,
    #[serde(default)]
    app_config: Option<Value>,
    #[serde(default)]
    system_config: Option<Value>,
}

pub async fn run(args: ServiceArgs) -> Result<()> {
    let state = ServiceState { records: Arc::new(RwLock::new(HashMap::new())) };

    let app = Router::new()
        .route("/api/v1/workflow", post(submit_workflow))
        .route("/api/v1/workflow/:id", get(get_workflow))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = args.port, "service.listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn submit_workflow(State(state): State<ServiceState>, Json(payload): Json<SubmitWorkflowRequest>) -> impl IntoResponse {
    let mut config = payload.system_config.unwrap_or_else(|| json!({}));
    if let Some(app_config) = payload.app_config {
        config = forgeflow_core::context::deep_merge(&config, &app_config);
    }

    let (prepared_config, context) = match Orchestrator::initialize_workflow(&payload.project_path, payload.intent, config) {
        Ok(v) => v,
        Err(err) => {
            warn!(error = %err, "service.initialize_workflow_failed");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": err.to_string()})),
            )
                .into_response();
        }
    };

    let run_id = context.get_str("workflow_run_id").unwrap_or_default().to_string();
    let workflow_root = StdPath::new(DEFAULT_WORKFLOW_ROOT);
    let storage_path = write_workflow_state(workflow_root, &run_id, "started")
        .ok()
        .map(|p| p.display().to_string());

    let record = WorkflowRecord { workflow_id: run_id.clone(), status: "started".to_string(), storage_path: storage_path.clone() };
    state.records.write().insert(run_id.clone(), record.clone());

    tokio::spawn(run_workflow_in_background(state, run_id, prepared_config, context, workflow_root.to_path_buf()));

    (StatusCode::OK, Json(record)).into_response()
}

async fn run_workflow_in_background(
    state: ServiceState,
    run_id: String,
    prepared_config: Value,
    context: forgeflow_core::Context,
    workflow_root: std::path::PathBuf,
) {
    let result = match Orchestrator::new(prepared_config) {
        Ok(mut orchestrator) => Some(orchestrator.execute_workflow("discovery", context, forgeflow_orchestrator::DEFAULT_MAX_TEAMS).await),
        Err(err) => {
            warn!(run_id = %run_id, error = %err, "service.orchestrator_build_failed");
            None
        }
    };

    let (status, storage_path) = match result {
        Some(result) if result.status == "success" => {
            let path = write_workflow_state(&workflow_root, &run_id, "completed").ok();
            ("completed".to_string(), path)
        }
        Some(result) => {
            let message = result.error.unwrap_or_else(|| "unknown error".to_string());
            let path = write_workflow_state(&workflow_root, &run_id, &format!("error: {message}")).ok();
            (format!("error: {message}"), path)
        }
        None => {
            let path = write_workflow_state(&workflow_root, &run_id, "error: failed to build orchestrator").ok();
            ("error: failed to build orchestrator".to_string(), path)
        }
    };

    let record = WorkflowRecord {
        workflow_id: run_id.clone(),
        status,
        storage_path: storage_path.map(|p| p.display().to_string()),
    };
    state.records.write().insert(run_id, record);
}

async fn get_workflow(State(state): State<ServiceState>, AxumPath(id): AxumPath<String>) -> impl IntoResponse {
    match state.records.read().get(&id).cloned() {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown workflow id"}))).into_response(),
    }
}
