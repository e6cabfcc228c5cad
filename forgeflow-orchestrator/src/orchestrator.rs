//! ABOUTME: Orchestrator — loads the team graph from config, stamps a fresh
//! ABOUTME: workflow's context, and drives the bounded team-execution loop
//!
//! Grounded on `c4h_services/src/orchestration/orchestrator.py` in full:
//! `_load_teams`/`_load_default_teams`, `initialize_workflow`'s context
//! stamping, and `execute_workflow`'s team-by-team loop with context
//! overlay-merge between teams.

use crate::team::{Team, TaskSpec, TeamResult};
use chrono::{DateTime, Utc};
use forgeflow_agents::build_agent;
use forgeflow_core::context::deep_merge;
use forgeflow_core::{AgentKind, AgentTaskConfig, Context, Error, Result};
use forgeflow_providers::ProviderManager;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// `max_teams` default when a caller doesn't override it, matching
/// `execute_workflow(..., max_teams=10)` in the grounding source.
pub const DEFAULT_MAX_TEAMS: u32 = 10;

/// Final record produced by `execute_workflow`, matching the shape
/// `{status, workflow_run_id, execution_path, team_results, teams_executed,
/// data, timestamp}` from the source's return value, plus `error` for the
/// failing-run case.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub status: String,
    pub workflow_run_id: String,
    pub execution_path: Vec<String>,
    pub team_results: Vec<TeamResult>,
    pub teams_executed: u32,
    pub data: Value,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Loads the team graph once at construction (or on a config-change reload)
/// and drives workflow runs across it. One `Orchestrator` may run any
/// number of workflows sequentially; it holds no per-workflow state between
/// `execute_workflow` calls.
pub struct Orchestrator {
    config: Value,
    teams: HashMap<String, Team>,
    providers: Arc<Mutex<ProviderManager>>,
}

impl Orchestrator {
    /// Builds an orchestrator with a fresh, empty `ProviderManager`. Use
    /// [`Orchestrator::with_providers`] to share a manager (and its cached
    /// transports) across several orchestrators, or to inject fakes in
    /// tests.
    pub fn new(config: Value) -> Result<Self> {
        Self::with_providers(config, Arc::new(Mutex::new(ProviderManager::new())))
    }

    pub fn with_providers(config: Value, providers: Arc<Mutex<ProviderManager>>) -> Result<Self> {
        let teams = Self::load_teams(&config, providers.clone())?;
        info!(team_count = teams.len(), "orchestrator.teams_loaded");
        Ok(Self { config, teams, providers })
    }

    fn reload_teams(&mut self, config: Value) -> Result<()> {
        let teams = Self::load_teams(&config, self.providers.clone())?;
        info!(team_count = teams.len(), "orchestrator.teams_reloaded");
        self.teams = teams;
        self.config = config;
        Ok(())
    }

    /// Reads `orchestration.teams` from `config` (a map of team id to team
    /// definition) and builds each one; falls back to
    /// [`Orchestrator::load_default_teams`] when that key is absent or
    /// empty, matching `_load_teams`'s own fallback.
    fn load_teams(config: &Value, providers: Arc<Mutex<ProviderManager>>) -> Result<HashMap<String, Team>> {
        match config.pointer("/orchestration/teams").and_then(Value::as_object) {
            Some(defs) if !defs.is_empty() => defs
                .iter()
                .map(|(id, def)| Self::build_team(id, def, config, providers.clone()).map(|team| (id.clone(), team)))
                .collect(),
            _ => {
                warn!("orchestrator.no_teams_configured_using_default_chain");
                Ok(Self::load_default_teams(config, providers))
            }
        }
    }

    /// The built-in discovery → solution → coder chain used when
    /// `orchestration.teams` is absent from config, matching
    /// `_load_default_teams`: default-only routing, no rules, one task per
    /// team.
    fn load_default_teams(config: &Value, providers: Arc<Mutex<ProviderManager>>) -> HashMap<String, Team> {
        let discovery = Team::new(
            "discovery",
            "Discovery Team",
            vec![Self::default_task(AgentKind::Discovery, "discovery", config, providers.clone())],
            &json!({"routing": {"default": "solution"}}),
        );
        let solution = Team::new(
            "solution",
            "Solution Design Team",
            vec![Self::default_task(AgentKind::SolutionDesigner, "solution_designer", config, providers.clone())],
            &json!({"routing": {"default": "coder"}}),
        );
        let coder = Team::new(
            "coder",
            "Coder Team",
            vec![Self::default_task(AgentKind::Coder, "coder", config, providers)],
            &json!({"routing": {}}),
        );

        let mut teams = HashMap::new();
        teams.insert("discovery".to_string(), discovery);
        teams.insert("solution".to_string(), solution);
        teams.insert("coder".to_string(), coder);
        teams
    }

    fn default_task(kind: AgentKind, task_name: &str, config: &Value, providers: Arc<Mutex<ProviderManager>>) -> TaskSpec {
        let agent = build_agent(kind, config.clone(), providers);
        TaskSpec {
            agent,
            task_config: AgentTaskConfig {
                agent_kind: kind,
                config: json!({}),
                task_name: Some(task_name.to_string()),
                requires_approval: false,
                max_retries: 3,
                retry_delay_seconds: 30,
            },
        }
    }

    fn build_team(team_id: &str, team_def: &Value, root_config: &Value, providers: Arc<Mutex<ProviderManager>>) -> Result<Team> {
        let team_name = team_def.get("name").and_then(Value::as_str).unwrap_or(team_id).to_string();
        let task_defs = team_def
            .get("tasks")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ConfigurationMissing(format!("team '{team_id}' has no 'tasks' array")))?;

        let tasks = task_defs
            .iter()
            .map(|task_def| Self::build_task(task_def, root_config, providers.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Team::new(team_id, team_name, tasks, team_def))
    }

    fn build_task(task_def: &Value, root_config: &Value, providers: Arc<Mutex<ProviderManager>>) -> Result<TaskSpec> {
        let agent_type = task_def
            .get("agent_type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::ConfigurationMissing("task has no 'agent_type'".to_string()))?;
        let kind = parse_agent_kind(agent_type)
            .ok_or_else(|| Error::ConfigurationMissing(format!("unknown agent_type '{agent_type}'")))?;

        let task_override = task_def.get("config").cloned().unwrap_or_else(|| json!({}));
        let merged_config = deep_merge(root_config, &task_override);
        let agent = build_agent(kind, merged_config, providers);

        Ok(TaskSpec {
            agent,
            task_config: AgentTaskConfig {
                agent_kind: kind,
                config: task_override,
                task_name: task_def.get("task_name").and_then(Value::as_str).map(str::to_string),
                requires_approval: task_def.get("requires_approval").and_then(Value::as_bool).unwrap_or(false),
                max_retries: task_def.get("max_retries").and_then(Value::as_u64).map(|v| v as u32).unwrap_or(3),
                retry_delay_seconds: task_def.get("retry_delay_seconds").and_then(Value::as_u64).unwrap_or(30),
            },
        })
    }

    /// Normalizes `project_path` to an absolute path, generates a fresh
    /// `wf_<HHMM>_<UUID>` run id, stamps it into a new context alongside
    /// `intent` and the prepared config, ensures `orchestration.enabled`,
    /// and fills in discovery's scanning-helper defaults.
    ///
    /// Returns `(prepared_config, context)` — callers typically pass
    /// `prepared_config` straight into [`Orchestrator::with_providers`] (or
    /// compare it against an already-running orchestrator's config to
    /// trigger a reload) and `context` into [`Orchestrator::execute_workflow`].
    pub fn initialize_workflow(project_path: &str, intent: Value, mut config: Value) -> Result<(Value, Context)> {
        let mut path = PathBuf::from(project_path);
        if !path.is_absolute() {
            let cwd = std::env::current_dir()
                .map_err(|e| Error::InputValidation(format!("cannot resolve cwd: {e}")))?;
            path = cwd.join(path);
        }
        let normalized = path.to_string_lossy().into_owned();

        let run_id = Self::generate_run_id();
        ensure_discovery_defaults(&mut config);
        ensure_orchestration_enabled(&mut config);
        set_project_path(&mut config, &normalized);

        let mut context = Context::new();
        context.set("system.runid", json!(run_id));
        context.set("workflow_run_id", json!(run_id));
        context.set("runtime.workflow.start_time", json!(Utc::now().to_rfc3339()));
        context.set("project_path", json!(normalized));
        context.set("project.path", json!(normalized));
        context.set("intent", intent);
        context.set("config", config.clone());

        info!(run_id = %run_id, project_path = %normalized, "orchestrator.workflow_initialized");
        Ok((config, context))
    }

    /// Runs teams starting at `entry_team` until a team returns no
    /// `next_team`, a team fails, or `max_teams` invocations have run.
    pub async fn execute_workflow(&mut self, entry_team: &str, mut context: Context, max_teams: u32) -> WorkflowResult {
        if let Some(ctx_config) = context.get("config").cloned() {
            if ctx_config != self.config {
                if let Err(err) = self.reload_teams(ctx_config) {
                    warn!(error = %err, "orchestrator.team_reload_failed");
                }
            }
        }

        let run_id = context
            .get_str("workflow_run_id")
            .map(str::to_string)
            .or_else(|| context.get_str("system.runid").map(str::to_string))
            .unwrap_or_else(Self::generate_run_id);
        context.set("workflow_run_id", json!(run_id));
        context.set("system.runid", json!(run_id));

        let mut current = Some(entry_team.to_string());
        let mut execution_path = Vec::new();
        let mut team_results: Vec<TeamResult> = Vec::new();
        let mut teams_executed: u32 = 0;
        let mut status = "success".to_string();
        let mut error: Option<String> = None;

        while let Some(team_id) = current {
            if teams_executed >= max_teams {
                status = "error".to_string();
                error = Some(Error::ExecutionLimit { max_teams }.to_string());
                warn!(run_id = %run_id, max_teams, "orchestrator.max_teams_exceeded");
                break;
            }

            let Some(team) = self.teams.get(&team_id) else {
                status = "error".to_string();
                error = Some(format!("no team registered for id '{team_id}'"));
                warn!(run_id = %run_id, team_id = %team_id, "orchestrator.unknown_team");
                break;
            };

            let result = team.execute(&context).await;
            teams_executed += 1;
            execution_path.push(team_id.clone());

            context.merge_overlay(&result.data);
            if let Some(input_data) = &result.input_data {
                context.merge_overlay(&json!({"input_data": input_data}));
            }

            let next_team = result.next_team.clone();
            let succeeded = result.success;
            if !succeeded {
                status = "error".to_string();
                error = result.error.clone();
            }
            team_results.push(result);

            if !succeeded {
                break;
            }
            current = next_team;
        }

        info!(run_id = %run_id, status = %status, teams_executed, "orchestrator.workflow_completed");

        WorkflowResult {
            status,
            workflow_run_id: run_id,
            execution_path,
            team_results,
            teams_executed,
            data: context.into_value(),
            error,
            timestamp: Utc::now(),
        }
    }

    fn generate_run_id() -> String {
        format!("wf_{}_{}", Utc::now().format("%H%M"), Uuid::new_v4())
    }
}

fn parse_agent_kind(name: &str) -> Option<AgentKind> {
    match name {
        "discovery" => Some(AgentKind::Discovery),
        "solution_designer" => Some(AgentKind::SolutionDesigner),
        "coder" => Some(AgentKind::Coder),
        "assurance" => Some(AgentKind::Assurance),
        "semantic_iterator" => Some(AgentKind::SemanticIterator),
        "semantic_merge" => Some(AgentKind::SemanticMerge),
        "semantic_extract" => Some(AgentKind::SemanticExtract),
        "asset_manager" => Some(AgentKind::AssetManager),
        _ => None,
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().expect("just ensured object")
}

/// Fills `llm_config.agents.discovery.tartxt_config` with a default
/// `input_paths: ["./"]` when absent, matching the original's
/// `_ensure_default_config` step for the discovery agent's scanning
/// helper. `script_path` is carried for schema completeness even though
/// this workspace's discovery agent scans natively rather than shelling
/// out to it.
fn ensure_discovery_defaults(config: &mut Value) {
    let root = ensure_object(config);
    let llm_config = ensure_object(root.entry("llm_config").or_insert_with(|| json!({})));
    let agents = ensure_object(llm_config.entry("agents").or_insert_with(|| json!({})));
    let discovery = ensure_object(agents.entry("discovery").or_insert_with(|| json!({})));
    discovery.entry("tartxt_config").or_insert_with(|| {
        json!({
            "script_path": "c4h_agents/skills/tartxt.py",
            "input_paths": ["./"],
        })
    });
}

fn ensure_orchestration_enabled(config: &mut Value) {
    let root = ensure_object(config);
    let orchestration = ensure_object(root.entry("orchestration").or_insert_with(|| json!({})));
    orchestration.insert("enabled".to_string(), json!(true));
}

fn set_project_path(config: &mut Value, normalized: &str) {
    let root = ensure_object(config);
    let project = ensure_object(root.entry("project").or_insert_with(|| json!({})));
    project.insert("path".to_string(), json!(normalized));
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn generated_run_id_matches_wf_hhmm_uuid_format() {
        let id = Orchestrator::generate_run_id();
        let re = Regex::new(r"^wf_\d{4}_[0-9a-f-]{36}$").unwrap();
        assert!(re.is_match(&id), "run id '{id}' did not match expected format");
    }

    #[test]
    fn initialize_workflow_normalizes_relative_project_path() {
        let (config, context) = Orchestrator::initialize_workflow(
            "some/relative/path",
            json!({"description": "rename Foo to Bar"}),
            json!({}),
        )
        .unwrap();

        let path = context.get_str("project_path").unwrap();
        assert!(PathBuf::from(path).is_absolute());
        assert_eq!(config["project"]["path"], json!(path));
    }

    #[test]
    fn initialize_workflow_ensures_discovery_and_orchestration_defaults() {
        let (config, context) = Orchestrator::initialize_workflow("/tmp/project", json!({}), json!({})).unwrap();
        assert_eq!(config["orchestration"]["enabled"], json!(true));
        assert_eq!(
            config["llm_config"]["agents"]["discovery"]["tartxt_config"]["input_paths"],
            json!(["./"])
        );
        assert!(context.get("system.runid").is_some());
        assert_eq!(context.get("workflow_run_id"), context.get("system.runid"));
    }

    #[test]
    fn initialize_workflow_preserves_existing_discovery_config() {
        let existing = json!({
            "llm_config": {"agents": {"discovery": {"tartxt_config": {"input_paths": ["./src"]}}}}
        });
        let (config, _) = Orchestrator::initialize_workflow("/tmp/project", json!({}), existing).unwrap();
        assert_eq!(
            config["llm_config"]["agents"]["discovery"]["tartxt_config"]["input_paths"],
            json!(["./src"])
        );
    }

    #[tokio::test]
    async fn max_teams_trip_reports_error_status_and_exact_count() {
        // A two-team cycle (A -> B -> A -> ...) using the discovery agent
        // kind for both tasks, since discovery needs no LLM transport.
        let dir = tempfile::tempdir().unwrap();
        let config = json!({
            "project": {"path": dir.path().to_str().unwrap()},
            "orchestration": {
                "teams": {
                    "a": {
                        "name": "A",
                        "tasks": [{"agent_type": "discovery", "task_name": "a"}],
                        "routing": {"default": "b"}
                    },
                    "b": {
                        "name": "B",
                        "tasks": [{"agent_type": "discovery", "task_name": "b"}],
                        "routing": {"default": "a"}
                    }
                }
            }
        });

        let mut orchestrator = Orchestrator::new(config).unwrap();
        let context = Context::from_value(json!({"project_path": dir.path().to_str().unwrap()}));
        let result = orchestrator.execute_workflow("a", context, 4).await;

        assert_eq!(result.status, "error");
        assert_eq!(result.teams_executed, 4);
        assert!(result.error.unwrap().contains("exceeded maximum team limit"));
    }

    #[tokio::test]
    async fn workflow_terminates_when_a_team_reports_no_next_team() {
        let dir = tempfile::tempdir().unwrap();
        let config = json!({
            "project": {"path": dir.path().to_str().unwrap()},
            "orchestration": {
                "teams": {
                    "only": {
                        "name": "Only",
                        "tasks": [{"agent_type": "discovery", "task_name": "only"}],
                        "routing": {}
                    }
                }
            }
        });

        let mut orchestrator = Orchestrator::new(config).unwrap();
        let context = Context::from_value(json!({"project_path": dir.path().to_str().unwrap()}));
        let result = orchestrator.execute_workflow("only", context, DEFAULT_MAX_TEAMS).await;

        assert_eq!(result.status, "success");
        assert_eq!(result.teams_executed, 1);
        assert_eq!(result.execution_path, vec!["only".to_string()]);
    }

    #[tokio::test]
    async fn unknown_entry_team_reports_error_without_executing_anything() {
        let mut orchestrator = Orchestrator::new(json!({
            "orchestration": {"teams": {"a": {"tasks": []}}}
        }))
        .unwrap();
        let result = orchestrator.execute_workflow("missing", Context::new(), DEFAULT_MAX_TEAMS).await;
        assert_eq!(result.status, "error");
        assert_eq!(result.teams_executed, 0);
    }
}
