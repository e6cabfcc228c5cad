//! ABOUTME: Team — ordered task execution plus routing-rule evaluation
//! ABOUTME: the unit the Orchestrator chains to build a workflow
//!
//! Grounded on `c4h_services/src/orchestration/team.py::Team` in full:
//! per-task context extension (`team_id`/`team_name`/`task_index`), the
//! `stop_on_failure` early break, routing rule evaluation in declaration
//! order falling back to a default, and the two special-cased
//! `input_data` shapes for `discovery`→`solution` and `solution`→`coder`.

use forgeflow_agents::{run_agent_task, TaskResult};
use forgeflow_core::{Agent, AgentTaskConfig, Context};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// One routing rule: if `condition` evaluates true against this round's
/// task results, route to `next_team` (terminal if `None`).
#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub condition: String,
    pub next_team: Option<String>,
}

/// A task bound to its resolved config, ready for the Task Wrapper.
pub struct TaskSpec {
    pub agent: Arc<dyn Agent>,
    pub task_config: AgentTaskConfig,
}

/// The result of executing one team: aggregated task data, the routing
/// decision, and (for well-known transitions) a reshaped `input_data`
/// payload for the next team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamResult {
    pub team_id: String,
    pub success: bool,
    pub data: Value,
    pub input_data: Option<Value>,
    pub next_team: Option<String>,
    pub error: Option<String>,
}

pub struct Team {
    team_id: String,
    team_name: String,
    tasks: Vec<TaskSpec>,
    stop_on_failure: bool,
    routing_rules: Vec<RoutingRule>,
    routing_default: Option<String>,
}

impl Team {
    /// The team id this team was constructed with — used by the
    /// Orchestrator to key its `HashMap<String, Team>` and to look up the
    /// next team after a routing decision.
    pub fn id(&self) -> &str {
        &self.team_id
    }

    /// `team_config` is the team's own config block (`{routing, stop_on_failure}`),
    /// not the full workflow config — matches `Team.__init__`'s `config` argument.
    pub fn new(team_id: impl Into<String>, team_name: impl Into<String>, tasks: Vec<TaskSpec>, team_config: &Value) -> Self {
        let routing = team_config.get("routing");
        let routing_rules = routing
            .and_then(|r| r.get("rules"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|rule| {
                        let condition = rule.get("condition")?.as_str()?.to_string();
                        let next_team = rule.get("next_team").and_then(Value::as_str).map(str::to_string);
                        Some(RoutingRule { condition, next_team })
                    })
                    .collect()
            })
            .unwrap_or_default();
        let routing_default = routing
            .and_then(|r| r.get("default"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let stop_on_failure = team_config.get("stop_on_failure").and_then(Value::as_bool).unwrap_or(true);

        Self {
            team_id: team_id.into(),
            team_name: team_name.into(),
            tasks,
            stop_on_failure,
            routing_rules,
            routing_default,
        }
    }

    pub async fn execute(&self, context: &Context) -> TeamResult {
        info!(team_id = %self.team_id, name = %self.team_name, "team.execution_starting");

        let mut results: Vec<TaskResult> = Vec::new();
        let mut success = true;
        let mut error = None;

        for (i, task_spec) in self.tasks.iter().enumerate() {
            info!(
                team_id = %self.team_id,
                task_name = task_spec.task_config.task_name.as_deref().unwrap_or(""),
                task_index = i,
                "team.task_executing"
            );

            let mut task_context = context.clone();
            task_context.set("team_id", json!(self.team_id));
            task_context.set("team_name", json!(self.team_name));
            task_context.set("task_index", json!(i as i64));

            let result = run_agent_task(task_spec.agent.as_ref(), &task_spec.task_config, &task_context).await;
            let failed = !result.success;
            results.push(result);

            if failed && self.stop_on_failure {
                warn!(team_id = %self.team_id, task_index = i, "team.task_failed_stopping_sequence");
                success = false;
                error = results.last().and_then(|r| r.error.clone());
                break;
            }
        }

        // `next_team` and `data` are computed unconditionally, matching
        // `Team.execute` — a failing team still reports what it *would*
        // have routed to and handed off; the Orchestrator is the one that
        // ignores both on failure and aborts the workflow.
        let next_team = self.determine_next_team(&results);

        let mut team_data = Map::new();
        for result in &results {
            if result.success {
                if let Value::Object(map) = &result.result_data {
                    for (k, v) in map {
                        team_data.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        let data = Value::Object(team_data);
        let input_data = self.shape_input_data(&data, context, next_team.as_deref());

        info!(team_id = %self.team_id, success, next_team = ?next_team, "team.execution_completed");

        TeamResult {
            team_id: self.team_id.clone(),
            success,
            data,
            input_data,
            next_team,
            error,
        }
    }

    fn determine_next_team(&self, results: &[TaskResult]) -> Option<String> {
        for rule in &self.routing_rules {
            if self.evaluate_condition(&rule.condition, results) {
                return rule.next_team.clone();
            }
        }
        self.routing_default.clone()
    }

    fn evaluate_condition(&self, condition: &str, results: &[TaskResult]) -> bool {
        match condition {
            "all_success" => results.iter().all(|r| r.success),
            "any_success" => results.iter().any(|r| r.success),
            "all_failure" => results.iter().all(|r| !r.success),
            "any_failure" => results.iter().any(|r| !r.success),
            other => {
                warn!(team_id = %self.team_id, condition = other, "team.unknown_condition_evaluates_false");
                false
            }
        }
    }

    /// Reshapes `team_data` into the `input_data` payload the next team's
    /// agents expect. Only the two hand-offs the source special-cases get
    /// a shape; every other transition carries no `input_data` (the next
    /// team's agent reads straight from `data` merged into context).
    fn shape_input_data(&self, team_data: &Value, context: &Context, next_team: Option<&str>) -> Option<Value> {
        match (self.team_id.as_str(), next_team) {
            ("discovery", Some("solution")) => Some(json!({
                "discovery_data": team_data,
                "intent": context.get("intent").cloned().unwrap_or(Value::Null),
                "project": context.get("project").cloned().unwrap_or(Value::Null),
            })),
            ("solution", Some("coder")) => Some(team_data.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forgeflow_core::{AgentKind, AgentResponse};
    use std::collections::HashMap;

    struct StaticAgent {
        name: &'static str,
        success: bool,
    }

    #[async_trait]
    impl Agent for StaticAgent {
        fn agent_name(&self) -> &str {
            self.name
        }

        fn system_prompt(&self) -> String {
            String::new()
        }

        async fn process(&self, _context: &Context) -> AgentResponse {
            if self.success {
                let mut data = HashMap::new();
                data.insert("marker".to_string(), json!(self.name));
                AgentResponse::success(data, None)
            } else {
                AgentResponse::failure("boom", None)
            }
        }
    }

    fn task(agent: Arc<dyn Agent>) -> TaskSpec {
        TaskSpec {
            agent,
            task_config: AgentTaskConfig {
                agent_kind: AgentKind::Discovery,
                config: json!({}),
                task_name: Some("t".to_string()),
                requires_approval: false,
                max_retries: 1,
                retry_delay_seconds: 0,
            },
        }
    }

    #[tokio::test]
    async fn aggregates_result_data_from_successful_tasks() {
        let team = Team::new(
            "discovery",
            "Discovery Team",
            vec![task(Arc::new(StaticAgent { name: "discovery", success: true }))],
            &json!({"routing": {"default": "solution"}}),
        );
        let result = team.execute(&Context::new()).await;
        assert!(result.success);
        assert_eq!(result.data.get("marker"), Some(&json!("discovery")));
        assert_eq!(result.next_team.as_deref(), Some("solution"));
    }

    #[tokio::test]
    async fn stop_on_failure_halts_remaining_tasks() {
        let team = Team::new(
            "coder",
            "Coder Team",
            vec![
                task(Arc::new(StaticAgent { name: "a", success: false })),
                task(Arc::new(StaticAgent { name: "b", success: true })),
            ],
            &json!({"stop_on_failure": true, "routing": {"default": "next"}}),
        );
        let result = team.execute(&Context::new()).await;
        assert!(!result.success);
        assert!(result.data.get("marker").is_none());
        // next_team is still computed from routing even though the team
        // failed — the Orchestrator is what ignores it on failure.
        assert_eq!(result.next_team.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn routing_rule_matches_before_default() {
        // stop_on_failure=false means a failed task doesn't flip `success`
        // to false, matching Team.execute's literal behavior: only a
        // stop_on_failure-triggered break marks the team as failed.
        let team = Team::new(
            "a",
            "A",
            vec![task(Arc::new(StaticAgent { name: "a", success: false }))],
            &json!({
                "stop_on_failure": false,
                "routing": {"rules": [{"condition": "any_failure", "next_team": null}], "default": "b"}
            }),
        );
        let result = team.execute(&Context::new()).await;
        assert!(result.success);
        assert!(result.next_team.is_none());
    }

    #[tokio::test]
    async fn discovery_to_solution_shapes_input_data() {
        let team = Team::new(
            "discovery",
            "Discovery Team",
            vec![task(Arc::new(StaticAgent { name: "discovery", success: true }))],
            &json!({"routing": {"default": "solution"}}),
        );
        let ctx = Context::from_value(json!({"intent": {"description": "rename Foo to Bar"}}));
        let result = team.execute(&ctx).await;
        let input_data = result.input_data.unwrap();
        assert_eq!(input_data["intent"]["description"], json!("rename Foo to Bar"));
        assert_eq!(input_data["discovery_data"]["marker"], json!("discovery"));
    }

    #[tokio::test]
    async fn solution_to_coder_passes_data_through_flat() {
        let team = Team::new(
            "solution",
            "Solution Design Team",
            vec![task(Arc::new(StaticAgent { name: "solution_designer", success: true }))],
            &json!({"routing": {"default": "coder"}}),
        );
        let result = team.execute(&Context::new()).await;
        let input_data = result.input_data.unwrap();
        assert_eq!(input_data["marker"], json!("solution_designer"));
    }

    #[test]
    fn unknown_condition_evaluates_false() {
        let team = Team::new("t", "T", vec![], &json!({}));
        assert!(!team.evaluate_condition("nonsense", &[]));
    }
}
