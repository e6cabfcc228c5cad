//! ABOUTME: Team routing, workflow orchestration, and lineage replay — the
//! ABOUTME: layer that chains agents into a code-refactoring workflow

pub mod orchestrator;
pub mod replay;
pub mod team;

pub use orchestrator::{Orchestrator, WorkflowResult, DEFAULT_MAX_TEAMS};
pub use replay::{run_workflow_from_lineage, run_workflow_from_lineage_with, team_id_for_stage};
pub use team::{RoutingRule, Team, TaskSpec, TeamResult};
