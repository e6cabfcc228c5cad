//! ABOUTME: Concrete pipeline agents, named-interface stubs, and the Task Wrapper
//! ABOUTME: built on forgeflow-core's Agent trait and forgeflow-providers' continuation engine

pub mod assurance;
pub mod coder;
pub mod config;
pub mod discovery;
pub mod registry;
pub mod runtime;
pub mod solution_designer;
pub mod stubs;
pub mod task;

pub use assurance::{AssuranceAgent, StubTestRunner, TestRunner};
pub use coder::{ChangeApplier, CoderAgent, StubChangeApplier};
pub use discovery::DiscoveryAgent;
pub use registry::build_agent;
pub use runtime::{AgentMetrics, LlmAgentRuntime};
pub use solution_designer::SolutionDesignerAgent;
pub use stubs::{AssetManagerAgent, SemanticExtractAgent, SemanticIteratorAgent, SemanticMergeAgent};
pub use task::{run_agent_task, TaskResult};
