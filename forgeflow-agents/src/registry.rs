//! ABOUTME: Resolves an AgentKind + config into a constructed Agent trait object
//! ABOUTME: the one place that knows how to wire every concrete agent and its stubs

use crate::assurance::{AssuranceAgent, StubTestRunner};
use crate::coder::{CoderAgent, StubChangeApplier};
use crate::discovery::DiscoveryAgent;
use crate::solution_designer::SolutionDesignerAgent;
use crate::stubs::{AssetManagerAgent, SemanticExtractAgent, SemanticIteratorAgent, SemanticMergeAgent};
use forgeflow_core::{Agent, AgentKind};
use forgeflow_providers::ProviderManager;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Builds the concrete agent for `kind`, resolved against `config`. The
/// four skill-backed kinds construct their named-interface stub; `Coder`
/// and `Assurance` get the stub `ChangeApplier`/`TestRunner`
/// implementations since this workspace ships no real filesystem or test
/// execution backend (see DESIGN.md's open-question resolution).
pub fn build_agent(kind: AgentKind, config: Value, providers: Arc<Mutex<ProviderManager>>) -> Arc<dyn Agent> {
    match kind {
        AgentKind::Discovery => Arc::new(DiscoveryAgent::new(&config)),
        AgentKind::SolutionDesigner => Arc::new(SolutionDesignerAgent::new(config, providers)),
        AgentKind::Coder => Arc::new(CoderAgent::new(config, providers, Arc::new(StubChangeApplier))),
        AgentKind::Assurance => Arc::new(AssuranceAgent::new(config, providers, Arc::new(StubTestRunner))),
        AgentKind::SemanticIterator => Arc::new(SemanticIteratorAgent),
        AgentKind::SemanticMerge => Arc::new(SemanticMergeAgent),
        AgentKind::SemanticExtract => Arc::new(SemanticExtractAgent),
        AgentKind::AssetManager => Arc::new(AssetManagerAgent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_an_agent_for_every_kind() {
        let providers = Arc::new(Mutex::new(ProviderManager::new()));
        for kind in [
            AgentKind::Discovery,
            AgentKind::SolutionDesigner,
            AgentKind::Coder,
            AgentKind::Assurance,
            AgentKind::SemanticIterator,
            AgentKind::SemanticMerge,
            AgentKind::SemanticExtract,
            AgentKind::AssetManager,
        ] {
            let agent = build_agent(kind, json!({}), providers.clone());
            assert_eq!(agent.agent_name(), kind.name());
        }
    }
}
