//! Specialized research agents and the four-phase collaboration pipeline.
//!
//! Each agent writes an `agent_insight` memory into the researcher's namespace after
//! its phase, so later phases (and later sessions) can read what earlier ones found.

mod generator;
mod orchestrator;
mod scout;
mod spotter;

pub use generator::{DraftedHypothesis, Hypothesis, HypothesisBasis, HypothesisDrafter, HypothesisGenerator};
pub use orchestrator::{
    collaboration_score, debate, AgentSummaries, CollaborationOutcome, MultiAgentOrchestrator, Phase,
    PhaseFailure, RefinedHypothesis,
};
pub use scout::{LiteratureScout, ScoutedPaper};
pub use spotter::{Pattern, PatternSpotter};

use crate::error::ReasoningResult;
use crate::memory::ResearchMemory;
use crate::model::MemoryKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    LiteratureScout,
    PatternSpotter,
    HypothesisGenerator,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::LiteratureScout => "literature_scout",
            AgentRole::PatternSpotter => "pattern_spotter",
            AgentRole::HypothesisGenerator => "hypothesis_generator",
        }
    }
}

/// One insight written by an agent, as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInsight {
    pub agent_id: String,
    pub agent_role: String,
    pub timestamp: Option<String>,
    pub insight: Value,
}

/// Identity and shared-memory access common to every agent.
#[derive(Clone)]
pub struct ResearchAgent {
    pub agent_id: String,
    pub role: AgentRole,
    /// Trait name → weight in [0, 1]. Descriptive only.
    pub personality: Vec<(String, f64)>,
    memory: ResearchMemory,
}

impl ResearchAgent {
    pub fn new(
        agent_id: impl Into<String>,
        role: AgentRole,
        personality: &[(&str, f64)],
        memory: ResearchMemory,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            personality: personality.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            memory,
        }
    }

    /// Appends an insight to the researcher's namespace.
    pub async fn store_insight(&self, researcher_id: &str, insight: Value) -> ReasoningResult<String> {
        let payload = json!({
            "agent_id": self.agent_id,
            "agent_role": self.role.as_str(),
            "insight": insight,
        });
        let id = self
            .memory
            .store_project_record(researcher_id, MemoryKind::AgentInsight, "agent", payload)
            .await?;
        tracing::debug!(target: "scholae::agents", agent_id = %self.agent_id, researcher_id, memory_id = %id, "insight stored");
        Ok(id)
    }

    /// Insights found by text search for this role, most relevant first.
    pub async fn retrieve_insights(&self, researcher_id: &str, limit: usize) -> ReasoningResult<Vec<AgentInsight>> {
        let query = format!("{} {}", MemoryKind::AgentInsight.as_str(), self.role.as_str());
        let memories = self.memory.search_memories(researcher_id, &query, limit).await?;
        Ok(memories
            .into_iter()
            .filter(|m| m.content.kind == MemoryKind::AgentInsight)
            .filter_map(|m| {
                let payload = m.content.payload?;
                Some(AgentInsight {
                    agent_id: payload.get("agent_id")?.as_str()?.to_string(),
                    agent_role: payload.get("agent_role")?.as_str()?.to_string(),
                    timestamp: m.content.timestamp,
                    insight: payload.get("insight").cloned().unwrap_or(Value::Null),
                })
            })
            .collect())
    }
}
