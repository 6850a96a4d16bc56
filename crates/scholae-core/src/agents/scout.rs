//! Phase 1: candidate papers on a topic that the researcher has not read yet.

use super::{AgentRole, ResearchAgent};
use crate::error::ReasoningResult;
use crate::memory::ResearchMemory;
use crate::reasoning::GraphReasoningEngine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

const CANDIDATE_LIMIT: usize = 20;
const CANDIDATES_CONSIDERED: usize = 10;
const INSIGHT_TOP: usize = 5;
// Placeholder scores until a ranking model exists.
const RELEVANCE: f64 = 0.8;
const NOVELTY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutedPaper {
    pub paper_id: String,
    pub title: Option<String>,
    pub relevance_score: f64,
    pub novelty_score: f64,
    pub scout_reasoning: String,
}

#[derive(Clone)]
pub struct LiteratureScout {
    pub agent: ResearchAgent,
    reasoning: GraphReasoningEngine,
}

impl LiteratureScout {
    pub fn new(memory: ResearchMemory, reasoning: GraphReasoningEngine) -> Self {
        Self {
            agent: ResearchAgent::new(
                "scout_001",
                AgentRole::LiteratureScout,
                &[("curiosity", 0.9), ("thoroughness", 0.8), ("risk_tolerance", 0.6)],
                memory,
            ),
            reasoning,
        }
    }

    pub async fn scout(&self, researcher_id: &str, topic: &str) -> ReasoningResult<Vec<ScoutedPaper>> {
        tracing::info!(target: "scholae::agents", agent_id = %self.agent.agent_id, topic, "scouting papers");
        let read: HashSet<String> = self
            .reasoning
            .researcher_papers(researcher_id)
            .await?
            .into_iter()
            .map(|p| p.paper_id)
            .collect();
        let candidates = self.reasoning.related_papers(topic, CANDIDATE_LIMIT).await?;

        let found: Vec<ScoutedPaper> = candidates
            .into_iter()
            .take(CANDIDATES_CONSIDERED)
            .filter(|p| !read.contains(&p.paper_id))
            .map(|p| ScoutedPaper {
                paper_id: p.paper_id,
                title: p.title,
                relevance_score: RELEVANCE,
                novelty_score: NOVELTY,
                scout_reasoning: "Emerging paper in your research area".to_string(),
            })
            .collect();

        self.agent
            .store_insight(
                researcher_id,
                json!({
                    "action": "paper_scouting",
                    "topic": topic,
                    "papers_found": found.len(),
                    "recommendations": found.iter().take(INSIGHT_TOP).collect::<Vec<_>>(),
                }),
            )
            .await?;
        Ok(found)
    }
}
