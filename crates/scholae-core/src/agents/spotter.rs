//! Phase 2: concept co-occurrence across scouted papers, plus one contradiction probe.

use super::{AgentRole, ResearchAgent};
use crate::error::ReasoningResult;
use crate::memory::ResearchMemory;
use crate::reasoning::{Contradiction, GraphReasoningEngine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

const MIN_CO_OCCURRENCE: usize = 2;
const INSIGHT_TOP: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    ConceptCoOccurrence {
        concept1: String,
        concept2: String,
        frequency: usize,
        pattern_strength: f64,
        insight: String,
    },
    Contradiction {
        details: Contradiction,
        insight: String,
    },
}

/// Unordered concept pairs counted once per paper, keyed in sorted order.
pub(crate) fn co_occurrences(per_paper: &[Vec<String>]) -> BTreeMap<(String, String), usize> {
    let mut pairs = BTreeMap::new();
    for concepts in per_paper {
        let distinct: Vec<&String> = concepts.iter().collect::<BTreeSet<_>>().into_iter().collect();
        for (i, a) in distinct.iter().enumerate() {
            for b in &distinct[i + 1..] {
                *pairs.entry(((*a).clone(), (*b).clone())).or_insert(0) += 1;
            }
        }
    }
    pairs
}

#[derive(Clone)]
pub struct PatternSpotter {
    pub agent: ResearchAgent,
    memory: ResearchMemory,
    reasoning: GraphReasoningEngine,
}

impl PatternSpotter {
    pub fn new(memory: ResearchMemory, reasoning: GraphReasoningEngine) -> Self {
        Self {
            agent: ResearchAgent::new(
                "spotter_001",
                AgentRole::PatternSpotter,
                &[("analytical_depth", 0.9), ("pattern_recognition", 0.95), ("creativity", 0.6)],
                memory.clone(),
            ),
            memory,
            reasoning,
        }
    }

    pub async fn spot(&self, researcher_id: &str, paper_ids: &[String]) -> ReasoningResult<Vec<Pattern>> {
        tracing::info!(target: "scholae::agents", agent_id = %self.agent.agent_id, papers = paper_ids.len(), "spotting patterns");
        let mut per_paper: Vec<Vec<String>> = Vec::with_capacity(paper_ids.len());
        for pid in paper_ids {
            let latest = self
                .memory
                .recall_paper_memories(researcher_id, Some(pid), 1)
                .await?;
            per_paper.push(latest.into_iter().next().map(|m| m.content.key_concepts).unwrap_or_default());
        }

        let mut patterns: Vec<Pattern> = co_occurrences(&per_paper)
            .into_iter()
            .filter(|(_, n)| *n >= MIN_CO_OCCURRENCE)
            .map(|((c1, c2), n)| Pattern::ConceptCoOccurrence {
                insight: format!("{c1} and {c2} frequently appear together"),
                pattern_strength: n as f64 / paper_ids.len() as f64,
                frequency: n,
                concept1: c1,
                concept2: c2,
            })
            .collect();

        // One representative probe on the first paper's lead concept.
        if let Some(probe) = per_paper.first().and_then(|c| c.first()) {
            if let Some(details) = self.reasoning.contradictions(probe).await.into_iter().next() {
                patterns.push(Pattern::Contradiction {
                    details,
                    insight: "Conflicting findings detected".to_string(),
                });
            }
        }

        self.agent
            .store_insight(
                researcher_id,
                json!({
                    "action": "pattern_spotting",
                    "papers_analyzed": paper_ids.len(),
                    "patterns_found": patterns.len(),
                    "top_patterns": patterns.iter().take(INSIGHT_TOP).collect::<Vec<_>>(),
                }),
            )
            .await?;
        Ok(patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pairs_are_order_insensitive() {
        let pairs = co_occurrences(&[v(&["b", "a"]), v(&["a", "b", "c"])]);
        assert_eq!(pairs.get(&("a".into(), "b".into())), Some(&2));
        assert_eq!(pairs.get(&("a".into(), "c".into())), Some(&1));
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn repeated_concept_is_not_a_pair() {
        assert!(co_occurrences(&[v(&["a", "a"])]).is_empty());
    }

    #[test]
    fn duplicate_concepts_count_once_per_paper() {
        let pairs = co_occurrences(&[v(&["a", "b", "a"])]);
        assert_eq!(pairs.get(&("a".into(), "b".into())), Some(&1));
        assert_eq!(pairs.len(), 1);

        let pairs = co_occurrences(&[v(&["b", "a", "b", "a"]), v(&["a", "b"])]);
        assert_eq!(pairs.get(&("a".into(), "b".into())), Some(&2));
    }
}
