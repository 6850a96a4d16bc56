//! Analogies, contradiction candidates, research gaps and synthesis paths.

use super::GraphReasoningEngine;
use crate::capabilities::GraphPattern;
use crate::model::PaperRef;
use serde::{Deserialize, Serialize};

const METHODOLOGICAL_TRANSFER: f64 = 0.8;
const CONCEPTUAL_TRANSFER: f64 = 0.6;
const CONTRADICTION_LIMIT: usize = 10;
const CONTRADICTION_CONFIDENCE: f64 = 0.6;
/// Co-occurrence below this many papers counts as a missing connection.
const SPARSE_BELOW: u64 = 3;
const MISSING_CONNECTION_LIMIT: usize = 10;
const UNAPPLIED_METHOD_LIMIT: usize = 5;
const EXISTING_SYNTHESIS_LIMIT: usize = 10;
const METHOD_SYNTHESIS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Analogy {
    /// A methodology used by papers in both domains.
    Methodological {
        shared_method: String,
        source_examples: Vec<String>,
        target_examples: Vec<String>,
        insight: String,
        transferability_score: f64,
    },
    /// A concept adjacent to both domains.
    Conceptual {
        bridge_concept: String,
        insight: String,
        transferability_score: f64,
    },
}

impl Analogy {
    pub fn transferability_score(&self) -> f64 {
        match self {
            Analogy::Methodological { transferability_score, .. }
            | Analogy::Conceptual { transferability_score, .. } => *transferability_score,
        }
    }
}

/// Two papers on the same concept where one cites the other.
///
/// Only the citation structure is checked; whether the claims actually disagree
/// is left to a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub paper1: PaperRef,
    pub paper2: PaperRef,
    pub confidence: f64,
    pub requires_investigation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingConnection {
    pub concept: String,
    pub current_papers: u64,
    pub opportunity_score: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnexploredMethod {
    pub method: String,
    pub status: String,
    pub potential: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchGaps {
    pub missing_connections: Vec<MissingConnection>,
    pub under_explored_methods: Vec<UnexploredMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Novelty {
    Low,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SynthesisPath {
    /// A paper already combining every concept.
    ExistingSynthesis {
        paper_id: String,
        title: Option<String>,
        year: Option<i64>,
        concepts_combined: Vec<String>,
        novelty: Novelty,
    },
    /// A methodology applied to at least two of the concepts.
    MethodologicalSynthesis {
        shared_method: String,
        concepts_covered: Vec<String>,
        novelty: Novelty,
        recommendation: String,
    },
}

impl GraphReasoningEngine {
    /// Methodological analogies between two domains, falling back to bridge concepts.
    pub async fn analogies(&self, source: &str, target: &str, max: usize) -> Vec<Analogy> {
        tracing::info!(target: "scholae::reasoning", source, target, max, "finding analogies");
        if max == 0 {
            return Vec::new();
        }
        let pattern = GraphPattern::SharedMethodology {
            source: source.to_string(),
            target: target.to_string(),
            limit: max,
        };
        let methodological: Vec<Analogy> = self
            .rows_or_empty("analogies", &pattern)
            .await
            .iter()
            .filter_map(|r| {
                let method = r.string("method")?;
                Some(Analogy::Methodological {
                    insight: format!("Method '{method}' successfully used in both domains"),
                    source_examples: r.strings("source_papers"),
                    target_examples: r.strings("target_papers"),
                    shared_method: method,
                    transferability_score: METHODOLOGICAL_TRANSFER,
                })
            })
            .take(max)
            .collect();
        if !methodological.is_empty() {
            return methodological;
        }

        self.bridge_concepts(source, target, max)
            .await
            .into_iter()
            .take(max)
            .map(|bridge| Analogy::Conceptual {
                insight: format!("Concept '{bridge}' connects both domains"),
                bridge_concept: bridge,
                transferability_score: CONCEPTUAL_TRANSFER,
            })
            .collect()
    }

    /// Citation-linked paper pairs on `concept`, flagged for investigation.
    pub async fn contradictions(&self, concept: &str) -> Vec<Contradiction> {
        tracing::info!(target: "scholae::reasoning", concept, "detecting contradiction candidates");
        let pattern = GraphPattern::CitingPairs {
            concept: concept.to_string(),
            limit: CONTRADICTION_LIMIT,
        };
        self.rows_or_empty("contradictions", &pattern)
            .await
            .iter()
            .filter_map(|r| {
                Some(Contradiction {
                    paper1: PaperRef {
                        id: r.string("citing_paper")?,
                        title: r.string("citing_title"),
                    },
                    paper2: PaperRef {
                        id: r.string("cited_paper")?,
                        title: r.string("cited_title"),
                    },
                    confidence: CONTRADICTION_CONFIDENCE,
                    requires_investigation: true,
                })
            })
            .collect()
    }

    /// Sparse co-occurrences and methodologies never applied to `area`.
    pub async fn research_gaps(&self, area: &str) -> ResearchGaps {
        tracing::info!(target: "scholae::reasoning", area, "analyzing research gaps");
        let sparse = GraphPattern::SparseCoOccurrence {
            concept: area.to_string(),
            below: SPARSE_BELOW,
            limit: MISSING_CONNECTION_LIMIT,
        };
        let mut missing_connections: Vec<MissingConnection> = self
            .rows_or_empty("research_gaps", &sparse)
            .await
            .iter()
            .filter_map(|r| {
                let concept = r.string("concept")?;
                let count = r.u64("paper_count").unwrap_or(0);
                if count >= SPARSE_BELOW {
                    return None;
                }
                Some(MissingConnection {
                    recommendation: format!("Explore connections between {area} and {concept}"),
                    concept,
                    current_papers: count,
                    opportunity_score: 1.0 - count as f64 / 10.0,
                })
            })
            .collect();
        missing_connections.sort_by_key(|m| m.current_papers);
        missing_connections.truncate(MISSING_CONNECTION_LIMIT);

        let unapplied = GraphPattern::UnappliedMethodologies {
            concept: area.to_string(),
            limit: UNAPPLIED_METHOD_LIMIT,
        };
        let under_explored_methods = self
            .rows_or_empty("research_gaps", &unapplied)
            .await
            .iter()
            .filter_map(|r| r.string("method"))
            .take(UNAPPLIED_METHOD_LIMIT)
            .map(|method| UnexploredMethod {
                recommendation: format!("Apply {method} to {area}"),
                method,
                status: "not_applied".to_string(),
                potential: "high".to_string(),
            })
            .collect();

        ResearchGaps {
            missing_connections,
            under_explored_methods,
        }
    }

    /// Papers already combining all `concepts`; if none, methodologies covering
    /// at least two of them. Fewer than two distinct concepts yields nothing.
    pub async fn synthesis_paths(&self, concepts: &[String]) -> Vec<SynthesisPath> {
        let mut distinct: Vec<String> = Vec::new();
        for c in concepts.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if !distinct.iter().any(|d| d == c) {
                distinct.push(c.to_string());
            }
        }
        if distinct.len() < 2 {
            return Vec::new();
        }
        tracing::info!(target: "scholae::reasoning", concepts = ?distinct, "finding synthesis paths");

        let covering = GraphPattern::PapersCoveringAll {
            concepts: distinct.clone(),
            limit: EXISTING_SYNTHESIS_LIMIT,
        };
        let existing: Vec<SynthesisPath> = self
            .rows_or_empty("synthesis_paths", &covering)
            .await
            .iter()
            .filter_map(|r| {
                Some(SynthesisPath::ExistingSynthesis {
                    paper_id: r.string("paper_id")?,
                    title: r.string("title"),
                    year: r.i64("year"),
                    concepts_combined: distinct.clone(),
                    novelty: Novelty::Low,
                })
            })
            .collect();
        if !existing.is_empty() {
            return existing;
        }

        let coverage = GraphPattern::MethodologyCoverage {
            concepts: distinct.clone(),
            min_coverage: 2,
            limit: METHOD_SYNTHESIS_LIMIT,
        };
        let joined = distinct.join(", ");
        let mut rows: Vec<(String, Vec<String>)> = self
            .rows_or_empty("synthesis_paths", &coverage)
            .await
            .iter()
            .filter_map(|r| Some((r.string("method")?, r.strings("covered_concepts"))))
            .filter(|(_, covered)| covered.len() >= 2)
            .collect();
        rows.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        rows.into_iter()
            .take(METHOD_SYNTHESIS_LIMIT)
            .map(|(method, covered)| SynthesisPath::MethodologicalSynthesis {
                recommendation: format!("Apply {method} to synthesize {joined}"),
                shared_method: method,
                concepts_covered: covered,
                novelty: Novelty::Medium,
            })
            .collect()
    }
}
