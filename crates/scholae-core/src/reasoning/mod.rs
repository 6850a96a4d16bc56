//! Read-only reasoning over the concept / paper / author graph.
//!
//! List-shaped operations (analogies, contradictions, gaps, synthesis, communities)
//! return an empty value when the graph is unreachable and log the failure.
//! Lifecycle and influence return `Err` instead, because their empty value is a
//! meaningful answer. The lookup helpers at the bottom return `Result` so callers
//! decide how to degrade.

mod communities;
mod discovery;
mod dynamics;

pub use communities::Community;
pub use discovery::{Analogy, Contradiction, MissingConnection, Novelty, ResearchGaps, SynthesisPath, UnexploredMethod};
pub use dynamics::{CitingPaper, ConceptLifecycle, InfluenceReport, LifecycleStage, YearCount};

use crate::capabilities::{Capabilities, GraphPattern, GraphRecord};
use crate::error::ReasoningResult;
use crate::model::GraphPath;
use serde::{Deserialize, Serialize};

/// Paper hit from a concept lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperHit {
    pub paper_id: String,
    pub title: Option<String>,
    pub year: Option<i64>,
}

impl PaperHit {
    fn from_record(r: &GraphRecord) -> Option<Self> {
        Some(Self {
            paper_id: r.string("paper_id")?,
            title: r.string("title"),
            year: r.i64("year"),
        })
    }
}

/// Paper a researcher has read, per the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadPaper {
    pub paper_id: String,
    pub title: Option<String>,
    pub read_at: Option<String>,
    pub notes: Option<String>,
}

/// Concept reached at a fixed hop distance, with the path that reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistantConcept {
    pub concept: String,
    pub path: Vec<String>,
}

#[derive(Clone)]
pub struct GraphReasoningEngine {
    caps: Capabilities,
}

impl GraphReasoningEngine {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// Runs a pattern, logging and swallowing failure.
    async fn rows_or_empty(&self, operation: &str, pattern: &GraphPattern) -> Vec<GraphRecord> {
        match self.caps.graph(pattern).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(target: "scholae::reasoning", operation, pattern = pattern.name(), error = %e, "graph query failed; returning empty result");
                Vec::new()
            }
        }
    }

    /// Concepts adjacent to both `first` and `second`. Empty on failure.
    pub async fn bridge_concepts(&self, first: &str, second: &str, limit: usize) -> Vec<String> {
        let pattern = GraphPattern::BridgeConcepts {
            first: first.to_string(),
            second: second.to_string(),
            limit,
        };
        self.rows_or_empty("bridge_concepts", &pattern)
            .await
            .iter()
            .filter_map(|r| r.string("concept"))
            .collect()
    }

    pub async fn related_papers(&self, concept: &str, limit: usize) -> ReasoningResult<Vec<PaperHit>> {
        let rows = self
            .caps
            .graph(&GraphPattern::RelatedPapers {
                concept: concept.to_string(),
                limit,
            })
            .await?;
        Ok(rows.iter().filter_map(PaperHit::from_record).collect())
    }

    pub async fn researcher_papers(&self, researcher_id: &str) -> ReasoningResult<Vec<ReadPaper>> {
        let rows = self
            .caps
            .graph(&GraphPattern::ResearcherPapers {
                researcher_id: researcher_id.to_string(),
            })
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(ReadPaper {
                    paper_id: r.string("paper_id")?,
                    title: r.string("title"),
                    read_at: r.string("read_at"),
                    notes: r.string("notes"),
                })
            })
            .collect())
    }

    pub async fn distant_concepts(
        &self,
        concept: &str,
        hops: u32,
        limit: usize,
    ) -> ReasoningResult<Vec<DistantConcept>> {
        let rows = self
            .caps
            .graph(&GraphPattern::ConceptsAtDistance {
                concept: concept.to_string(),
                hops,
                limit,
            })
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(DistantConcept {
                    concept: r.string("distant_concept")?,
                    path: r.strings("path_nodes"),
                })
            })
            .collect())
    }

    /// Shortest paths from `source` to `target`, shortest first.
    pub async fn connections(
        &self,
        source: &str,
        target: &str,
        max_hops: u32,
    ) -> ReasoningResult<Vec<GraphPath>> {
        let rows = self
            .caps
            .graph(&GraphPattern::ShortestPaths {
                source: source.to_string(),
                target: target.to_string(),
                max_hops,
            })
            .await?;
        let mut paths: Vec<GraphPath> = rows
            .iter()
            .map(|r| GraphPath::new(r.strings("nodes"), r.strings("relationships")))
            .filter(|p| !p.nodes.is_empty())
            .collect();
        paths.sort_by_key(|p| p.path_length);
        Ok(paths)
    }
}
