//! Memory consolidation: grouping, cross-referencing, strength classification,
//! concept evolution and health reporting.
//!
//! Every pass reads memories, derives immutable groupings from them and returns a
//! report. Weak memories are only flagged; nothing is deleted.

use super::service::ResearchMemory;
use super::strength::{strength, Mastery};
use crate::capabilities::{Capabilities, GraphPattern};
use crate::config::ConsolidationConfig;
use crate::error::{ReasoningError, ReasoningResult};
use crate::model::{Memory, MemoryKind};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};

const TOP_SUMMARY_CONCEPTS: usize = 5;
const TOP_REPORT_CONCEPTS: usize = 10;
const EVOLUTION_SEARCH_LIMIT: usize = 50;
const EVOLUTION_CONTEXT_CHARS: usize = 200;
const EMERGING_LIMIT: usize = 10;
const REPORT_GAPS: usize = 5;

/// One memory inside a concept group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub memory_id: String,
    pub paper_id: Option<String>,
    pub strength: f64,
}

/// Memories sharing one concept, strongest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptGroup {
    pub concept: String,
    pub members: Vec<GroupMember>,
}

impl ConceptGroup {
    fn papers(&self) -> HashSet<&str> {
        self.members
            .iter()
            .filter_map(|m| m.paper_id.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    pub concept1: String,
    pub concept2: String,
    pub shared_paper_count: usize,
    /// Shared papers over the smaller group's paper count.
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptCount {
    pub concept: String,
    pub frequency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub researcher_id: String,
    pub window_days: u32,
    pub total_memories: usize,
    /// Memories whose timestamp falls inside the window.
    pub recent_memories: usize,
    pub strong_memories: usize,
    pub weak_memories: usize,
    /// Ids of weak memories; advisory only.
    pub flagged_for_review: Vec<String>,
    pub concept_groups: usize,
    pub cross_references: usize,
    pub top_concepts: Vec<ConceptCount>,
    pub consolidation_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_memory_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEntry {
    pub timestamp: Option<String>,
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub concept: String,
    pub first_encountered: Option<String>,
    pub total_exposures: usize,
    pub evolution_score: f64,
    pub timeline: Vec<EvolutionEntry>,
    pub mastery_level: Mastery,
}

/// Emerging concept the researcher has no memory of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryGap {
    pub concept: String,
    pub importance: u64,
    pub reason: String,
    pub recommended_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHealthReport {
    pub researcher_id: String,
    pub total_memories: usize,
    pub average_memory_strength: f64,
    pub strong_memories: usize,
    pub weak_memories: usize,
    pub unique_concepts: usize,
    pub top_concepts: Vec<ConceptCount>,
    pub knowledge_gaps: Vec<MemoryGap>,
    pub recommendations: Vec<String>,
}

// -----------------------------------------------------------------------------
// Pure passes
// -----------------------------------------------------------------------------

/// Mastery from exposure count: ≥10 expert, ≥5 proficient, ≥2 familiar.
pub fn mastery_level(exposures: usize) -> Mastery {
    match exposures {
        n if n >= 10 => Mastery::Expert,
        n if n >= 5 => Mastery::Proficient,
        n if n >= 2 => Mastery::Familiar,
        _ => Mastery::Novice,
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Pairs each memory with its strength, strongest first. Ties keep input order.
pub fn rank_by_strength(memories: &[Memory], now: DateTime<Utc>) -> Vec<(&Memory, f64)> {
    let mut ranked: Vec<(&Memory, f64)> = memories.iter().map(|m| (m, strength(m, now))).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Groups ranked memories by concept. Groups appear in first-seen order.
pub fn group_by_concept(ranked: &[(&Memory, f64)]) -> Vec<ConceptGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<ConceptGroup> = Vec::new();
    for (memory, s) in ranked {
        let mut seen_here: HashSet<&str> = HashSet::new();
        for concept in memory.concepts() {
            if !seen_here.insert(concept.as_str()) {
                continue;
            }
            let member = GroupMember {
                memory_id: memory.id.clone(),
                paper_id: memory.content.paper_id.clone(),
                strength: *s,
            };
            match index.get(concept.as_str()) {
                Some(&i) => groups[i].members.push(member),
                None => {
                    index.insert(concept.as_str(), groups.len());
                    groups.push(ConceptGroup {
                        concept: concept.clone(),
                        members: vec![member],
                    });
                }
            }
        }
    }
    groups
}

/// Concept pairs sharing at least one paper.
pub fn build_cross_references(groups: &[ConceptGroup]) -> Vec<CrossReference> {
    let papers: Vec<HashSet<&str>> = groups.iter().map(ConceptGroup::papers).collect();
    let mut refs = Vec::new();
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let shared = papers[i].intersection(&papers[j]).count();
            if shared == 0 {
                continue;
            }
            let smaller = papers[i].len().min(papers[j].len());
            refs.push(CrossReference {
                concept1: groups[i].concept.clone(),
                concept2: groups[j].concept.clone(),
                shared_paper_count: shared,
                strength: shared as f64 / smaller as f64,
            });
        }
    }
    refs
}

/// Concept frequencies, descending; ties keep first-seen order.
pub fn concept_frequencies(memories: &[Memory]) -> Vec<ConceptCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ConceptCount> = Vec::new();
    for concept in memories.iter().flat_map(|m| m.concepts()) {
        match index.get(concept.as_str()) {
            Some(&i) => counts[i].frequency += 1,
            None => {
                index.insert(concept.as_str(), counts.len());
                counts.push(ConceptCount {
                    concept: concept.clone(),
                    frequency: 1,
                });
            }
        }
    }
    counts.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    counts
}

fn top_groups(groups: &[ConceptGroup], n: usize) -> Vec<ConceptCount> {
    let mut counts: Vec<ConceptCount> = groups
        .iter()
        .map(|g| ConceptCount {
            concept: g.concept.clone(),
            frequency: g.members.len(),
        })
        .collect();
    counts.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    counts.truncate(n);
    counts
}

fn summary_text(top: &[ConceptCount]) -> String {
    let mut out = String::from("Top consolidated concepts:\n");
    for c in top {
        out.push_str(&format!("- {}: {} memories\n", c.concept, c.frequency));
    }
    out
}

fn recommendations(avg_strength: f64, gap_count: usize) -> Vec<String> {
    let mut out = Vec::new();
    if avg_strength < 0.5 {
        out.push("Review older papers to strengthen memories".to_string());
    }
    if gap_count > 5 {
        out.push("Explore emerging concepts to fill knowledge gaps".to_string());
    }
    out.push("Regular reading maintains memory strength".to_string());
    out
}

fn excerpt(text: Option<&str>, max_chars: usize) -> String {
    text.map(|t| t.chars().take(max_chars).collect())
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------
// Engine
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct ConsolidationEngine {
    caps: Capabilities,
    memory: ResearchMemory,
    config: ConsolidationConfig,
}

impl ConsolidationEngine {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            memory: ResearchMemory::new(caps.clone()),
            caps,
            config: ConsolidationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConsolidationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ConsolidationConfig {
        &self.config
    }

    pub async fn consolidate(
        &self,
        researcher_id: &str,
        window_days: u32,
    ) -> ReasoningResult<ConsolidationReport> {
        self.consolidate_at(researcher_id, window_days, Utc::now()).await
    }

    /// Consolidation evaluated at a fixed instant.
    pub async fn consolidate_at(
        &self,
        researcher_id: &str,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> ReasoningResult<ConsolidationReport> {
        tracing::info!(target: "scholae::consolidation", researcher_id, window_days, "consolidating memories");
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, self.config.recall_limit)
            .await?;

        let ranked = rank_by_strength(&memories, now);
        let groups = group_by_concept(&ranked);
        let cross_refs = build_cross_references(&groups);

        let window_start = now - Duration::days(i64::from(window_days));
        let recent = memories
            .iter()
            .filter(|m| m.timestamp().is_some_and(|ts| ts >= window_start))
            .count();
        let strong = ranked
            .iter()
            .filter(|(_, s)| *s > self.config.strong_threshold)
            .count();
        let flagged: Vec<String> = ranked
            .iter()
            .filter(|(_, s)| *s < self.config.weak_threshold)
            .map(|(m, _)| m.id.clone())
            .collect();

        let top = top_groups(&groups, TOP_SUMMARY_CONCEPTS);
        let summary = summary_text(&top);

        let summary_memory_id = if self.config.persist_summary && !memories.is_empty() {
            let payload = json!({
                "summary": summary,
                "total_memories": memories.len(),
                "strong_memories": strong,
                "weak_memories": flagged.len(),
                "cross_references": cross_refs,
            });
            Some(
                self.memory
                    .store_project_record(
                        researcher_id,
                        MemoryKind::ConsolidationSummary,
                        "consolidation",
                        payload,
                    )
                    .await?,
            )
        } else {
            None
        };

        tracing::info!(
            target: "scholae::consolidation",
            researcher_id,
            total = memories.len(),
            strong,
            weak = flagged.len(),
            groups = groups.len(),
            cross_refs = cross_refs.len(),
            "consolidation complete"
        );

        Ok(ConsolidationReport {
            researcher_id: researcher_id.to_string(),
            window_days,
            total_memories: memories.len(),
            recent_memories: recent,
            strong_memories: strong,
            weak_memories: flagged.len(),
            flagged_for_review: flagged,
            concept_groups: groups.len(),
            cross_references: cross_refs.len(),
            top_concepts: top,
            consolidation_summary: summary,
            summary_memory_id,
        })
    }

    /// How exposure to a concept accumulated over time.
    pub async fn evolution(&self, researcher_id: &str, concept: &str) -> ReasoningResult<EvolutionReport> {
        let needle = concept.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ReasoningError::MalformedInput("concept is empty".into()));
        }
        tracing::info!(target: "scholae::consolidation", researcher_id, concept, "tracking concept evolution");
        let found = self
            .memory
            .search_memories(researcher_id, concept, EVOLUTION_SEARCH_LIMIT)
            .await?;

        let mut matching: Vec<&Memory> = found
            .iter()
            .filter(|m| m.concepts().join(", ").to_lowercase().contains(&needle))
            .collect();
        matching.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.content.timestamp.cmp(&b.content.timestamp))
        });

        let timeline: Vec<EvolutionEntry> = matching
            .iter()
            .map(|m| EvolutionEntry {
                timestamp: m.content.timestamp.clone(),
                paper_id: m.content.paper_id.clone(),
                title: m.content.title.clone(),
                context: excerpt(m.content.abstract_text.as_deref(), EVOLUTION_CONTEXT_CHARS),
            })
            .collect();

        let exposures = timeline.len();
        Ok(EvolutionReport {
            concept: concept.to_string(),
            first_encountered: timeline.first().and_then(|e| e.timestamp.clone()),
            total_exposures: exposures,
            evolution_score: (exposures as f64 * 0.1).min(1.0),
            timeline,
            mastery_level: mastery_level(exposures),
        })
    }

    /// Emerging concepts with no memory. Graph failure degrades to no gaps.
    pub async fn memory_gaps(&self, researcher_id: &str) -> ReasoningResult<Vec<MemoryGap>> {
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, self.config.recall_limit)
            .await?;
        Ok(self.gaps_for(&memories).await)
    }

    pub(crate) async fn gaps_for(&self, memories: &[Memory]) -> Vec<MemoryGap> {
        let known: BTreeSet<String> = memories
            .iter()
            .flat_map(|m| m.concepts())
            .map(|c| c.to_lowercase())
            .collect();
        let pattern = GraphPattern::EmergingConcepts {
            year_threshold: self.config.emerging_year_threshold,
            limit: EMERGING_LIMIT,
        };
        let rows = match self.caps.graph(&pattern).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(target: "scholae::consolidation", error = %e, "emerging concept lookup failed; no gaps reported");
                return Vec::new();
            }
        };
        rows.iter()
            .filter_map(|r| {
                let concept = r.string("concept")?;
                if known.contains(&concept.to_lowercase()) {
                    return None;
                }
                Some(MemoryGap {
                    concept,
                    importance: r.u64("recent_count").unwrap_or(0),
                    reason: "Emerging trend in recent papers".to_string(),
                    recommended_action: "Read papers discussing this concept".to_string(),
                })
            })
            .collect()
    }

    pub async fn report(&self, researcher_id: &str) -> ReasoningResult<MemoryHealthReport> {
        self.report_at(researcher_id, Utc::now()).await
    }

    pub async fn report_at(
        &self,
        researcher_id: &str,
        now: DateTime<Utc>,
    ) -> ReasoningResult<MemoryHealthReport> {
        tracing::info!(target: "scholae::consolidation", researcher_id, "building memory health report");
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, self.config.recall_limit)
            .await?;
        let strengths: Vec<f64> = memories.iter().map(|m| strength(m, now)).collect();
        let avg = if strengths.is_empty() {
            0.0
        } else {
            strengths.iter().sum::<f64>() / strengths.len() as f64
        };

        let freqs = concept_frequencies(&memories);
        let gaps = self.gaps_for(&memories).await;
        let recs = recommendations(avg, gaps.len());

        Ok(MemoryHealthReport {
            researcher_id: researcher_id.to_string(),
            total_memories: memories.len(),
            average_memory_strength: round2(avg),
            strong_memories: strengths
                .iter()
                .filter(|s| **s > self.config.strong_threshold)
                .count(),
            weak_memories: strengths
                .iter()
                .filter(|s| **s < self.config.report_weak_threshold)
                .count(),
            unique_concepts: freqs.len(),
            top_concepts: freqs.into_iter().take(TOP_REPORT_CONCEPTS).collect(),
            knowledge_gaps: gaps.into_iter().take(REPORT_GAPS).collect(),
            recommendations: recs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryContent, MemoryMetadata, MemoryType, NewMemory};

    fn paper(id: &str, paper_id: &str, concepts: &[&str], days_ago: i64, now: DateTime<Utc>) -> Memory {
        Memory::new(
            id,
            "r1",
            NewMemory {
                memory_type: MemoryType::Personal,
                content: MemoryContent::now(MemoryKind::PaperReading)
                    .with_paper(paper_id, Some(format!("Paper {paper_id}")))
                    .with_concepts(concepts.iter().map(|c| c.to_string()).collect())
                    .with_timestamp((now - Duration::days(days_ago)).to_rfc3339()),
                metadata: MemoryMetadata::from_source("test"),
            },
        )
    }

    #[test]
    fn mastery_boundaries() {
        assert_eq!(mastery_level(0), Mastery::Novice);
        assert_eq!(mastery_level(1), Mastery::Novice);
        assert_eq!(mastery_level(2), Mastery::Familiar);
        assert_eq!(mastery_level(4), Mastery::Familiar);
        assert_eq!(mastery_level(5), Mastery::Proficient);
        assert_eq!(mastery_level(9), Mastery::Proficient);
        assert_eq!(mastery_level(10), Mastery::Expert);
        assert_eq!(mastery_level(12), Mastery::Expert);
    }

    #[test]
    fn groups_follow_strength_order() {
        let now = Utc::now();
        let memories = vec![
            paper("old", "p1", &["graphs"], 200, now),
            paper("new", "p2", &["graphs", "memory"], 0, now),
        ];
        let ranked = rank_by_strength(&memories, now);
        assert_eq!(ranked[0].0.id, "new");
        let groups = group_by_concept(&ranked);
        assert_eq!(groups[0].concept, "graphs");
        assert_eq!(groups[0].members[0].memory_id, "new");
        assert_eq!(groups[0].members.len(), 2);
    }

    #[test]
    fn cross_reference_strength_uses_smaller_group() {
        let now = Utc::now();
        let memories = vec![
            paper("a", "p1", &["x", "y"], 1, now),
            paper("b", "p2", &["x"], 1, now),
            paper("c", "p3", &["x"], 1, now),
            paper("d", "p4", &["z"], 1, now),
        ];
        let ranked = rank_by_strength(&memories, now);
        let refs = build_cross_references(&group_by_concept(&ranked));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].shared_paper_count, 1);
        assert_eq!(refs[0].strength, 1.0);
    }

    #[test]
    fn summary_lists_top_five_by_count() {
        let top = vec![
            ConceptCount { concept: "a".into(), frequency: 3 },
            ConceptCount { concept: "b".into(), frequency: 1 },
        ];
        assert_eq!(
            summary_text(&top),
            "Top consolidated concepts:\n- a: 3 memories\n- b: 1 memories\n"
        );
    }

    #[test]
    fn recommendation_rules() {
        assert_eq!(recommendations(0.9, 0).len(), 1);
        let low = recommendations(0.3, 6);
        assert_eq!(low[0], "Review older papers to strengthen memories");
        assert_eq!(low[1], "Explore emerging concepts to fill knowledge gaps");
        assert_eq!(low[2], "Regular reading maintains memory strength");
        assert_eq!(recommendations(0.5, 5).len(), 1);
    }

    #[test]
    fn frequencies_break_ties_by_first_seen() {
        let now = Utc::now();
        let memories = vec![
            paper("a", "p1", &["b", "a"], 1, now),
            paper("b", "p2", &["a"], 1, now),
        ];
        let f = concept_frequencies(&memories);
        assert_eq!(f[0].concept, "a");
        assert_eq!(f[1].concept, "b");
    }
}
