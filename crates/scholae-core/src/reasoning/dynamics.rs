//! Concept lifecycle staging and citation influence propagation.

use super::GraphReasoningEngine;
use crate::capabilities::GraphPattern;
use crate::error::{ReasoningError, ReasoningResult};
use crate::memory::consolidation::round2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RECENT_FROM_YEAR: i64 = 2020;
const EARLY_BEFORE_YEAR: i64 = 2015;
const MIN_TIMELINE_POINTS: usize = 3;
const INFLUENCE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Emerging,
    RapidGrowth,
    SteadyGrowth,
    Mature,
    Declining,
}

impl LifecycleStage {
    /// Stage from the number of distinct years and the recent/early growth ratio.
    pub fn classify(timeline_points: usize, growth_rate: f64) -> Self {
        if timeline_points < MIN_TIMELINE_POINTS {
            LifecycleStage::Emerging
        } else if growth_rate > 2.0 {
            LifecycleStage::RapidGrowth
        } else if growth_rate > 1.0 {
            LifecycleStage::SteadyGrowth
        } else if growth_rate > 0.5 {
            LifecycleStage::Mature
        } else {
            LifecycleStage::Declining
        }
    }

    pub fn prediction(&self) -> &'static str {
        match self {
            LifecycleStage::Emerging => "Concept is new and gaining attention",
            LifecycleStage::RapidGrowth => "Expect continued strong growth in next 2-3 years",
            LifecycleStage::SteadyGrowth => "Stable research area with consistent output",
            LifecycleStage::Mature => "Well-established field, may plateau soon",
            LifecycleStage::Declining => "Declining interest, may be superseded by newer concepts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i64,
    pub papers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptLifecycle {
    pub concept: String,
    pub first_appeared: i64,
    pub total_years: usize,
    pub lifecycle_stage: LifecycleStage,
    pub growth_rate: f64,
    pub timeline: Vec<YearCount>,
    pub prediction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitingPaper {
    pub paper_id: String,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub distance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceReport {
    pub paper_id: String,
    pub direct_citations: usize,
    pub indirect_citations: usize,
    pub influence_score: f64,
    pub max_depth_reached: u32,
    /// `depth_{d}` → citing papers at that distance.
    pub influence_by_distance: BTreeMap<String, usize>,
    pub citing_papers: Vec<CitingPaper>,
}

/// `recent_total / max(early_total, 1)` over a per-year timeline.
pub fn growth_rate(timeline: &[YearCount]) -> f64 {
    let recent: u64 = timeline
        .iter()
        .filter(|t| t.year >= RECENT_FROM_YEAR)
        .map(|t| t.papers)
        .sum();
    let early: u64 = timeline
        .iter()
        .filter(|t| t.year < EARLY_BEFORE_YEAR)
        .map(|t| t.papers)
        .sum();
    recent as f64 / early.max(1) as f64
}

/// Sum over distances of `count / distance^1.5`.
pub fn influence_score(by_distance: &BTreeMap<u32, usize>) -> f64 {
    by_distance
        .iter()
        .filter(|(d, _)| **d > 0)
        .map(|(d, n)| *n as f64 / f64::from(*d).powf(1.5))
        .sum()
}

impl GraphReasoningEngine {
    /// Publication timeline and lifecycle stage of a concept.
    pub async fn concept_lifecycle(&self, concept: &str) -> ReasoningResult<ConceptLifecycle> {
        tracing::info!(target: "scholae::reasoning", concept, "tracking concept lifecycle");
        let rows = self
            .caps
            .graph(&GraphPattern::PublicationTimeline {
                concept: concept.to_string(),
            })
            .await?;

        let mut by_year: BTreeMap<i64, u64> = BTreeMap::new();
        for r in &rows {
            if let Some(year) = r.i64("year") {
                *by_year.entry(year).or_insert(0) += r.u64("paper_count").unwrap_or(0);
            }
        }
        let timeline: Vec<YearCount> = by_year
            .into_iter()
            .map(|(year, papers)| YearCount { year, papers })
            .collect();
        let Some(first) = timeline.first() else {
            return Err(ReasoningError::NotFound(format!(
                "no temporal data for concept '{concept}'"
            )));
        };
        let first_appeared = first.year;

        let rate = growth_rate(&timeline);
        let stage = LifecycleStage::classify(timeline.len(), rate);
        Ok(ConceptLifecycle {
            concept: concept.to_string(),
            first_appeared,
            total_years: timeline.len(),
            lifecycle_stage: stage,
            growth_rate: round2(rate),
            prediction: stage.prediction().to_string(),
            timeline,
        })
    }

    /// Decayed citation influence of a paper up to `max_depth` hops.
    pub async fn influence_propagation(
        &self,
        paper_id: &str,
        max_depth: u32,
    ) -> ReasoningResult<InfluenceReport> {
        if paper_id.trim().is_empty() {
            return Err(ReasoningError::MalformedInput("paper_id is empty".into()));
        }
        if max_depth == 0 {
            return Err(ReasoningError::MalformedInput("max_depth must be at least 1".into()));
        }
        tracing::info!(target: "scholae::reasoning", paper_id, max_depth, "calculating influence propagation");
        let rows = self
            .caps
            .graph(&GraphPattern::CitationChain {
                paper_id: paper_id.to_string(),
                max_depth,
                limit: INFLUENCE_LIMIT,
            })
            .await?;

        let citing: Vec<CitingPaper> = rows
            .iter()
            .filter_map(|r| {
                let distance = u32::try_from(r.u64("distance")?).ok()?;
                if distance == 0 || distance > max_depth {
                    return None;
                }
                Some(CitingPaper {
                    paper_id: r.string("citing_id")?,
                    title: r.string("title"),
                    year: r.i64("year"),
                    distance,
                })
            })
            .collect();

        let mut by_distance: BTreeMap<u32, usize> = BTreeMap::new();
        for c in &citing {
            *by_distance.entry(c.distance).or_insert(0) += 1;
        }

        Ok(InfluenceReport {
            paper_id: paper_id.to_string(),
            direct_citations: by_distance.get(&1).copied().unwrap_or(0),
            indirect_citations: by_distance
                .iter()
                .filter(|(d, _)| **d > 1)
                .map(|(_, n)| *n)
                .sum(),
            influence_score: round2(influence_score(&by_distance)),
            max_depth_reached: by_distance.keys().next_back().copied().unwrap_or(0),
            influence_by_distance: by_distance
                .iter()
                .map(|(d, n)| (format!("depth_{d}"), *n))
                .collect(),
            citing_papers: citing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(points: &[(i64, u64)]) -> Vec<YearCount> {
        points
            .iter()
            .map(|(year, papers)| YearCount { year: *year, papers: *papers })
            .collect()
    }

    #[test]
    fn fewer_than_three_years_is_emerging_regardless_of_growth() {
        assert_eq!(LifecycleStage::classify(2, 10.0), LifecycleStage::Emerging);
        assert_eq!(LifecycleStage::classify(1, 0.0), LifecycleStage::Emerging);
    }

    #[test]
    fn stage_thresholds() {
        assert_eq!(LifecycleStage::classify(3, 2.5), LifecycleStage::RapidGrowth);
        assert_eq!(LifecycleStage::classify(3, 2.0), LifecycleStage::SteadyGrowth);
        assert_eq!(LifecycleStage::classify(3, 1.0), LifecycleStage::Mature);
        assert_eq!(LifecycleStage::classify(3, 0.5), LifecycleStage::Declining);
    }

    #[test]
    fn growth_floors_missing_early_years_at_one() {
        assert_eq!(growth_rate(&timeline(&[(2021, 4), (2022, 3)])), 7.0);
        assert_eq!(growth_rate(&timeline(&[(2010, 4), (2016, 9), (2021, 2)])), 0.5);
    }

    #[test]
    fn two_direct_three_indirect() {
        let by_distance = BTreeMap::from([(1, 2), (2, 3)]);
        assert_eq!(round2(influence_score(&by_distance)), 3.06);
    }
}
