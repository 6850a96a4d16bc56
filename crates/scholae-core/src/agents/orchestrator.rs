//! Sequential scout → spot → generate → debate pipeline.

use super::{Hypothesis, HypothesisBasis, HypothesisDrafter, HypothesisGenerator, LiteratureScout, Pattern, PatternSpotter, ScoutedPaper};
use crate::capabilities::Capabilities;
use crate::config::TextGenerationConfig;
use crate::error::{ReasoningError, ReasoningResult};
use crate::memory::consolidation::round2;
use crate::memory::ResearchMemory;
use crate::model::MemoryKind;
use crate::reasoning::GraphReasoningEngine;
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEBATE_LIMIT: usize = 5;
const OUTCOME_PREVIEW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Scout,
    PatternSpotting,
    HypothesisGeneration,
    Debate,
    /// Persisting refined hypotheses and the collaboration record.
    Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub kind: String,
    pub error: String,
}

impl PhaseFailure {
    fn new(phase: Phase, e: &ReasoningError) -> Self {
        Self {
            phase,
            kind: e.kind().to_string(),
            error: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedHypothesis {
    #[serde(flatten)]
    pub hypothesis: Hypothesis,
    pub confidence_after_debate: f64,
    pub scout_support: bool,
    pub spotter_support: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSummaries {
    pub scout: String,
    pub spotter: String,
    pub generator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationOutcome {
    pub research_topic: String,
    pub papers_scouted: usize,
    pub patterns_found: usize,
    pub hypotheses_total: usize,
    pub papers_discovered: Vec<ScoutedPaper>,
    pub patterns_identified: Vec<Pattern>,
    pub hypotheses_generated: Vec<RefinedHypothesis>,
    pub agent_insights: AgentSummaries,
    pub collaboration_score: f64,
    pub completed_phases: Vec<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration_memory_id: Option<String>,
    /// Set when a phase failed; the phases after it did not run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PhaseFailure>,
}

/// `min(p/10,1)*0.3 + min(pat/5,1)*0.3 + min(h/3,1)*0.4`, rounded to two places.
pub fn collaboration_score(papers: usize, patterns: usize, hypotheses: usize) -> f64 {
    let part = |n: usize, full: f64| (n as f64 / full).min(1.0);
    round2(part(papers, 10.0) * 0.3 + part(patterns, 5.0) * 0.3 + part(hypotheses, 3.0) * 0.4)
}

/// Deterministic refinement of the first five hypotheses.
pub fn debate(hypotheses: &[Hypothesis]) -> Vec<RefinedHypothesis> {
    hypotheses
        .iter()
        .take(DEBATE_LIMIT)
        .map(|h| {
            let pattern_backed = h.basis == HypothesisBasis::PatternAnalysis;
            RefinedHypothesis {
                hypothesis: h.clone(),
                confidence_after_debate: if pattern_backed { 0.8 } else { 0.7 },
                scout_support: pattern_backed,
                spotter_support: true,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct MultiAgentOrchestrator {
    caps: Capabilities,
    memory: ResearchMemory,
    pub scout: LiteratureScout,
    pub spotter: PatternSpotter,
    pub generator: HypothesisGenerator,
}

impl MultiAgentOrchestrator {
    pub fn new(caps: Capabilities) -> Self {
        let memory = ResearchMemory::new(caps.clone());
        let reasoning = GraphReasoningEngine::new(caps.clone());
        Self {
            scout: LiteratureScout::new(memory.clone(), reasoning.clone()),
            spotter: PatternSpotter::new(memory.clone(), reasoning.clone()),
            generator: HypothesisGenerator::new(caps.clone(), memory.clone(), reasoning),
            memory,
            caps,
        }
    }

    /// Applies the configured sampling settings to the hypothesis drafter.
    pub fn with_text_settings(mut self, settings: &TextGenerationConfig) -> Self {
        let drafter = HypothesisDrafter::new(self.caps.clone()).with_sampling(settings.temperature, settings.max_tokens);
        self.generator = self.generator.with_drafter(drafter);
        self
    }

    /// Runs the four phases in order. A failing phase stops the pipeline; the outcome
    /// then carries what earlier phases produced plus the failure.
    pub async fn collaborate(&self, researcher_id: &str, topic: &str) -> ReasoningResult<CollaborationOutcome> {
        if researcher_id.trim().is_empty() {
            return Err(ReasoningError::MalformedInput("researcher_id is empty".into()));
        }
        if topic.trim().is_empty() {
            return Err(ReasoningError::MalformedInput("research topic is empty".into()));
        }
        tracing::info!(target: "scholae::agents", researcher_id, topic, "multi-agent collaboration started");

        let mut run = Run::new(topic);

        tracing::info!(target: "scholae::agents", "phase 1: literature scouting");
        match self.scout.scout(researcher_id, topic).await {
            Ok(papers) => run.papers = papers,
            Err(e) => return Ok(run.fail(Phase::Scout, e)),
        }
        run.completed.push(Phase::Scout);

        tracing::info!(target: "scholae::agents", "phase 2: pattern spotting");
        let paper_ids: Vec<String> = run.papers.iter().map(|p| p.paper_id.clone()).collect();
        match self.spotter.spot(researcher_id, &paper_ids).await {
            Ok(patterns) => run.patterns = patterns,
            Err(e) => return Ok(run.fail(Phase::PatternSpotting, e)),
        }
        run.completed.push(Phase::PatternSpotting);

        tracing::info!(target: "scholae::agents", "phase 3: hypothesis generation");
        match self.generator.generate(researcher_id, topic, &run.patterns).await {
            Ok(hypotheses) => run.hypotheses = hypotheses,
            Err(e) => return Ok(run.fail(Phase::HypothesisGeneration, e)),
        }
        run.completed.push(Phase::HypothesisGeneration);

        tracing::info!(target: "scholae::agents", "phase 4: agent debate");
        run.refined = debate(&run.hypotheses);
        run.completed.push(Phase::Debate);

        match self.record(researcher_id, &run).await {
            Ok(id) => {
                run.completed.push(Phase::Record);
                let outcome = run.finish(Some(id), None);
                tracing::info!(target: "scholae::agents", researcher_id, score = outcome.collaboration_score, "multi-agent collaboration finished");
                Ok(outcome)
            }
            Err(e) => Ok(run.fail(Phase::Record, e)),
        }
    }

    async fn record(&self, researcher_id: &str, run: &Run) -> ReasoningResult<String> {
        for (written, refined) in run.refined.iter().enumerate() {
            if let Err(e) = self
                .memory
                .store_hypothesis(
                    researcher_id,
                    &refined.hypothesis.hypothesis_text,
                    &refined.hypothesis.evidence,
                    refined.confidence_after_debate,
                )
                .await
            {
                tracing::warn!(
                    target: "scholae::agents",
                    researcher_id,
                    written,
                    total = run.refined.len(),
                    error = %e,
                    "hypothesis write failed; earlier hypotheses stay stored without a collaboration record"
                );
                return Err(e);
            }
        }
        self.memory
            .store_project_record(
                researcher_id,
                MemoryKind::Collaboration,
                "multi_agent",
                json!({
                    "topic": run.topic,
                    "papers_scouted": run.papers.len(),
                    "patterns_found": run.patterns.len(),
                    "hypotheses_generated": run.hypotheses.len(),
                    "refined_hypotheses": run.refined,
                    "collaboration_score": run.score(),
                }),
            )
            .await
    }
}

/// Phase outputs accumulated during one collaboration.
struct Run {
    topic: String,
    papers: Vec<ScoutedPaper>,
    patterns: Vec<Pattern>,
    hypotheses: Vec<Hypothesis>,
    refined: Vec<RefinedHypothesis>,
    completed: Vec<Phase>,
}

impl Run {
    fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            papers: Vec::new(),
            patterns: Vec::new(),
            hypotheses: Vec::new(),
            refined: Vec::new(),
            completed: Vec::new(),
        }
    }

    fn score(&self) -> f64 {
        collaboration_score(self.papers.len(), self.patterns.len(), self.hypotheses.len())
    }

    fn fail(self, phase: Phase, e: ReasoningError) -> CollaborationOutcome {
        tracing::warn!(target: "scholae::agents", ?phase, error = %e, "collaboration phase failed; remaining phases skipped");
        let failure = PhaseFailure::new(phase, &e);
        self.finish(None, Some(failure))
    }

    fn finish(self, memory_id: Option<String>, failure: Option<PhaseFailure>) -> CollaborationOutcome {
        let score = self.score();
        CollaborationOutcome {
            agent_insights: AgentSummaries {
                scout: format!("Found {} relevant papers", self.papers.len()),
                spotter: format!("Identified {} patterns", self.patterns.len()),
                generator: format!("Generated {} hypotheses", self.hypotheses.len()),
            },
            papers_scouted: self.papers.len(),
            patterns_found: self.patterns.len(),
            hypotheses_total: self.hypotheses.len(),
            papers_discovered: self.papers.into_iter().take(OUTCOME_PREVIEW).collect(),
            patterns_identified: self.patterns.into_iter().take(OUTCOME_PREVIEW).collect(),
            hypotheses_generated: self.refined.into_iter().take(OUTCOME_PREVIEW).collect(),
            research_topic: self.topic,
            collaboration_score: score,
            completed_phases: self.completed,
            collaboration_memory_id: memory_id,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hypothesis(basis: HypothesisBasis) -> Hypothesis {
        Hypothesis {
            hypothesis_text: "h".into(),
            basis,
            novelty_score: 0.5,
            confidence_score: 0.5,
            testability: None,
            pattern_strength: None,
            source_domain: None,
            reasoning: None,
            evidence: Vec::new(),
            required_experiments: Vec::new(),
        }
    }

    #[test]
    fn full_productivity_scores_one() {
        assert_eq!(collaboration_score(10, 5, 3), 1.0);
        assert_eq!(collaboration_score(20, 9, 7), 1.0);
    }

    #[test]
    fn partial_productivity() {
        assert_eq!(collaboration_score(0, 0, 0), 0.0);
        assert_eq!(collaboration_score(5, 0, 0), 0.15);
        assert_eq!(collaboration_score(0, 0, 1), 0.13);
    }

    #[test]
    fn debate_favours_pattern_backed_hypotheses() {
        let refined = debate(&[
            hypothesis(HypothesisBasis::PatternAnalysis),
            hypothesis(HypothesisBasis::CrossDomainAnalogy),
        ]);
        assert_eq!(refined[0].confidence_after_debate, 0.8);
        assert!(refined[0].scout_support && refined[0].spotter_support);
        assert_eq!(refined[1].confidence_after_debate, 0.7);
        assert!(!refined[1].scout_support && refined[1].spotter_support);
    }

    #[test]
    fn debate_keeps_first_five() {
        let many: Vec<Hypothesis> = (0..8).map(|_| hypothesis(HypothesisBasis::LanguageModel)).collect();
        assert_eq!(debate(&many).len(), 5);
    }
}
