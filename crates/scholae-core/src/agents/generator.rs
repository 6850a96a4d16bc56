//! Phase 3: hypotheses from co-occurrence patterns and cross-domain analogies.
//!
//! When a text generator is configured, [`HypothesisDrafter`] adds model-drafted
//! hypotheses. The model must answer with a JSON array matching [`DraftedHypothesis`];
//! anything else is rejected as malformed rather than parsed heuristically.

use super::{AgentRole, Pattern, ResearchAgent};
use crate::capabilities::{Capabilities, GenerationRequest};
use crate::error::{ReasoningError, ReasoningResult};
use crate::memory::ResearchMemory;
use crate::reasoning::{Analogy, GraphReasoningEngine};
use serde::{Deserialize, Serialize};
use serde_json::json;

const PATTERNS_CONSIDERED: usize = 3;
const ANALOGY_DOMAINS: [&str; 3] = ["machine learning", "biology", "physics"];
const ANALOGIES_PER_DOMAIN: usize = 2;
const PATTERN_NOVELTY: f64 = 0.75;
const ANALOGY_NOVELTY: f64 = 0.85;
const PATTERN_CONFIDENCE: f64 = 0.75;
const ANALOGY_CONFIDENCE: f64 = 0.7;
const INSIGHT_TOP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisBasis {
    PatternAnalysis,
    CrossDomainAnalogy,
    LanguageModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub hypothesis_text: String,
    pub basis: HypothesisBasis,
    pub novelty_score: f64,
    /// In [0, 1]; template hypotheses carry a fixed prior per basis.
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Concepts or paper ids the hypothesis rests on.
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub required_experiments: Vec<String>,
}

/// One entry of the JSON array a language model must return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DraftedHypothesis {
    pub hypothesis: String,
    pub reasoning: String,
    pub novelty_score: f64,
    pub confidence_score: f64,
}

impl DraftedHypothesis {
    fn validate(&self) -> ReasoningResult<()> {
        if self.hypothesis.trim().is_empty() {
            return Err(ReasoningError::MalformedInput("drafted hypothesis is empty".into()));
        }
        for (field, v) in [("novelty_score", self.novelty_score), ("confidence_score", self.confidence_score)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ReasoningError::MalformedInput(format!("{field} {v} outside [0, 1]")));
            }
        }
        Ok(())
    }
}

/// Parses a strict JSON array of drafted hypotheses. A single surrounding code fence
/// is tolerated; any other deviation is `MalformedInput`.
pub(crate) fn parse_drafts(raw: &str) -> ReasoningResult<Vec<DraftedHypothesis>> {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        body = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    let drafts: Vec<DraftedHypothesis> = serde_json::from_str(body)
        .map_err(|e| ReasoningError::MalformedInput(format!("hypothesis drafts: {e}")))?;
    for d in &drafts {
        d.validate()?;
    }
    Ok(drafts)
}

/// Asks the text generator for hypotheses on a topic given the spotted patterns.
#[derive(Clone)]
pub struct HypothesisDrafter {
    caps: Capabilities,
    temperature: f32,
    max_tokens: u32,
}

impl HypothesisDrafter {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            temperature: 0.8,
            max_tokens: 800,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Empty when no generator is configured.
    pub async fn draft(&self, topic: &str, patterns: &[Pattern]) -> ReasoningResult<Vec<DraftedHypothesis>> {
        let observed: Vec<String> = patterns
            .iter()
            .filter_map(|p| match p {
                Pattern::ConceptCoOccurrence { insight, .. } => Some(format!("- {insight}")),
                Pattern::Contradiction { .. } => None,
            })
            .collect();
        let observed = if observed.is_empty() {
            "- none recorded".to_string()
        } else {
            observed.join("\n")
        };
        let request = GenerationRequest::new(
            "You are a creative research scientist. Respond with a JSON array only, no prose. \
             Each element must be an object with exactly these keys: \
             \"hypothesis\" (string), \"reasoning\" (string), \
             \"novelty_score\" (number 0-1), \"confidence_score\" (number 0-1).",
            format!(
                "Research topic: {topic}\n\nObserved concept patterns:\n{observed}\n\n\
                 Propose up to 3 novel, testable research hypotheses."
            ),
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens);

        match self.caps.generate(&request).await? {
            Some(raw) => parse_drafts(&raw),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Clone)]
pub struct HypothesisGenerator {
    pub agent: ResearchAgent,
    reasoning: GraphReasoningEngine,
    drafter: HypothesisDrafter,
}

impl HypothesisGenerator {
    pub fn new(caps: Capabilities, memory: ResearchMemory, reasoning: GraphReasoningEngine) -> Self {
        Self {
            agent: ResearchAgent::new(
                "generator_001",
                AgentRole::HypothesisGenerator,
                &[("creativity", 0.95), ("boldness", 0.8), ("rigor", 0.7)],
                memory,
            ),
            reasoning,
            drafter: HypothesisDrafter::new(caps),
        }
    }

    pub fn with_drafter(mut self, drafter: HypothesisDrafter) -> Self {
        self.drafter = drafter;
        self
    }

    pub async fn generate(
        &self,
        researcher_id: &str,
        topic: &str,
        patterns: &[Pattern],
    ) -> ReasoningResult<Vec<Hypothesis>> {
        tracing::info!(target: "scholae::agents", agent_id = %self.agent.agent_id, topic, "generating hypotheses");
        let mut hypotheses: Vec<Hypothesis> = patterns
            .iter()
            .take(PATTERNS_CONSIDERED)
            .filter_map(|p| match p {
                Pattern::ConceptCoOccurrence {
                    concept1,
                    concept2,
                    pattern_strength,
                    ..
                } => Some(Hypothesis {
                    hypothesis_text: format!(
                        "The interaction between {concept1} and {concept2} may lead to novel insights in {topic}"
                    ),
                    basis: HypothesisBasis::PatternAnalysis,
                    novelty_score: PATTERN_NOVELTY,
                    confidence_score: PATTERN_CONFIDENCE,
                    testability: Some("high".to_string()),
                    pattern_strength: Some(*pattern_strength),
                    source_domain: None,
                    reasoning: None,
                    evidence: vec![concept1.clone(), concept2.clone()],
                    required_experiments: vec![
                        format!("Systematic study of {concept1}-{concept2} interaction"),
                        format!("Comparison with baseline {topic} approaches"),
                    ],
                }),
                Pattern::Contradiction { .. } => None,
            })
            .collect();

        let lowered = topic.to_lowercase();
        for domain in ANALOGY_DOMAINS {
            if lowered.contains(domain) {
                continue;
            }
            for analogy in self.reasoning.analogies(topic, domain, ANALOGIES_PER_DOMAIN).await {
                if let Analogy::Methodological {
                    shared_method,
                    source_examples,
                    target_examples,
                    ..
                } = analogy
                {
                    hypotheses.push(Hypothesis {
                        hypothesis_text: format!("Applying {shared_method} from {domain} could advance {topic}"),
                        basis: HypothesisBasis::CrossDomainAnalogy,
                        novelty_score: ANALOGY_NOVELTY,
                        confidence_score: ANALOGY_CONFIDENCE,
                        testability: Some("medium".to_string()),
                        pattern_strength: None,
                        source_domain: Some(domain.to_string()),
                        reasoning: None,
                        evidence: source_examples.into_iter().chain(target_examples).collect(),
                        required_experiments: Vec::new(),
                    });
                }
            }
        }

        match self.drafter.draft(topic, patterns).await {
            Ok(drafts) => hypotheses.extend(drafts.into_iter().map(|d| Hypothesis {
                hypothesis_text: d.hypothesis,
                basis: HypothesisBasis::LanguageModel,
                novelty_score: d.novelty_score,
                confidence_score: d.confidence_score,
                testability: None,
                pattern_strength: None,
                source_domain: None,
                reasoning: Some(d.reasoning),
                evidence: Vec::new(),
                required_experiments: Vec::new(),
            })),
            Err(ReasoningError::MalformedInput(msg)) => {
                tracing::warn!(target: "scholae::agents", topic, error = %msg, "discarding malformed hypothesis drafts");
            }
            Err(e) => return Err(e),
        }

        self.agent
            .store_insight(
                researcher_id,
                json!({
                    "action": "hypothesis_generation",
                    "topic": topic,
                    "hypotheses_generated": hypotheses.len(),
                    "top_hypotheses": hypotheses.iter().take(INSIGHT_TOP).collect::<Vec<_>>(),
                }),
            )
            .await?;
        Ok(hypotheses)
    }
}
