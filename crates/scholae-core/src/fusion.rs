//! Memory-graph fusion: blends per-researcher memory strength with global graph
//! structure for personalized views, discovery, guidance and learning paths.

use crate::capabilities::{Capabilities, GenerationRequest};
use crate::config::{ConsolidationConfig, FusionConfig};
use crate::error::{ReasoningError, ReasoningResult};
use crate::memory::{mastery_from_strength, strength, ConsolidationEngine, Mastery, ResearchMemory};
use crate::model::{GraphPath, Memory, MemoryKind};
use crate::reasoning::{Analogy, GraphReasoningEngine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const VIEW_MEMORY_LIMIT: usize = 50;
const VIEW_BRIDGE_LIMIT: usize = 3;
const SERENDIPITY_MEMORY_LIMIT: usize = 30;
const SERENDIPITY_SAMPLE: usize = 5;
const SERENDIPITY_HOPS: u32 = 3;
const DISTANT_LIMIT: usize = 10;
const DISTANT_PER_CONCEPT: usize = 3;
const DOMAIN_PAPER_LIMIT: usize = 5;
const DISTANT_SCORE: f64 = 0.8;
const CROSS_DOMAIN_SCORE: f64 = 0.9;
const PROBE_DOMAINS: [&str; 4] = ["machine learning", "neuroscience", "physics", "biology"];
const INTUITION_MEMORY_LIMIT: usize = 50;
const INTUITIVE_FREQUENCY: usize = 3;
const LOAD_MEMORY_LIMIT: usize = 50;
const LOAD_WEAK_BELOW: f64 = 0.4;
const REVIEW_TRIGGER: usize = 10;
const REVIEW_TITLES: usize = 5;
const PATH_MEMORY_LIMIT: usize = 30;
const PATH_SAMPLE: usize = 10;
const PATH_MAX_HOPS: u32 = 5;
const QUERY_SEARCH_LIMIT: usize = 10;
const QUERY_CONTEXT_PAPERS: usize = 5;
const QUERY_EXCERPT_CHARS: usize = 500;
const QUERY_RECENT_HOURS: i64 = 168;
const ANSWER_CONFIDENCE: f64 = 0.85;
const ANSWER_FAILED: &str = "I apologize, but I encountered an error processing your query.";

// -----------------------------------------------------------------------------
// Result types
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewNode {
    Concept {
        id: String,
        memory_strength: f64,
        mastery_level: Mastery,
        size: f64,
    },
    Paper {
        id: String,
        title: Option<String>,
        read: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEdge {
    pub source: String,
    pub target: String,
    /// Mean strength of the two endpoint concepts.
    pub weight: f64,
    pub bridge_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStatistics {
    pub total_concepts: usize,
    pub strong_concepts: usize,
    pub weak_concepts: usize,
    pub papers_read: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedGraphView {
    pub researcher_id: String,
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
    pub graph_statistics: ViewStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discovery {
    DistantConnection {
        known_concept: String,
        discovered_concept: String,
        path: Vec<String>,
        serendipity_score: f64,
        insight: String,
        action: String,
    },
    CrossDomain {
        your_domain: String,
        new_domain: String,
        analogy: Analogy,
        serendipity_score: f64,
        insight: String,
        action: String,
    },
}

impl Discovery {
    pub fn serendipity_score(&self) -> f64 {
        match self {
            Discovery::DistantConnection { serendipity_score, .. }
            | Discovery::CrossDomain { serendipity_score, .. } => *serendipity_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntuitionConfidence {
    High,
    Exploratory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intuition {
    pub confidence: IntuitionConfidence,
    pub feeling: String,
    pub reasoning: String,
    pub suggestion: String,
    pub intuitive_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    Optimal,
    Moderate,
    Overload,
}

impl LoadLevel {
    /// More than five papers today is overload, none is optimal.
    pub fn from_papers_today(papers: usize) -> Self {
        match papers {
            0 => LoadLevel::Optimal,
            n if n > 5 => LoadLevel::Overload,
            _ => LoadLevel::Moderate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLoad {
    pub papers_today: usize,
    pub load_level: LoadLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMemoryHealth {
    pub total_memories: usize,
    pub weak_memories: usize,
    pub needs_review: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadRecommendation {
    OverloadWarning { message: String, reason: String },
    Engagement { message: String, reason: String },
    ReviewNeeded {
        message: String,
        reason: String,
        papers_to_review: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSchedule {
    pub papers_per_day: u32,
    pub review_frequency: String,
    pub deep_reading_time: String,
    pub review_time: String,
}

impl Default for ReadingSchedule {
    fn default() -> Self {
        Self {
            papers_per_day: 3,
            review_frequency: "every 3 days".to_string(),
            deep_reading_time: "morning".to_string(),
            review_time: "evening".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveLoadReport {
    pub current_load: CurrentLoad,
    pub memory_health: LoadMemoryHealth,
    pub recommendations: Vec<LoadRecommendation>,
    pub optimal_schedule: ReadingSchedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    fn at(index: usize) -> Self {
        match index {
            0 | 1 => Difficulty::Easy,
            2 | 3 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStep {
    pub step: usize,
    pub concept: String,
    pub difficulty: Difficulty,
    pub estimated_time: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub target_concept: String,
    pub starting_point: String,
    pub path: GraphPath,
    pub total_steps: usize,
    pub estimated_duration: String,
    pub learning_path: Vec<LearningStep>,
    pub difficulty_level: String,
    pub success_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionExplanation {
    pub concept1: String,
    pub concept2: String,
    pub path: GraphPath,
    pub explanation: String,
    /// True when the text came from the generator rather than the path rendering.
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSource {
    pub title: String,
}

/// Answer to a free-text research question, grounded in the researcher's paper memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub query: String,
    pub answer: String,
    pub relevant_papers: Vec<String>,
    pub concepts_used: Vec<String>,
    pub sources: Vec<AnswerSource>,
    /// 0.85 for a generated answer, 0.0 otherwise.
    pub confidence: f64,
    pub generated: bool,
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn paper_title(m: &Memory) -> String {
    m.content
        .title
        .clone()
        .or_else(|| m.content.paper_id.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Title plus abstract excerpt for the first few papers, blank-line separated.
fn answer_context(papers: &[Memory]) -> String {
    papers
        .iter()
        .take(QUERY_CONTEXT_PAPERS)
        .map(|m| {
            let excerpt: String = m
                .content
                .abstract_text
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(QUERY_EXCERPT_CHARS)
                .collect();
            format!("Paper: {}\n{excerpt}", paper_title(m))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Distinct concepts in first-seen order.
fn known_concepts(memories: &[Memory]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    memories
        .iter()
        .flat_map(|m| m.concepts())
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

/// Highest strength per concept, in first-seen order.
fn concept_strengths(memories: &[Memory]) -> Vec<(String, f64)> {
    let now = Utc::now();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<(String, f64)> = Vec::new();
    for m in memories {
        let s = strength(m, now);
        for c in m.concepts() {
            match index.get(c.as_str()) {
                Some(&i) => out[i].1 = out[i].1.max(s),
                None => {
                    index.insert(c.as_str(), out.len());
                    out.push((c.clone(), s));
                }
            }
        }
    }
    out
}

// -----------------------------------------------------------------------------
// Layer
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct FusionLayer {
    caps: Capabilities,
    memory: ResearchMemory,
    reasoning: GraphReasoningEngine,
    consolidation: ConsolidationEngine,
    config: FusionConfig,
}

impl FusionLayer {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            memory: ResearchMemory::new(caps.clone()),
            reasoning: GraphReasoningEngine::new(caps.clone()),
            consolidation: ConsolidationEngine::new(caps.clone()),
            caps,
            config: FusionConfig::default(),
        }
    }

    pub fn with_config(mut self, fusion: FusionConfig, consolidation: ConsolidationConfig) -> Self {
        self.config = fusion;
        self.consolidation = self.consolidation.with_config(consolidation);
        self
    }

    /// Concept nodes weighted by memory strength, read papers, and bridged concept edges.
    pub async fn personalized_view(&self, researcher_id: &str) -> ReasoningResult<PersonalizedGraphView> {
        tracing::info!(target: "scholae::fusion", researcher_id, "building personalized graph view");
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, VIEW_MEMORY_LIMIT)
            .await?;
        let strengths = concept_strengths(&memories);

        let papers = match self.reasoning.researcher_papers(researcher_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(target: "scholae::fusion", researcher_id, error = %e, "read papers unavailable; view has no paper nodes");
                Vec::new()
            }
        };

        let mut in_view = strengths.clone();
        in_view.sort_by(|a, b| b.1.total_cmp(&a.1));
        in_view.truncate(self.config.max_view_concepts);

        let mut nodes: Vec<ViewNode> = in_view
            .iter()
            .map(|(concept, s)| ViewNode::Concept {
                id: concept.clone(),
                memory_strength: *s,
                mastery_level: mastery_from_strength(*s),
                size: s * 100.0,
            })
            .collect();
        nodes.extend(papers.iter().map(|p| ViewNode::Paper {
            id: p.paper_id.clone(),
            title: p.title.clone(),
            read: true,
        }));

        let mut edges = Vec::new();
        for (i, (c1, s1)) in in_view.iter().enumerate() {
            for (c2, s2) in &in_view[i + 1..] {
                let bridges = self.reasoning.bridge_concepts(c1, c2, VIEW_BRIDGE_LIMIT).await;
                if bridges.is_empty() {
                    continue;
                }
                edges.push(ViewEdge {
                    source: c1.clone(),
                    target: c2.clone(),
                    weight: (s1 + s2) / 2.0,
                    bridge_concepts: bridges.into_iter().take(VIEW_BRIDGE_LIMIT).collect(),
                });
            }
        }

        Ok(PersonalizedGraphView {
            researcher_id: researcher_id.to_string(),
            graph_statistics: ViewStatistics {
                total_concepts: strengths.len(),
                strong_concepts: strengths.iter().filter(|(_, s)| *s > 0.7).count(),
                weak_concepts: strengths.iter().filter(|(_, s)| *s < 0.3).count(),
                papers_read: papers.len(),
            },
            nodes,
            edges,
        })
    }

    /// Distant concepts and cross-domain analogies the researcher has not met yet.
    pub async fn serendipity(&self, researcher_id: &str) -> ReasoningResult<Vec<Discovery>> {
        tracing::info!(target: "scholae::fusion", researcher_id, "finding serendipitous discoveries");
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, SERENDIPITY_MEMORY_LIMIT)
            .await?;
        let known = known_concepts(&memories);
        let known_set: HashSet<&str> = known.iter().map(String::as_str).collect();
        let mut discoveries = Vec::new();

        for concept in known.iter().take(SERENDIPITY_SAMPLE) {
            let distant = match self
                .reasoning
                .distant_concepts(concept, SERENDIPITY_HOPS, DISTANT_LIMIT)
                .await
            {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(target: "scholae::fusion", concept = %concept, error = %e, "distant concept lookup failed");
                    continue;
                }
            };
            for d in distant.into_iter().take(DISTANT_PER_CONCEPT) {
                if known_set.contains(d.concept.as_str()) {
                    continue;
                }
                discoveries.push(Discovery::DistantConnection {
                    insight: format!("Unexpected connection between {concept} and {}", d.concept),
                    action: format!("Explore papers on {}", d.concept),
                    known_concept: concept.clone(),
                    discovered_concept: d.concept,
                    path: d.path,
                    serendipity_score: DISTANT_SCORE,
                });
            }
        }

        let Some(sample) = known.first() else {
            return Ok(discoveries);
        };
        let read_ids: HashSet<&str> = memories
            .iter()
            .filter_map(|m| m.content.paper_id.as_deref())
            .collect();
        for domain in PROBE_DOMAINS {
            let domain_papers = match self.reasoning.related_papers(domain, DOMAIN_PAPER_LIMIT).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(target: "scholae::fusion", domain, error = %e, "domain probe failed");
                    continue;
                }
            };
            if domain_papers.iter().any(|p| read_ids.contains(p.paper_id.as_str())) {
                continue;
            }
            if let Some(analogy) = self.reasoning.analogies(sample, domain, 1).await.into_iter().next() {
                discoveries.push(Discovery::CrossDomain {
                    your_domain: sample.clone(),
                    new_domain: domain.to_string(),
                    analogy,
                    serendipity_score: CROSS_DOMAIN_SCORE,
                    insight: format!("Your knowledge of {sample} could apply to {domain}"),
                    action: format!("Explore {domain} literature"),
                });
            }
        }
        Ok(discoveries)
    }

    /// Guidance based on whether `context` touches frequently-read concepts.
    pub async fn intuition(&self, researcher_id: &str, context: &str) -> ReasoningResult<Intuition> {
        tracing::info!(target: "scholae::fusion", researcher_id, "generating research intuition");
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, INTUITION_MEMORY_LIMIT)
            .await?;

        let mut freq: Vec<(String, usize)> = Vec::new();
        for c in memories.iter().flat_map(|m| m.concepts()) {
            match freq.iter_mut().find(|(name, _)| name == c) {
                Some((_, n)) => *n += 1,
                None => freq.push((c.clone(), 1)),
            }
        }
        let intuitive: Vec<String> = freq
            .into_iter()
            .filter(|(_, n)| *n >= INTUITIVE_FREQUENCY)
            .map(|(c, _)| c)
            .collect();

        let lowered = context.to_lowercase();
        let aligned = intuitive.iter().any(|c| lowered.contains(&c.to_lowercase()));

        let mut out = if aligned {
            Intuition {
                confidence: IntuitionConfidence::High,
                feeling: "This aligns well with your expertise".to_string(),
                reasoning: format!(
                    "You have strong memory patterns in: {}",
                    intuitive.iter().take(3).cloned().collect::<Vec<_>>().join(", ")
                ),
                suggestion: "Trust your instincts and dive deeper".to_string(),
                intuitive_concepts: intuitive,
                warning: None,
            }
        } else {
            Intuition {
                confidence: IntuitionConfidence::Exploratory,
                feeling: "This is outside your comfort zone".to_string(),
                reasoning: "Few memory patterns in this area".to_string(),
                suggestion: "Approach with curiosity, build foundational knowledge first".to_string(),
                intuitive_concepts: intuitive,
                warning: None,
            }
        };

        let gaps = self.consolidation.gaps_for(&memories).await;
        if let Some(top) = gaps.first() {
            out.warning = Some(format!("Knowledge gap detected in: {}", top.concept));
        }
        Ok(out)
    }

    /// Today's reading volume, weak-memory review pressure and a reading schedule.
    pub async fn cognitive_load(&self, researcher_id: &str) -> ReasoningResult<CognitiveLoadReport> {
        tracing::info!(target: "scholae::fusion", researcher_id, "assessing cognitive load");
        let papers_today = self.memory.recent_paper_memories(researcher_id, 24).await?.len();

        let all = self
            .memory
            .recall_paper_memories(researcher_id, None, LOAD_MEMORY_LIMIT)
            .await?;
        let now = Utc::now();
        let weak: Vec<&Memory> = all.iter().filter(|m| strength(m, now) < LOAD_WEAK_BELOW).collect();

        let load_level = LoadLevel::from_papers_today(papers_today);
        let mut recommendations = Vec::new();
        match load_level {
            LoadLevel::Overload => recommendations.push(LoadRecommendation::OverloadWarning {
                message: "You've read many papers today. Consider taking a break.".to_string(),
                reason: "Cognitive overload reduces retention".to_string(),
            }),
            LoadLevel::Optimal => recommendations.push(LoadRecommendation::Engagement {
                message: "Good time to read a new paper".to_string(),
                reason: "Fresh cognitive capacity available".to_string(),
            }),
            LoadLevel::Moderate => {}
        }
        let needs_review = weak.len() > REVIEW_TRIGGER;
        if needs_review {
            recommendations.push(LoadRecommendation::ReviewNeeded {
                message: format!("Review {} papers with weak memory", weak.len()),
                reason: "Strengthen memories before they fade".to_string(),
                papers_to_review: weak
                    .iter()
                    .take(REVIEW_TITLES)
                    .map(|m| {
                        m.content
                            .title
                            .clone()
                            .or_else(|| m.content.paper_id.clone())
                            .unwrap_or_else(|| m.id.clone())
                    })
                    .collect(),
            });
        }

        Ok(CognitiveLoadReport {
            current_load: CurrentLoad {
                papers_today,
                load_level,
            },
            memory_health: LoadMemoryHealth {
                total_memories: all.len(),
                weak_memories: weak.len(),
                needs_review,
            },
            recommendations,
            optimal_schedule: ReadingSchedule::default(),
        })
    }

    /// Steps from the closest known concept to `target`.
    ///
    /// Fails with `NotFound` when no sampled known concept reaches the target.
    pub async fn learning_path(&self, researcher_id: &str, target: &str) -> ReasoningResult<LearningPath> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ReasoningError::MalformedInput("target concept is empty".into()));
        }
        tracing::info!(target: "scholae::fusion", researcher_id, target_concept = target, "generating learning path");
        let memories = self
            .memory
            .recall_paper_memories(researcher_id, None, PATH_MEMORY_LIMIT)
            .await?;
        let known = known_concepts(&memories);
        let known_lower: HashSet<String> = known.iter().map(|c| c.to_lowercase()).collect();

        let mut best: Option<(String, GraphPath)> = None;
        let mut answered = false;
        let mut last_error = None;
        for concept in known.iter().take(PATH_SAMPLE) {
            match self.reasoning.connections(concept, target, PATH_MAX_HOPS).await {
                Ok(paths) => {
                    answered = true;
                    if let Some(path) = paths.into_iter().next() {
                        let shorter = best
                            .as_ref()
                            .map_or(true, |(_, b)| path.path_length < b.path_length);
                        if shorter {
                            best = Some((concept.clone(), path));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "scholae::fusion", concept = %concept, error = %e, "connection lookup failed");
                    last_error = Some(e);
                }
            }
        }

        let Some((start, path)) = best else {
            if let (false, Some(e)) = (answered, last_error) {
                return Err(e);
            }
            return Err(ReasoningError::NotFound(format!(
                "no learning path to '{target}'; start with foundational papers in this area"
            )));
        };

        let steps: Vec<LearningStep> = path
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !known_lower.contains(&node.to_lowercase()))
            .map(|(i, node)| LearningStep {
                step: i + 1,
                concept: node.clone(),
                difficulty: Difficulty::at(i),
                estimated_time: format!("{} hours", (i + 1) * 2),
                action: format!("Read 2-3 papers on {node}"),
            })
            .collect();

        Ok(LearningPath {
            target_concept: target.to_string(),
            starting_point: start,
            total_steps: steps.len(),
            estimated_duration: format!("{} hours", steps.len() * 2),
            success_probability: if steps.len() < 5 { 0.8 } else { 0.6 },
            learning_path: steps,
            difficulty_level: "progressive".to_string(),
            path,
        })
    }

    /// Shortest connection between two concepts, explained by the generator when one
    /// is configured.
    pub async fn explain_connection(&self, concept1: &str, concept2: &str) -> ReasoningResult<ConnectionExplanation> {
        tracing::info!(target: "scholae::fusion", concept1, concept2, "explaining connection");
        let path = self
            .reasoning
            .connections(concept1, concept2, PATH_MAX_HOPS)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReasoningError::NotFound(format!("no connection between '{concept1}' and '{concept2}'"))
            })?;
        let rendered = path.nodes.join(" -> ");

        let request = GenerationRequest::new(
            "You are an expert at explaining complex academic relationships.",
            format!(
                "Explain the connection between \"{concept1}\" and \"{concept2}\" in academic research.\n\n\
                 The knowledge graph shows this connection path:\n{rendered}\n\n\
                 Provide a clear, concise explanation of how these concepts are related and why this \
                 connection is meaningful for researchers."
            ),
        )
        .with_temperature(0.6)
        .with_max_tokens(300);

        let (explanation, generated) = match self.caps.generate(&request).await? {
            Some(text) if !text.trim().is_empty() => (text.trim().to_string(), true),
            _ => (format!("{concept1} connects to {concept2} through {rendered}"), false),
        };
        Ok(ConnectionExplanation {
            concept1: concept1.to_string(),
            concept2: concept2.to_string(),
            path,
            explanation,
            generated,
        })
    }

    /// Answers a research question from the researcher's matching paper memories.
    ///
    /// Without a text generator the answer lists the matching papers. A generator
    /// failure yields an apology with confidence 0.0 rather than an error.
    pub async fn research_query(&self, researcher_id: &str, query: &str) -> ReasoningResult<QueryAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ReasoningError::MalformedInput("query is empty".into()));
        }
        tracing::info!(target: "scholae::fusion", researcher_id, query, "answering research query");

        let papers: Vec<Memory> = self
            .memory
            .search_memories(researcher_id, query, QUERY_SEARCH_LIMIT)
            .await?
            .into_iter()
            .filter(|m| m.content.kind == MemoryKind::PaperReading)
            .collect();
        let recent = self
            .memory
            .recent_paper_memories(researcher_id, QUERY_RECENT_HOURS)
            .await?
            .len();

        let relevant_papers: Vec<String> = papers.iter().filter_map(|m| m.content.paper_id.clone()).collect();
        let concepts_used = known_concepts(&papers);
        let titles: Vec<String> = papers.iter().take(QUERY_CONTEXT_PAPERS).map(paper_title).collect();

        let request = GenerationRequest::new(
            "You are a knowledgeable research assistant with expertise in academic literature.",
            format!(
                "Answer the following research query using the provided context from academic papers.\n\n\
                 Context:\n{}\n\n\
                 Researcher background: Recently read {recent} papers\n\n\
                 Query: {query}\n\n\
                 Provide a comprehensive answer with specific references to the papers mentioned in the context.",
                answer_context(&papers)
            ),
        )
        .with_temperature(0.7)
        .with_max_tokens(500);

        let (answer, confidence, sources, generated) = match self.caps.generate(&request).await {
            Ok(Some(text)) if !text.trim().is_empty() => (text.trim().to_string(), ANSWER_CONFIDENCE, titles, true),
            Ok(_) => {
                let answer = if titles.is_empty() {
                    format!("No paper memories match '{query}' yet.")
                } else {
                    format!("Relevant papers from your memory: {}", titles.join("; "))
                };
                (answer, 0.0, titles, false)
            }
            Err(e) => {
                tracing::warn!(target: "scholae::fusion", researcher_id, error = %e, "answer generation failed");
                (ANSWER_FAILED.to_string(), 0.0, Vec::new(), false)
            }
        };

        Ok(QueryAnswer {
            query: query.to_string(),
            answer,
            relevant_papers,
            concepts_used,
            sources: sources.into_iter().map(|title| AnswerSource { title }).collect(),
            confidence,
            generated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_levels() {
        assert_eq!(LoadLevel::from_papers_today(0), LoadLevel::Optimal);
        assert_eq!(LoadLevel::from_papers_today(1), LoadLevel::Moderate);
        assert_eq!(LoadLevel::from_papers_today(5), LoadLevel::Moderate);
        assert_eq!(LoadLevel::from_papers_today(6), LoadLevel::Overload);
    }

    #[test]
    fn difficulty_by_position() {
        assert_eq!(Difficulty::at(0), Difficulty::Easy);
        assert_eq!(Difficulty::at(1), Difficulty::Easy);
        assert_eq!(Difficulty::at(2), Difficulty::Medium);
        assert_eq!(Difficulty::at(3), Difficulty::Medium);
        assert_eq!(Difficulty::at(4), Difficulty::Hard);
    }

    #[test]
    fn answer_context_caps_papers_and_excerpts() {
        use crate::model::{MemoryContent, MemoryMetadata, MemoryType, NewMemory};
        let papers: Vec<Memory> = (0..7)
            .map(|i| {
                let content = MemoryContent::now(MemoryKind::PaperReading)
                    .with_paper(format!("p{i}"), (i > 0).then(|| format!("Title {i}")))
                    .with_abstract(Some("x".repeat(600)));
                Memory::new(
                    format!("m{i}"),
                    "r1",
                    NewMemory {
                        memory_type: MemoryType::Personal,
                        content,
                        metadata: MemoryMetadata::from_source("test"),
                    },
                )
            })
            .collect();
        let ctx = answer_context(&papers);
        assert_eq!(ctx.matches("Paper: ").count(), 5);
        assert!(ctx.starts_with("Paper: p0\n"));
        assert!(ctx.contains(&format!("Paper: Title 4\n{}", "x".repeat(500))));
        assert!(!ctx.contains(&"x".repeat(501)));
        assert!(!ctx.contains("Title 5"));
    }

    #[test]
    fn schedule_template() {
        let s = ReadingSchedule::default();
        assert_eq!(s.papers_per_day, 3);
        assert_eq!(s.review_frequency, "every 3 days");
    }
}
