//! Graph query capability: declarative patterns in, rows of named fields out.
//!
//! Each [`GraphPattern`] names one traversal the engines need together with its
//! parameters. Backends decide how to execute it: the in-memory adapter walks its
//! own adjacency maps, a Bolt adapter can send [`GraphPattern::to_cypher`] as-is.

use crate::error::CapabilityResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Traversals over the concept / paper / author / methodology graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum GraphPattern {
    /// Methodologies used by papers on both concepts.
    /// Rows: `method`, `source_papers` (≤2 titles), `target_papers` (≤2 titles).
    SharedMethodology { source: String, target: String, limit: usize },
    /// Concepts adjacent to both concepts. Rows: `concept`.
    BridgeConcepts { first: String, second: String, limit: usize },
    /// Pairs of papers on `concept` where one cites the other.
    /// Rows: `citing_paper`, `citing_title`, `cited_paper`, `cited_title`.
    CitingPairs { concept: String, limit: usize },
    /// Concepts co-discussed with `concept` in fewer than `below` papers, ascending.
    /// Rows: `concept`, `paper_count`.
    SparseCoOccurrence { concept: String, below: u64, limit: usize },
    /// Methodologies no paper on `concept` uses. Rows: `method`.
    UnappliedMethodologies { concept: String, limit: usize },
    /// Papers per year on `concept`, ascending by year. Rows: `year`, `paper_count`.
    PublicationTimeline { concept: String },
    /// Papers citing `paper_id` transitively within `max_depth` hops, by distance
    /// then year descending. Rows: `citing_id`, `title`, `year`, `distance`.
    CitationChain { paper_id: String, max_depth: u32, limit: usize },
    /// Papers discussing every concept. Rows: `paper_id`, `title`, `year`.
    PapersCoveringAll { concepts: Vec<String>, limit: usize },
    /// Methodologies reaching at least `min_coverage` of the concepts, by coverage
    /// descending. Rows: `method`, `covered_concepts`, `concept_count`.
    MethodologyCoverage { concepts: Vec<String>, min_coverage: usize, limit: usize },
    /// Author pairs (`author1 < author2`) with at least `min_joint` joint papers.
    /// Rows: `author1`, `author2`, `collaborations`.
    CoAuthorships { min_joint: u64, limit: usize },
    /// Concepts exactly `hops` steps from `concept`. Rows: `distant_concept`, `path_nodes`.
    ConceptsAtDistance { concept: String, hops: u32, limit: usize },
    /// Shortest paths between two concepts within `max_hops`.
    /// Rows: `nodes`, `relationships`, `path_length`.
    ShortestPaths { source: String, target: String, max_hops: u32 },
    /// Papers discussing `concept`, newest first. Rows: `paper_id`, `title`, `year`.
    RelatedPapers { concept: String, limit: usize },
    /// Papers a researcher has read. Rows: `paper_id`, `title`, `read_at`, `notes`.
    ResearcherPapers { researcher_id: String },
    /// Concepts by number of papers published in or after `year_threshold`.
    /// Rows: `concept`, `recent_count`.
    EmergingConcepts { year_threshold: i32, limit: usize },
}

impl GraphPattern {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GraphPattern::SharedMethodology { .. } => "shared_methodology",
            GraphPattern::BridgeConcepts { .. } => "bridge_concepts",
            GraphPattern::CitingPairs { .. } => "citing_pairs",
            GraphPattern::SparseCoOccurrence { .. } => "sparse_co_occurrence",
            GraphPattern::UnappliedMethodologies { .. } => "unapplied_methodologies",
            GraphPattern::PublicationTimeline { .. } => "publication_timeline",
            GraphPattern::CitationChain { .. } => "citation_chain",
            GraphPattern::PapersCoveringAll { .. } => "papers_covering_all",
            GraphPattern::MethodologyCoverage { .. } => "methodology_coverage",
            GraphPattern::CoAuthorships { .. } => "co_authorships",
            GraphPattern::ConceptsAtDistance { .. } => "concepts_at_distance",
            GraphPattern::ShortestPaths { .. } => "shortest_paths",
            GraphPattern::RelatedPapers { .. } => "related_papers",
            GraphPattern::ResearcherPapers { .. } => "researcher_papers",
            GraphPattern::EmergingConcepts { .. } => "emerging_concepts",
        }
    }

    /// Cypher text and parameter map for a Neo4j-compatible backend.
    ///
    /// Hop bounds cannot be parameters in Cypher, so they are rendered into the text.
    pub fn to_cypher(&self) -> (String, Value) {
        match self {
            GraphPattern::SharedMethodology { source, target, limit } => (
                "MATCH (c1:Concept {name: $source})<-[:DISCUSSES]-(p1:Paper)-[:USES_METHOD]->(m:Methodology) \
                 MATCH (c2:Concept {name: $target})<-[:DISCUSSES]-(p2:Paper)-[:USES_METHOD]->(m) \
                 RETURN m.name AS method, collect(DISTINCT p1.title)[0..2] AS source_papers, \
                 collect(DISTINCT p2.title)[0..2] AS target_papers LIMIT $limit"
                    .to_string(),
                json!({ "source": source, "target": target, "limit": limit }),
            ),
            GraphPattern::BridgeConcepts { first, second, limit } => (
                "MATCH (a:Concept {name: $first})-[:RELATED_TO]-(b:Concept)-[:RELATED_TO]-(c:Concept {name: $second}) \
                 WHERE b <> a AND b <> c RETURN DISTINCT b.name AS concept LIMIT $limit"
                    .to_string(),
                json!({ "first": first, "second": second, "limit": limit }),
            ),
            GraphPattern::CitingPairs { concept, limit } => (
                "MATCH (c:Concept {name: $concept})<-[:DISCUSSES]-(p1:Paper) \
                 MATCH (c)<-[:DISCUSSES]-(p2:Paper) \
                 WHERE p1.paper_id <> p2.paper_id AND (p1)-[:CITES]->(p2) \
                 RETURN p1.paper_id AS citing_paper, p1.title AS citing_title, \
                 p2.paper_id AS cited_paper, p2.title AS cited_title LIMIT $limit"
                    .to_string(),
                json!({ "concept": concept, "limit": limit }),
            ),
            GraphPattern::SparseCoOccurrence { concept, below, limit } => (
                "MATCH (c:Concept {name: $concept})<-[:DISCUSSES]-(p:Paper)-[:DISCUSSES]->(related:Concept) \
                 WITH related, count(p) AS paper_count WHERE paper_count < $below \
                 RETURN related.name AS concept, paper_count ORDER BY paper_count ASC LIMIT $limit"
                    .to_string(),
                json!({ "concept": concept, "below": below, "limit": limit }),
            ),
            GraphPattern::UnappliedMethodologies { concept, limit } => (
                "MATCH (m:Methodology) \
                 WHERE NOT (m)<-[:USES_METHOD]-(:Paper)-[:DISCUSSES]->(:Concept {name: $concept}) \
                 RETURN m.name AS method LIMIT $limit"
                    .to_string(),
                json!({ "concept": concept, "limit": limit }),
            ),
            GraphPattern::PublicationTimeline { concept } => (
                "MATCH (c:Concept {name: $concept})<-[:DISCUSSES]-(p:Paper) WHERE p.year IS NOT NULL \
                 RETURN p.year AS year, count(p) AS paper_count ORDER BY year ASC"
                    .to_string(),
                json!({ "concept": concept }),
            ),
            GraphPattern::CitationChain { paper_id, max_depth, limit } => (
                format!(
                    "MATCH path = (p:Paper {{paper_id: $paper_id}})<-[:CITES*1..{}]-(citing:Paper) \
                     RETURN citing.paper_id AS citing_id, citing.title AS title, citing.year AS year, \
                     min(length(path)) AS distance ORDER BY distance, year DESC LIMIT $limit",
                    (*max_depth).max(1)
                ),
                json!({ "paper_id": paper_id, "limit": limit }),
            ),
            GraphPattern::PapersCoveringAll { concepts, limit } => (
                "MATCH (p:Paper) WHERE ALL(name IN $concepts WHERE (p)-[:DISCUSSES]->(:Concept {name: name})) \
                 RETURN p.paper_id AS paper_id, p.title AS title, p.year AS year LIMIT $limit"
                    .to_string(),
                json!({ "concepts": concepts, "limit": limit }),
            ),
            GraphPattern::MethodologyCoverage { concepts, min_coverage, limit } => (
                "UNWIND $concepts AS name \
                 MATCH (c:Concept {name: name})<-[:DISCUSSES]-(p:Paper)-[:USES_METHOD]->(m:Methodology) \
                 WITH m, collect(DISTINCT name) AS covered_concepts WHERE size(covered_concepts) >= $min_coverage \
                 RETURN m.name AS method, covered_concepts, size(covered_concepts) AS concept_count \
                 ORDER BY concept_count DESC LIMIT $limit"
                    .to_string(),
                json!({ "concepts": concepts, "min_coverage": min_coverage, "limit": limit }),
            ),
            GraphPattern::CoAuthorships { min_joint, limit } => (
                "MATCH (a1:Author)<-[:AUTHORED_BY]-(p:Paper)-[:AUTHORED_BY]->(a2:Author) \
                 WHERE a1.name < a2.name WITH a1, a2, count(p) AS collaborations \
                 WHERE collaborations >= $min_joint \
                 RETURN a1.name AS author1, a2.name AS author2, collaborations LIMIT $limit"
                    .to_string(),
                json!({ "min_joint": min_joint, "limit": limit }),
            ),
            GraphPattern::ConceptsAtDistance { concept, hops, limit } => (
                format!(
                    "MATCH path = (c1:Concept {{name: $concept}})-[:RELATED_TO*{h}..{h}]-(c2:Concept) \
                     WHERE c1 <> c2 RETURN c2.name AS distant_concept, \
                     [n IN nodes(path) | n.name] AS path_nodes LIMIT $limit",
                    h = (*hops).max(1)
                ),
                json!({ "concept": concept, "limit": limit }),
            ),
            GraphPattern::ShortestPaths { source, target, max_hops } => (
                format!(
                    "MATCH path = allShortestPaths((a:Concept {{name: $source}})-[*..{}]-(b:Concept {{name: $target}})) \
                     RETURN [n IN nodes(path) | coalesce(n.name, n.paper_id)] AS nodes, \
                     [r IN relationships(path) | type(r)] AS relationships, length(path) AS path_length",
                    (*max_hops).max(1)
                ),
                json!({ "source": source, "target": target }),
            ),
            GraphPattern::RelatedPapers { concept, limit } => (
                "MATCH (c:Concept {name: $concept})<-[:DISCUSSES]-(p:Paper) \
                 RETURN p.paper_id AS paper_id, p.title AS title, p.year AS year \
                 ORDER BY p.year DESC LIMIT $limit"
                    .to_string(),
                json!({ "concept": concept, "limit": limit }),
            ),
            GraphPattern::ResearcherPapers { researcher_id } => (
                "MATCH (r:Researcher {researcher_id: $researcher_id})-[rel:READ]->(p:Paper) \
                 RETURN p.paper_id AS paper_id, p.title AS title, rel.read_at AS read_at, rel.notes AS notes \
                 ORDER BY rel.read_at DESC"
                    .to_string(),
                json!({ "researcher_id": researcher_id }),
            ),
            GraphPattern::EmergingConcepts { year_threshold, limit } => (
                "MATCH (c:Concept)<-[:DISCUSSES]-(p:Paper) WHERE p.year >= $year_threshold \
                 WITH c, count(p) AS recent_count RETURN c.name AS concept, recent_count \
                 ORDER BY recent_count DESC LIMIT $limit"
                    .to_string(),
                json!({ "year_threshold": year_threshold, "limit": limit }),
            ),
        }
    }
}

/// One result row: named fields with loosely typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphRecord(Map<String, Value>);

impl GraphRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn string(&self, field: &str) -> Option<String> {
        self.str(field).map(str::to_string)
    }

    pub fn i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn u64(&self, field: &str) -> Option<u64> {
        self.0.get(field).and_then(Value::as_u64)
    }

    /// String array field; non-string elements are skipped.
    pub fn strings(&self, field: &str) -> Vec<String> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for GraphRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Executes graph patterns. Implementations must be safe to share across tasks.
#[async_trait]
pub trait GraphQuery: Send + Sync {
    async fn query(&self, pattern: &GraphPattern) -> CapabilityResult<Vec<GraphRecord>>;

    /// Backend label for logs.
    fn backend(&self) -> &str;
}
