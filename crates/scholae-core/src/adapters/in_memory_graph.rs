//! In-process research graph executing every [`GraphPattern`].
//!
//! Papers carry their concepts, methodologies, authors and outgoing citations.
//! Concepts are linked by undirected `RELATED_TO` edges; papers discussing two
//! concepts relate them automatically. Researcher `READ` edges point at papers.
//! The graph is built up front and then shared read-only.

use crate::capabilities::{GraphPattern, GraphQuery, GraphRecord};
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;

const RELATED_TO: &str = "RELATED_TO";
/// Upper bound on paths returned for one shortest-path query.
const MAX_SHORTEST_PATHS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperNode {
    pub paper_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub methodologies: Vec<String>,
    /// Ids of papers this paper cites.
    #[serde(default)]
    pub cites: Vec<String>,
}

impl PaperNode {
    pub fn new(paper_id: impl Into<String>, title: impl Into<String>, year: i64) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: Some(title.into()),
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn concepts(mut self, concepts: &[&str]) -> Self {
        self.concepts = concepts.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn methods(mut self, methods: &[&str]) -> Self {
        self.methodologies = methods.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn authors(mut self, authors: &[&str]) -> Self {
        self.authors = authors.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn cites(mut self, cited: &[&str]) -> Self {
        self.cites = cited.iter().map(|c| c.to_string()).collect();
        self
    }

    fn discusses(&self, concept: &str) -> bool {
        self.concepts.iter().any(|c| c == concept)
    }

    fn label(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.paper_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadEdge {
    pub researcher_id: String,
    pub paper_id: String,
    #[serde(default)]
    pub read_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Serialized form of a graph, used to seed the backend from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub papers: Vec<PaperNode>,
    /// Explicit concept links in addition to those implied by co-discussion.
    #[serde(default)]
    pub related: Vec<(String, String)>,
    #[serde(default)]
    pub reads: Vec<ReadEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    papers: Vec<PaperNode>,
    index: HashMap<String, usize>,
    related: BTreeMap<String, BTreeSet<String>>,
    reads: Vec<ReadEdge>,
}

fn descending_year(a: Option<i64>, b: Option<i64>) -> std::cmp::Ordering {
    // Missing years sort last.
    b.unwrap_or(i64::MIN).cmp(&a.unwrap_or(i64::MIN))
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = Self::new();
        for paper in snapshot.papers {
            graph.add_paper(paper);
        }
        for (a, b) in snapshot.related {
            graph.relate(&a, &b);
        }
        graph.reads = snapshot.reads;
        graph
    }

    /// Loads a JSON [`GraphSnapshot`] from disk.
    pub fn load_json<P: AsRef<Path>>(path: P) -> CapabilityResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CapabilityError::Unavailable(format!("{}: {e}", path.display())))?;
        let snapshot: GraphSnapshot = serde_json::from_str(&raw)?;
        tracing::info!(target: "scholae::graph", path = %path.display(), papers = snapshot.papers.len(), "graph snapshot loaded");
        Ok(Self::from_snapshot(snapshot))
    }

    /// Adds or replaces a paper and relates every pair of concepts it discusses.
    pub fn add_paper(&mut self, paper: PaperNode) -> &mut Self {
        for (i, a) in paper.concepts.iter().enumerate() {
            self.related.entry(a.clone()).or_default();
            for b in &paper.concepts[i + 1..] {
                self.link(a, b);
            }
        }
        match self.index.get(&paper.paper_id) {
            Some(&i) => self.papers[i] = paper,
            None => {
                self.index.insert(paper.paper_id.clone(), self.papers.len());
                self.papers.push(paper);
            }
        }
        self
    }

    pub fn relate(&mut self, a: &str, b: &str) -> &mut Self {
        self.link(a, b);
        self
    }

    pub fn mark_read(
        &mut self,
        researcher_id: &str,
        paper_id: &str,
        read_at: Option<&str>,
        notes: Option<&str>,
    ) -> &mut Self {
        self.reads.push(ReadEdge {
            researcher_id: researcher_id.to_string(),
            paper_id: paper_id.to_string(),
            read_at: read_at.map(str::to_string),
            notes: notes.map(str::to_string),
        });
        self
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let mut related = Vec::new();
        for (a, neighbours) in &self.related {
            related.extend(neighbours.iter().filter(|b| a < *b).map(|b| (a.clone(), b.clone())));
        }
        GraphSnapshot {
            papers: self.papers.clone(),
            related,
            reads: self.reads.clone(),
        }
    }

    fn link(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.related.entry(a.to_string()).or_default().insert(b.to_string());
        self.related.entry(b.to_string()).or_default().insert(a.to_string());
    }

    fn papers_on<'a>(&'a self, concept: &'a str) -> impl Iterator<Item = &'a PaperNode> + 'a {
        self.papers.iter().filter(move |p| p.discusses(concept))
    }

    fn neighbours(&self, concept: &str) -> impl Iterator<Item = &String> {
        self.related.get(concept).into_iter().flatten()
    }

    /// Methodologies in first-seen order across all papers.
    fn all_methods(&self) -> Vec<&String> {
        let mut seen = HashSet::new();
        self.papers
            .iter()
            .flat_map(|p| &p.methodologies)
            .filter(|m| seen.insert(m.as_str()))
            .collect()
    }

    /// BFS distances and parent lists over `RELATED_TO`, up to `max_hops`.
    fn bfs(&self, source: &str, max_hops: u32) -> HashMap<String, (u32, Vec<String>)> {
        let mut seen: HashMap<String, (u32, Vec<String>)> = HashMap::new();
        seen.insert(source.to_string(), (0, Vec::new()));
        let mut queue = VecDeque::from([source.to_string()]);
        while let Some(node) = queue.pop_front() {
            let depth = seen.get(&node).map_or(0, |(d, _)| *d);
            if depth >= max_hops {
                continue;
            }
            for next in self.neighbours(&node) {
                match seen.get_mut(next) {
                    Some((d, parents)) if *d == depth + 1 => parents.push(node.clone()),
                    Some(_) => {}
                    None => {
                        seen.insert(next.clone(), (depth + 1, vec![node.clone()]));
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        seen
    }

    fn shared_methodology(&self, source: &str, target: &str, limit: usize) -> Vec<GraphRecord> {
        let mut rows = Vec::new();
        for method in self.all_methods() {
            let titles = |concept: &str| -> Vec<String> {
                let mut out: Vec<String> = Vec::new();
                for p in self.papers_on(concept).filter(|p| p.methodologies.contains(method)) {
                    let label = p.label();
                    if !out.contains(&label) {
                        out.push(label);
                    }
                }
                out
            };
            let (src, tgt) = (titles(source), titles(target));
            if src.is_empty() || tgt.is_empty() {
                continue;
            }
            rows.push(
                GraphRecord::new()
                    .with("method", method.as_str())
                    .with("source_papers", json!(src.into_iter().take(2).collect::<Vec<_>>()))
                    .with("target_papers", json!(tgt.into_iter().take(2).collect::<Vec<_>>())),
            );
        }
        rows.truncate(limit);
        rows
    }

    fn bridge_concepts(&self, first: &str, second: &str, limit: usize) -> Vec<GraphRecord> {
        let other: HashSet<&String> = self.neighbours(second).collect();
        self.neighbours(first)
            .filter(|b| other.contains(b) && b.as_str() != first && b.as_str() != second)
            .take(limit)
            .map(|b| GraphRecord::new().with("concept", b.as_str()))
            .collect()
    }

    fn citing_pairs(&self, concept: &str, limit: usize) -> Vec<GraphRecord> {
        let on: HashMap<&str, &PaperNode> = self.papers_on(concept).map(|p| (p.paper_id.as_str(), p)).collect();
        let mut rows = Vec::new();
        for citing in self.papers_on(concept) {
            for cited_id in &citing.cites {
                let Some(cited) = on.get(cited_id.as_str()) else { continue };
                if cited.paper_id == citing.paper_id {
                    continue;
                }
                rows.push(
                    GraphRecord::new()
                        .with("citing_paper", citing.paper_id.as_str())
                        .with("citing_title", json!(citing.title))
                        .with("cited_paper", cited.paper_id.as_str())
                        .with("cited_title", json!(cited.title)),
                );
            }
        }
        rows.truncate(limit);
        rows
    }

    fn sparse_co_occurrence(&self, concept: &str, below: u64, limit: usize) -> Vec<GraphRecord> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for p in self.papers_on(concept) {
            let distinct: BTreeSet<&str> = p.concepts.iter().map(String::as_str).filter(|c| *c != concept).collect();
            for c in distinct {
                *counts.entry(c).or_insert(0) += 1;
            }
        }
        let mut sparse: Vec<(&str, u64)> = counts.into_iter().filter(|(_, n)| *n < below).collect();
        sparse.sort_by_key(|(_, n)| *n);
        sparse
            .into_iter()
            .take(limit)
            .map(|(c, n)| GraphRecord::new().with("concept", c).with("paper_count", n))
            .collect()
    }

    fn unapplied_methodologies(&self, concept: &str, limit: usize) -> Vec<GraphRecord> {
        let applied: HashSet<&String> = self.papers_on(concept).flat_map(|p| &p.methodologies).collect();
        self.all_methods()
            .into_iter()
            .filter(|m| !applied.contains(m))
            .take(limit)
            .map(|m| GraphRecord::new().with("method", m.as_str()))
            .collect()
    }

    fn publication_timeline(&self, concept: &str) -> Vec<GraphRecord> {
        let mut years: BTreeMap<i64, u64> = BTreeMap::new();
        for year in self.papers_on(concept).filter_map(|p| p.year) {
            *years.entry(year).or_insert(0) += 1;
        }
        years
            .into_iter()
            .map(|(year, n)| GraphRecord::new().with("year", year).with("paper_count", n))
            .collect()
    }

    fn citation_chain(&self, paper_id: &str, max_depth: u32, limit: usize) -> Vec<GraphRecord> {
        let mut cited_by: HashMap<&str, Vec<&PaperNode>> = HashMap::new();
        for p in &self.papers {
            for cited in &p.cites {
                cited_by.entry(cited.as_str()).or_default().push(p);
            }
        }
        let max_depth = max_depth.max(1);
        let mut distance: HashMap<&str, u32> = HashMap::from([(paper_id, 0)]);
        let mut found: Vec<(&PaperNode, u32)> = Vec::new();
        let mut queue = VecDeque::from([(paper_id, 0u32)]);
        while let Some((id, d)) = queue.pop_front() {
            if d >= max_depth {
                continue;
            }
            for &citing in cited_by.get(id).into_iter().flatten() {
                if distance.contains_key(citing.paper_id.as_str()) {
                    continue;
                }
                distance.insert(citing.paper_id.as_str(), d + 1);
                found.push((citing, d + 1));
                queue.push_back((citing.paper_id.as_str(), d + 1));
            }
        }
        found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| descending_year(a.0.year, b.0.year)));
        found
            .into_iter()
            .take(limit)
            .map(|(p, d)| {
                GraphRecord::new()
                    .with("citing_id", p.paper_id.as_str())
                    .with("title", json!(p.title))
                    .with("year", json!(p.year))
                    .with("distance", d)
            })
            .collect()
    }

    fn paper_row(p: &PaperNode) -> GraphRecord {
        GraphRecord::new()
            .with("paper_id", p.paper_id.as_str())
            .with("title", json!(p.title))
            .with("year", json!(p.year))
    }

    fn papers_covering_all(&self, concepts: &[String], limit: usize) -> Vec<GraphRecord> {
        self.papers
            .iter()
            .filter(|p| concepts.iter().all(|c| p.discusses(c)))
            .take(limit)
            .map(Self::paper_row)
            .collect()
    }

    fn methodology_coverage(&self, concepts: &[String], min_coverage: usize, limit: usize) -> Vec<GraphRecord> {
        let mut rows: Vec<(&String, Vec<&String>)> = self
            .all_methods()
            .into_iter()
            .map(|m| {
                let covered: Vec<&String> = concepts
                    .iter()
                    .filter(|c| self.papers_on(c).any(|p| p.methodologies.contains(m)))
                    .collect();
                (m, covered)
            })
            .filter(|(_, covered)| covered.len() >= min_coverage)
            .collect();
        rows.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        rows.into_iter()
            .take(limit)
            .map(|(m, covered)| {
                GraphRecord::new()
                    .with("method", m.as_str())
                    .with("concept_count", covered.len())
                    .with("covered_concepts", json!(covered))
            })
            .collect()
    }

    fn co_authorships(&self, min_joint: u64, limit: usize) -> Vec<GraphRecord> {
        let mut pairs: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        for p in &self.papers {
            let authors: BTreeSet<&str> = p.authors.iter().map(String::as_str).collect();
            let authors: Vec<&str> = authors.into_iter().collect();
            for (i, a) in authors.iter().enumerate() {
                for b in &authors[i + 1..] {
                    *pairs.entry((*a, *b)).or_insert(0) += 1;
                }
            }
        }
        pairs
            .into_iter()
            .filter(|(_, n)| *n >= min_joint)
            .take(limit)
            .map(|((a, b), n)| {
                GraphRecord::new()
                    .with("author1", a)
                    .with("author2", b)
                    .with("collaborations", n)
            })
            .collect()
    }

    /// Concepts whose shortest `RELATED_TO` distance is exactly `hops`.
    fn concepts_at_distance(&self, concept: &str, hops: u32, limit: usize) -> Vec<GraphRecord> {
        if !self.related.contains_key(concept) {
            return Vec::new();
        }
        let hops = hops.max(1);
        let reached = self.bfs(concept, hops);
        let mut at: Vec<&String> = reached
            .iter()
            .filter(|(_, (d, _))| *d == hops)
            .map(|(name, _)| name)
            .collect();
        at.sort();
        at.into_iter()
            .take(limit)
            .map(|name| {
                let mut path = vec![name.clone()];
                let mut cursor = name;
                while let Some(parent) = reached.get(cursor).and_then(|(_, ps)| ps.iter().min()) {
                    path.push(parent.clone());
                    cursor = parent;
                }
                path.reverse();
                GraphRecord::new()
                    .with("distant_concept", name.as_str())
                    .with("path_nodes", json!(path))
            })
            .collect()
    }

    /// All shortest `RELATED_TO` paths, capped at [`MAX_SHORTEST_PATHS`].
    fn shortest_paths(&self, source: &str, target: &str, max_hops: u32) -> Vec<GraphRecord> {
        if !self.related.contains_key(source) || !self.related.contains_key(target) {
            return Vec::new();
        }
        let reached = self.bfs(source, max_hops.max(1));
        if !reached.contains_key(target) {
            return Vec::new();
        }

        let mut complete: Vec<Vec<String>> = Vec::new();
        let mut partial: Vec<Vec<String>> = vec![vec![target.to_string()]];
        while let Some(path) = partial.pop() {
            if complete.len() >= MAX_SHORTEST_PATHS {
                break;
            }
            let head = path.last().map(String::as_str).unwrap_or(target);
            let parents = reached.get(head).map(|(_, ps)| ps.as_slice()).unwrap_or_default();
            if parents.is_empty() {
                let mut full = path;
                full.reverse();
                complete.push(full);
                continue;
            }
            let mut sorted: Vec<&String> = parents.iter().collect();
            sorted.sort();
            for parent in sorted.into_iter().rev() {
                let mut next = path.clone();
                next.push(parent.clone());
                partial.push(next);
            }
        }

        complete
            .into_iter()
            .map(|nodes| {
                let length = nodes.len().saturating_sub(1);
                GraphRecord::new()
                    .with("relationships", json!(vec![RELATED_TO; length]))
                    .with("path_length", length)
                    .with("nodes", json!(nodes))
            })
            .collect()
    }

    fn related_papers(&self, concept: &str, limit: usize) -> Vec<GraphRecord> {
        let mut papers: Vec<&PaperNode> = self.papers_on(concept).collect();
        papers.sort_by(|a, b| descending_year(a.year, b.year));
        papers.into_iter().take(limit).map(Self::paper_row).collect()
    }

    fn researcher_papers(&self, researcher_id: &str) -> Vec<GraphRecord> {
        let mut reads: Vec<&ReadEdge> = self
            .reads
            .iter()
            .filter(|r| r.researcher_id == researcher_id && self.index.contains_key(&r.paper_id))
            .collect();
        reads.sort_by(|a, b| b.read_at.cmp(&a.read_at));
        reads
            .into_iter()
            .filter_map(|r| {
                let paper = self.papers.get(*self.index.get(&r.paper_id)?)?;
                Some(
                    GraphRecord::new()
                        .with("paper_id", paper.paper_id.as_str())
                        .with("title", json!(paper.title))
                        .with("read_at", json!(r.read_at))
                        .with("notes", json!(r.notes)),
                )
            })
            .collect()
    }

    fn emerging_concepts(&self, year_threshold: i32, limit: usize) -> Vec<GraphRecord> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for p in self.papers.iter().filter(|p| p.year.is_some_and(|y| y >= i64::from(year_threshold))) {
            let distinct: BTreeSet<&str> = p.concepts.iter().map(String::as_str).collect();
            for c in distinct {
                *counts.entry(c).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(c, n)| GraphRecord::new().with("concept", c).with("recent_count", n))
            .collect()
    }
}

#[async_trait]
impl GraphQuery for InMemoryGraph {
    async fn query(&self, pattern: &GraphPattern) -> CapabilityResult<Vec<GraphRecord>> {
        let rows = match pattern {
            GraphPattern::SharedMethodology { source, target, limit } => self.shared_methodology(source, target, *limit),
            GraphPattern::BridgeConcepts { first, second, limit } => self.bridge_concepts(first, second, *limit),
            GraphPattern::CitingPairs { concept, limit } => self.citing_pairs(concept, *limit),
            GraphPattern::SparseCoOccurrence { concept, below, limit } => {
                self.sparse_co_occurrence(concept, *below, *limit)
            }
            GraphPattern::UnappliedMethodologies { concept, limit } => self.unapplied_methodologies(concept, *limit),
            GraphPattern::PublicationTimeline { concept } => self.publication_timeline(concept),
            GraphPattern::CitationChain { paper_id, max_depth, limit } => {
                self.citation_chain(paper_id, *max_depth, *limit)
            }
            GraphPattern::PapersCoveringAll { concepts, limit } => self.papers_covering_all(concepts, *limit),
            GraphPattern::MethodologyCoverage { concepts, min_coverage, limit } => {
                self.methodology_coverage(concepts, *min_coverage, *limit)
            }
            GraphPattern::CoAuthorships { min_joint, limit } => self.co_authorships(*min_joint, *limit),
            GraphPattern::ConceptsAtDistance { concept, hops, limit } => {
                self.concepts_at_distance(concept, *hops, *limit)
            }
            GraphPattern::ShortestPaths { source, target, max_hops } => self.shortest_paths(source, target, *max_hops),
            GraphPattern::RelatedPapers { concept, limit } => self.related_papers(concept, *limit),
            GraphPattern::ResearcherPapers { researcher_id } => self.researcher_papers(researcher_id),
            GraphPattern::EmergingConcepts { year_threshold, limit } => self.emerging_concepts(*year_threshold, *limit),
        };
        Ok(rows)
    }

    fn backend(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryGraph {
        let mut g = InMemoryGraph::new();
        g.add_paper(
            PaperNode::new("p1", "Attention Is All You Need", 2017)
                .concepts(&["transformers", "attention"])
                .methods(&["ablation study"])
                .authors(&["Vaswani", "Shazeer"]),
        )
        .add_paper(
            PaperNode::new("p2", "BERT", 2019)
                .concepts(&["transformers", "pretraining"])
                .methods(&["ablation study", "fine-tuning"])
                .authors(&["Devlin", "Chang"])
                .cites(&["p1"]),
        )
        .add_paper(
            PaperNode::new("p3", "Protein Folding", 2021)
                .concepts(&["protein structure", "attention"])
                .methods(&["ablation study"])
                .authors(&["Jumper", "Vaswani", "Shazeer"])
                .cites(&["p2"]),
        )
        .mark_read("r1", "p1", Some("2024-01-01"), None);
        g
    }

    async fn run(g: &InMemoryGraph, p: GraphPattern) -> Vec<GraphRecord> {
        g.query(&p).await.unwrap()
    }

    #[tokio::test]
    async fn citation_chain_counts_each_paper_once_at_shortest_distance() {
        let rows = run(&sample(), GraphPattern::CitationChain { paper_id: "p1".into(), max_depth: 3, limit: 50 }).await;
        let got: Vec<_> = rows.iter().map(|r| (r.string("citing_id").unwrap(), r.u64("distance").unwrap())).collect();
        assert_eq!(got, vec![("p2".to_string(), 1), ("p3".to_string(), 2)]);
    }

    #[tokio::test]
    async fn shortest_path_through_shared_concept() {
        let rows = run(
            &sample(),
            GraphPattern::ShortestPaths { source: "pretraining".into(), target: "protein structure".into(), max_hops: 5 },
        )
        .await;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].strings("nodes"),
            vec!["pretraining", "transformers", "attention", "protein structure"]
        );
        assert_eq!(rows[0].u64("path_length"), Some(3));
    }

    #[tokio::test]
    async fn unknown_concepts_have_no_paths() {
        let rows = run(
            &sample(),
            GraphPattern::ShortestPaths { source: "nope".into(), target: "attention".into(), max_hops: 5 },
        )
        .await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn shared_methodology_requires_both_sides() {
        let rows = run(
            &sample(),
            GraphPattern::SharedMethodology { source: "transformers".into(), target: "protein structure".into(), limit: 5 },
        )
        .await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].str("method"), Some("ablation study"));
        assert_eq!(rows[0].strings("target_papers"), vec!["Protein Folding"]);
    }

    #[tokio::test]
    async fn co_authorship_pairs_sorted() {
        let rows = run(&sample(), GraphPattern::CoAuthorships { min_joint: 2, limit: 20 }).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].str("author1"), Some("Shazeer"));
        assert_eq!(rows[0].str("author2"), Some("Vaswani"));
    }

    #[tokio::test]
    async fn concepts_at_exact_distance() {
        let rows = run(&sample(), GraphPattern::ConceptsAtDistance { concept: "pretraining".into(), hops: 2, limit: 10 }).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].str("distant_concept"), Some("attention"));
        assert_eq!(rows[0].strings("path_nodes"), vec!["pretraining", "transformers", "attention"]);
    }

    #[tokio::test]
    async fn snapshot_roundtrip_preserves_queries() {
        let g = sample();
        let rebuilt = InMemoryGraph::from_snapshot(g.snapshot());
        let rows = run(&rebuilt, GraphPattern::ResearcherPapers { researcher_id: "r1".into() }).await;
        assert_eq!(rows[0].str("paper_id"), Some("p1"));
    }
}
