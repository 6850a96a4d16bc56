//! Memory records and the shared result types built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Memory tier a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Working,
    Personal,
    Project,
    Institutional,
}

/// What produced a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    PaperReading,
    Annotation,
    Hypothesis,
    AgentInsight,
    Collaboration,
    ConsolidationSummary,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::PaperReading => "paper_reading",
            MemoryKind::Annotation => "annotation",
            MemoryKind::Hypothesis => "hypothesis",
            MemoryKind::AgentInsight => "agent_insight",
            MemoryKind::Collaboration => "collaboration",
            MemoryKind::ConsolidationSummary => "consolidation_summary",
        }
    }
}

/// Structured payload of a memory.
///
/// `timestamp` is kept as the raw string written by the producer so that an
/// unparseable value degrades strength to its default instead of failing a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContent {
    pub kind: MemoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Kind-specific extra data (agent insight, hypothesis details, collaboration record).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl MemoryContent {
    /// Empty content of the given kind stamped with the current time.
    pub fn now(kind: MemoryKind) -> Self {
        Self {
            kind,
            paper_id: None,
            title: None,
            abstract_text: None,
            key_concepts: Vec::new(),
            timestamp: Some(Utc::now().to_rfc3339()),
            annotation: None,
            payload: None,
        }
    }

    pub fn with_paper(mut self, paper_id: impl Into<String>, title: Option<String>) -> Self {
        self.paper_id = Some(paper_id.into());
        self.title = title;
        self
    }

    pub fn with_abstract(mut self, text: Option<String>) -> Self {
        self.abstract_text = text;
        self
    }

    pub fn with_concepts(mut self, concepts: Vec<String>) -> Self {
        self.key_concepts = concepts;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_annotation(mut self, text: impl Into<String>) -> Self {
        self.annotation = Some(text.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// All searchable text joined with spaces, lowercased.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<String> = vec![self.kind.as_str().to_string()];
        parts.extend(self.paper_id.iter().cloned());
        parts.extend(self.title.iter().cloned());
        parts.extend(self.abstract_text.iter().cloned());
        parts.extend(self.key_concepts.iter().cloned());
        parts.extend(self.annotation.iter().cloned());
        if let Some(p) = &self.payload {
            parts.push(p.to_string());
        }
        parts.join(" ").to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Absent means a single access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_count: Option<u32>,
    pub source: String,
}

impl MemoryMetadata {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            access_count: None,
            source: source.into(),
        }
    }
}

/// A record to be appended to a researcher namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMemory {
    pub memory_type: MemoryType,
    pub content: MemoryContent,
    pub metadata: MemoryMetadata,
}

/// A stored memory. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub researcher_id: String,
    pub memory_type: MemoryType,
    pub content: MemoryContent,
    pub metadata: MemoryMetadata,
}

impl Memory {
    /// Builds a memory directly, mainly for tests and fixtures.
    pub fn new(id: impl Into<String>, researcher_id: impl Into<String>, record: NewMemory) -> Self {
        Self {
            id: id.into(),
            researcher_id: researcher_id.into(),
            memory_type: record.memory_type,
            content: record.content,
            metadata: record.metadata,
        }
    }

    pub fn concepts(&self) -> &[String] {
        &self.content.key_concepts
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.content
            .timestamp
            .as_deref()
            .and_then(crate::memory::strength::parse_timestamp)
    }
}

/// Paper metadata handed to the memory service on ingest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub paper_id: String,
    pub title: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
}

/// Ordered traversal result: concept/paper identifiers and the relations between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    pub relationships: Vec<String>,
    pub path_length: usize,
}

impl GraphPath {
    pub fn new(nodes: Vec<String>, relationships: Vec<String>) -> Self {
        let path_length = nodes.len().saturating_sub(1);
        Self {
            nodes,
            relationships,
            path_length,
        }
    }
}

/// Paper id + title pair used in many graph results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRef {
    pub id: String,
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_serializes_abstract_field_name() {
        let content = MemoryContent::now(MemoryKind::PaperReading)
            .with_paper("p1", Some("Title".into()))
            .with_abstract(Some("Body".into()));
        let v = serde_json::to_value(&content).unwrap();
        assert_eq!(v["abstract"], "Body");
        assert_eq!(v["kind"], "paper_reading");
    }

    #[test]
    fn path_length_counts_edges() {
        let p = GraphPath::new(vec!["a".into(), "b".into(), "c".into()], vec!["X".into(), "Y".into()]);
        assert_eq!(p.path_length, 2);
        assert_eq!(GraphPath::new(vec!["a".into()], vec![]).path_length, 0);
    }
}
