//! Typed writes and reads over the memory store for one researcher namespace.

use crate::capabilities::{Capabilities, MemoryFilter};
use crate::error::{ReasoningError, ReasoningResult};
use crate::model::{
    Memory, MemoryContent, MemoryKind, MemoryMetadata, MemoryType, NewMemory, PaperRecord,
};
use chrono::{Duration, Utc};
use serde_json::json;

/// Upper bound on records read by `recent_context`.
const RECENT_CONTEXT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct ResearchMemory {
    caps: Capabilities,
}

fn require_id(researcher_id: &str) -> ReasoningResult<()> {
    if researcher_id.trim().is_empty() {
        return Err(ReasoningError::MalformedInput("researcher_id is empty".into()));
    }
    Ok(())
}

impl ResearchMemory {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// Records that a researcher read a paper.
    pub async fn store_paper_memory(
        &self,
        researcher_id: &str,
        paper: &PaperRecord,
    ) -> ReasoningResult<String> {
        require_id(researcher_id)?;
        if paper.paper_id.trim().is_empty() {
            return Err(ReasoningError::MalformedInput("paper_id is empty".into()));
        }
        let record = NewMemory {
            memory_type: MemoryType::Personal,
            content: MemoryContent::now(MemoryKind::PaperReading)
                .with_paper(paper.paper_id.clone(), paper.title.clone())
                .with_abstract(paper.abstract_text.clone())
                .with_concepts(paper.concepts.clone()),
            metadata: MemoryMetadata::from_source("pdf_upload"),
        };
        let id = self.caps.put(researcher_id, record).await?;
        tracing::info!(target: "scholae::memory", researcher_id, paper_id = %paper.paper_id, memory_id = %id, "paper memory stored");
        Ok(id)
    }

    pub async fn store_annotation(
        &self,
        researcher_id: &str,
        paper_id: &str,
        annotation: &str,
        annotation_type: &str,
    ) -> ReasoningResult<String> {
        require_id(researcher_id)?;
        let record = NewMemory {
            memory_type: MemoryType::Personal,
            content: MemoryContent::now(MemoryKind::Annotation)
                .with_paper(paper_id, None)
                .with_annotation(annotation)
                .with_payload(json!({ "annotation_type": annotation_type })),
            metadata: MemoryMetadata::from_source("user_annotation"),
        };
        self.caps.put(researcher_id, record).await
    }

    /// Persists a finalized hypothesis as a project memory.
    pub async fn store_hypothesis(
        &self,
        researcher_id: &str,
        hypothesis: &str,
        supporting_papers: &[String],
        confidence: f64,
    ) -> ReasoningResult<String> {
        require_id(researcher_id)?;
        if hypothesis.trim().is_empty() {
            return Err(ReasoningError::MalformedInput("hypothesis text is empty".into()));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ReasoningError::MalformedInput(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        let record = NewMemory {
            memory_type: MemoryType::Project,
            content: MemoryContent::now(MemoryKind::Hypothesis)
                .with_annotation(hypothesis)
                .with_payload(json!({
                    "supporting_papers": supporting_papers,
                    "confidence": confidence,
                })),
            metadata: MemoryMetadata::from_source("hypothesis"),
        };
        self.caps.put(researcher_id, record).await
    }

    /// Appends a project-scoped record of the given kind with a structured payload.
    pub async fn store_project_record(
        &self,
        researcher_id: &str,
        kind: MemoryKind,
        source: &str,
        payload: serde_json::Value,
    ) -> ReasoningResult<String> {
        require_id(researcher_id)?;
        let record = NewMemory {
            memory_type: MemoryType::Project,
            content: MemoryContent::now(kind).with_payload(payload),
            metadata: MemoryMetadata::from_source(source),
        };
        self.caps.put(researcher_id, record).await
    }

    /// Paper-reading memories, newest first, optionally for one paper.
    pub async fn recall_paper_memories(
        &self,
        researcher_id: &str,
        paper_id: Option<&str>,
        limit: usize,
    ) -> ReasoningResult<Vec<Memory>> {
        require_id(researcher_id)?;
        let mut filter = MemoryFilter::kind(MemoryKind::PaperReading);
        if let Some(pid) = paper_id {
            filter = filter.with_paper(pid);
        }
        self.caps.recall(researcher_id, &filter, limit).await
    }

    pub async fn search_memories(
        &self,
        researcher_id: &str,
        query: &str,
        limit: usize,
    ) -> ReasoningResult<Vec<Memory>> {
        require_id(researcher_id)?;
        self.caps.search(researcher_id, query, limit).await
    }

    /// Every memory written in the last `hours`.
    pub async fn recent_context(&self, researcher_id: &str, hours: i64) -> ReasoningResult<Vec<Memory>> {
        self.recent(researcher_id, MemoryFilter::all(), hours).await
    }

    /// Paper readings from the last `hours`; other kinds never crowd them out of the window.
    pub async fn recent_paper_memories(&self, researcher_id: &str, hours: i64) -> ReasoningResult<Vec<Memory>> {
        self.recent(researcher_id, MemoryFilter::kind(MemoryKind::PaperReading), hours)
            .await
    }

    async fn recent(&self, researcher_id: &str, filter: MemoryFilter, hours: i64) -> ReasoningResult<Vec<Memory>> {
        require_id(researcher_id)?;
        let since = Utc::now() - Duration::hours(hours.max(0));
        self.caps
            .recall(researcher_id, &filter.since(since), RECENT_CONTEXT_LIMIT)
            .await
    }
}
