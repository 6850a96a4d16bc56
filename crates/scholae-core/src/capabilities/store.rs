//! Memory store capability: per-researcher, append-only.

use crate::error::CapabilityResult;
use crate::model::{Memory, MemoryKind, NewMemory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Conjunctive filter for [`MemoryStore::query`]. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryFilter {
    pub kind: Option<MemoryKind>,
    pub paper_id: Option<String>,
    /// Only memories whose timestamp parses and is at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl MemoryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(kind: MemoryKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_paper(mut self, paper_id: impl Into<String>) -> Self {
        self.paper_id = Some(paper_id.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, memory: &Memory) -> bool {
        if let Some(kind) = self.kind {
            if memory.content.kind != kind {
                return false;
            }
        }
        if let Some(ref pid) = self.paper_id {
            if memory.content.paper_id.as_deref() != Some(pid.as_str()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            match memory.timestamp() {
                Some(ts) if ts >= since => {}
                _ => return false,
            }
        }
        true
    }
}

/// Append-only record store. No update or delete.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Appends a record and returns its id.
    async fn put(&self, researcher_id: &str, record: NewMemory) -> CapabilityResult<String>;

    /// Matching records, newest first, at most `limit`.
    async fn query(
        &self,
        researcher_id: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> CapabilityResult<Vec<Memory>>;

    /// Records ranked by relevance to `query_text`, at most `limit`.
    async fn search_by_text(
        &self,
        researcher_id: &str,
        query_text: &str,
        limit: usize,
    ) -> CapabilityResult<Vec<Memory>>;
}
