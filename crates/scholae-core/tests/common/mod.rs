//! Shared fixtures for the integration tests: a tempdir-backed sled store and
//! stub capabilities that fail, refuse writes, count calls, or return canned text.

#![allow(dead_code)]

use async_trait::async_trait;
use scholae_core::adapters::{InMemoryGraph, SledMemoryStore};
use scholae_core::error::CapabilityResult;
use scholae_core::{
    Capabilities, CapabilityError, GenerationRequest, GraphPattern, GraphQuery, GraphRecord, Memory, MemoryContent,
    MemoryFilter, MemoryKind, MemoryMetadata, MemoryStore, MemoryType, NewMemory, TextGenerate,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Graph backend that is always down.
pub struct DownGraph;

#[async_trait]
impl GraphQuery for DownGraph {
    async fn query(&self, _pattern: &GraphPattern) -> CapabilityResult<Vec<GraphRecord>> {
        Err(CapabilityError::Unavailable("graph offline".into()))
    }

    fn backend(&self) -> &str {
        "down"
    }
}

/// Graph backend that answers nothing and counts queries.
#[derive(Default)]
pub struct CountingGraph {
    pub calls: AtomicUsize,
}

impl CountingGraph {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphQuery for CountingGraph {
    async fn query(&self, _pattern: &GraphPattern) -> CapabilityResult<Vec<GraphRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn backend(&self) -> &str {
        "counting"
    }
}

/// Text generator returning a fixed reply.
pub struct CannedText(pub String);

#[async_trait]
impl TextGenerate for CannedText {
    async fn generate(&self, _request: &GenerationRequest) -> CapabilityResult<String> {
        Ok(self.0.clone())
    }
}

/// Text generator whose backend is always down.
pub struct FailingText;

#[async_trait]
impl TextGenerate for FailingText {
    async fn generate(&self, _request: &GenerationRequest) -> CapabilityResult<String> {
        Err(CapabilityError::Unavailable("model offline".into()))
    }
}

/// Sled store that rejects writes of the listed kinds and serves everything else.
pub struct RefusingStore {
    pub inner: Arc<SledMemoryStore>,
    pub refused: Vec<MemoryKind>,
}

#[async_trait]
impl MemoryStore for RefusingStore {
    async fn put(&self, researcher_id: &str, record: NewMemory) -> CapabilityResult<String> {
        if self.refused.contains(&record.content.kind) {
            return Err(CapabilityError::Unavailable("store refused write".into()));
        }
        self.inner.put(researcher_id, record).await
    }

    async fn query(&self, researcher_id: &str, filter: &MemoryFilter, limit: usize) -> CapabilityResult<Vec<Memory>> {
        self.inner.query(researcher_id, filter, limit).await
    }

    async fn search_by_text(&self, researcher_id: &str, query_text: &str, limit: usize) -> CapabilityResult<Vec<Memory>> {
        self.inner.search_by_text(researcher_id, query_text, limit).await
    }
}

/// Capabilities over a fresh sled store. Keep the `TempDir` alive for the test.
pub fn caps_with(graph: Arc<dyn GraphQuery>) -> (Capabilities, Arc<SledMemoryStore>, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = Arc::new(SledMemoryStore::open_path(dir.path().join("memories")).expect("open store"));
    let caps = Capabilities::new(graph, store.clone()).with_timeout(Duration::from_secs(5));
    (caps, store, dir)
}

pub fn caps_over(graph: InMemoryGraph) -> (Capabilities, Arc<SledMemoryStore>, TempDir) {
    caps_with(Arc::new(graph))
}

/// Paper-reading record with an explicit timestamp.
pub fn reading(paper_id: &str, timestamp: &str, concepts: &[&str]) -> NewMemory {
    NewMemory {
        memory_type: MemoryType::Personal,
        content: MemoryContent::now(MemoryKind::PaperReading)
            .with_paper(paper_id, Some(format!("Paper {paper_id}")))
            .with_concepts(concepts.iter().map(|c| c.to_string()).collect())
            .with_timestamp(timestamp),
        metadata: MemoryMetadata::from_source("test"),
    }
}

/// Capabilities whose store refuses writes of `refused`. The returned sled store is
/// the unfiltered backing store, for seeding and inspection.
pub fn caps_refusing(graph: InMemoryGraph, refused: &[MemoryKind]) -> (Capabilities, Arc<SledMemoryStore>, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let inner = Arc::new(SledMemoryStore::open_path(dir.path().join("memories")).expect("open store"));
    let store = Arc::new(RefusingStore {
        inner: inner.clone(),
        refused: refused.to_vec(),
    });
    let caps = Capabilities::new(Arc::new(graph), store).with_timeout(Duration::from_secs(5));
    (caps, inner, dir)
}
