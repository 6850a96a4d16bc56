//! External capabilities consumed by the engines, and the timeout boundary around them.

mod graph;
mod store;
mod text;

pub use graph::{GraphPattern, GraphQuery, GraphRecord};
pub use store::{MemoryFilter, MemoryStore};
pub use text::{GenerationRequest, TextGenerate};

use crate::error::{CapabilityResult, ReasoningError, ReasoningResult};
use crate::model::{Memory, NewMemory};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const GRAPH_QUERY: &str = "graph_query";
pub const TEXT_GENERATE: &str = "text_generate";
pub const MEMORY_STORE: &str = "memory_store";

/// Runs one capability call under a caller-visible timeout. No retries.
pub async fn bounded<T, F>(capability: &str, timeout: Duration, call: F) -> ReasoningResult<T>
where
    F: Future<Output = CapabilityResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ReasoningError::capability(capability, e)),
        Err(_) => Err(ReasoningError::Timeout {
            capability: capability.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Injected backends shared by every engine. Cloning is cheap.
#[derive(Clone)]
pub struct Capabilities {
    graph: Arc<dyn GraphQuery>,
    store: Arc<dyn MemoryStore>,
    text: Option<Arc<dyn TextGenerate>>,
    timeout: Duration,
}

impl Capabilities {
    pub fn new(graph: Arc<dyn GraphQuery>, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            graph,
            store,
            text: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_text(mut self, text: Arc<dyn TextGenerate>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn graph_backend(&self) -> &str {
        self.graph.backend()
    }

    pub async fn graph(&self, pattern: &GraphPattern) -> ReasoningResult<Vec<GraphRecord>> {
        tracing::debug!(target: "scholae::graph", pattern = pattern.name(), backend = self.graph.backend(), "graph query");
        bounded(GRAPH_QUERY, self.timeout, self.graph.query(pattern)).await
    }

    pub async fn put(&self, researcher_id: &str, record: NewMemory) -> ReasoningResult<String> {
        bounded(MEMORY_STORE, self.timeout, self.store.put(researcher_id, record)).await
    }

    pub async fn recall(
        &self,
        researcher_id: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> ReasoningResult<Vec<Memory>> {
        bounded(MEMORY_STORE, self.timeout, self.store.query(researcher_id, filter, limit)).await
    }

    pub async fn search(
        &self,
        researcher_id: &str,
        query_text: &str,
        limit: usize,
    ) -> ReasoningResult<Vec<Memory>> {
        bounded(
            MEMORY_STORE,
            self.timeout,
            self.store.search_by_text(researcher_id, query_text, limit),
        )
        .await
    }

    /// `Ok(None)` when no generator is configured.
    pub async fn generate(&self, request: &GenerationRequest) -> ReasoningResult<Option<String>> {
        match &self.text {
            Some(text) => bounded(TEXT_GENERATE, self.timeout, text.generate(request))
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}
