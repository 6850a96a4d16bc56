//! Append-only memory store: one Sled tree per researcher, DashMap hot cache in front.
//!
//! Keys are `memory/{timestamp_ms:016x}_{uuid}` so a reverse prefix scan yields the
//! newest records first. A parallel `index/{id}` entry maps ids back to their key.
//! The cache only holds records touched by `put` and `get`; scans decode straight
//! from Sled and leave it alone.

use crate::capabilities::{MemoryFilter, MemoryStore};
use crate::error::{CapabilityError, CapabilityResult};
use crate::model::{Memory, NewMemory};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;

const MEMORY_PREFIX: &str = "memory/";
const INDEX_PREFIX: &str = "index/";
const DEFAULT_CACHE_CAPACITY: usize = 1024;

fn tree_name(researcher_id: &str) -> String {
    format!("researcher/{researcher_id}")
}

fn cache_key(researcher_id: &str, id: &str) -> String {
    format!("{researcher_id}:{id}")
}

pub struct SledMemoryStore {
    db: Db,
    /// Hot cache: `{researcher}:{memory_id}` -> decoded memory, bounded by `cache_capacity`.
    cache: Arc<DashMap<String, Memory>>,
    cache_capacity: usize,
}

impl SledMemoryStore {
    /// Opens or creates a Sled database at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            cache: Arc::new(DashMap::new()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        })
    }

    /// Caps the number of cached records. Zero disables the cache.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Number of records currently held in the hot cache.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn remember(&self, researcher_id: &str, memory: &Memory) {
        if self.cache_capacity == 0 {
            return;
        }
        if self.cache.len() >= self.cache_capacity {
            // Full: start a fresh generation.
            self.cache.clear();
        }
        self.cache.insert(cache_key(researcher_id, &memory.id), memory.clone());
    }

    fn tree(&self, researcher_id: &str) -> CapabilityResult<Tree> {
        if researcher_id.trim().is_empty() {
            return Err(CapabilityError::QueryFailed("empty researcher namespace".into()));
        }
        Ok(self.db.open_tree(tree_name(researcher_id))?)
    }

    /// Newest-first iterator over decodable records. Corrupt entries are skipped.
    fn newest_first(&self, researcher_id: &str) -> CapabilityResult<Vec<Memory>> {
        let tree = self.tree(researcher_id)?;
        let mut out = Vec::new();
        for entry in tree.scan_prefix(MEMORY_PREFIX).rev() {
            let (key, value) = entry?;
            match serde_json::from_slice::<Memory>(&value) {
                Ok(m) => out.push(m),
                Err(e) => {
                    tracing::warn!(target: "scholae::store", researcher_id, key = %String::from_utf8_lossy(&key), error = %e, "skipping undecodable memory");
                }
            }
        }
        Ok(out)
    }

    /// Looks up one memory by id.
    pub fn get(&self, researcher_id: &str, id: &str) -> CapabilityResult<Option<Memory>> {
        let tree = self.tree(researcher_id)?;
        if let Some(hit) = self.cache.get(&cache_key(researcher_id, id)) {
            return Ok(Some(hit.clone()));
        }
        let Some(key) = tree.get(format!("{INDEX_PREFIX}{id}"))? else {
            return Ok(None);
        };
        let Some(value) = tree.get(&key)? else {
            return Ok(None);
        };
        let memory: Memory = serde_json::from_slice(&value)?;
        self.remember(researcher_id, &memory);
        Ok(Some(memory))
    }

    /// Number of memories in a researcher namespace.
    pub fn count(&self, researcher_id: &str) -> CapabilityResult<usize> {
        Ok(self.tree(researcher_id)?.scan_prefix(MEMORY_PREFIX).count())
    }

    pub async fn flush(&self) -> CapabilityResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for SledMemoryStore {
    async fn put(&self, researcher_id: &str, record: NewMemory) -> CapabilityResult<String> {
        let tree = self.tree(researcher_id)?;
        let id = uuid::Uuid::new_v4().to_string();
        let memory = Memory::new(id.clone(), researcher_id, record);
        let millis = memory
            .timestamp()
            .unwrap_or_else(Utc::now)
            .timestamp_millis()
            .max(0) as u64;
        let key = format!("{MEMORY_PREFIX}{millis:016x}_{id}");
        let bytes = serde_json::to_vec(&memory)?;

        tree.insert(key.as_bytes(), bytes)?;
        tree.insert(format!("{INDEX_PREFIX}{id}").as_bytes(), key.as_bytes())?;
        self.remember(researcher_id, &memory);
        tracing::debug!(target: "scholae::store", researcher_id, memory_id = %id, "memory appended");
        Ok(id)
    }

    async fn query(
        &self,
        researcher_id: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> CapabilityResult<Vec<Memory>> {
        Ok(self
            .newest_first(researcher_id)?
            .into_iter()
            .filter(|m| filter.matches(m))
            .take(limit)
            .collect())
    }

    /// Ranks by the number of distinct query tokens found in the record's text;
    /// ties stay newest first.
    async fn search_by_text(
        &self,
        researcher_id: &str,
        query_text: &str,
        limit: usize,
    ) -> CapabilityResult<Vec<Memory>> {
        let mut tokens: Vec<String> = query_text.split_whitespace().map(str::to_lowercase).collect();
        tokens.sort();
        tokens.dedup();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let mut scored: Vec<(usize, Memory)> = self
            .newest_first(researcher_id)?
            .into_iter()
            .filter_map(|m| {
                let text = m.content.search_text();
                let hits = tokens.iter().filter(|t| text.contains(t.as_str())).count();
                (hits > 0).then_some((hits, m))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, m)| m).collect())
    }
}
