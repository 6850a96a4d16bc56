//! Concrete capability backends chosen at composition time.

mod in_memory_graph;
mod openrouter;
mod sled_store;

pub use in_memory_graph::{GraphSnapshot, InMemoryGraph, PaperNode, ReadEdge};
pub use openrouter::OpenRouterGenerator;
pub use sled_store::SledMemoryStore;
