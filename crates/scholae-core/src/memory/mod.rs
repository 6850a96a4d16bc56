//! Researcher memory: storage helpers, the strength model and consolidation.

pub mod consolidation;
pub mod service;
pub mod strength;

pub use consolidation::{
    mastery_level, ConceptCount, ConceptGroup, ConsolidationEngine, ConsolidationReport,
    CrossReference, EvolutionEntry, EvolutionReport, MemoryGap, MemoryHealthReport,
};
pub use service::ResearchMemory;
pub use strength::{mastery_from_strength, strength, Mastery, DEFAULT_STRENGTH};
