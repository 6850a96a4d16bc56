//! scholae-core: adaptive knowledge reasoning over a researcher's memory and the
//! research graph (memory strength, consolidation, graph reasoning, fusion, agents).
//!
//! Engines hold a [`Capabilities`] bundle of injected backends and never keep
//! mutable state of their own; clone them freely into concurrent tasks.

pub mod adapters;
pub mod agents;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod fusion;
pub mod memory;
pub mod model;
pub mod reasoning;

// Capabilities
pub use capabilities::{
    Capabilities, GenerationRequest, GraphPattern, GraphQuery, GraphRecord, MemoryFilter, MemoryStore,
    TextGenerate,
};

// Errors and configuration
pub use config::ScholaeConfig;
pub use error::{CapabilityError, ErrorReport, ReasoningError, ReasoningResult};

// Data model
pub use model::{GraphPath, Memory, MemoryContent, MemoryKind, MemoryMetadata, MemoryType, NewMemory, PaperRecord, PaperRef};

// Engines
pub use agents::{CollaborationOutcome, MultiAgentOrchestrator};
pub use fusion::FusionLayer;
pub use memory::{ConsolidationEngine, ResearchMemory};
pub use reasoning::GraphReasoningEngine;
