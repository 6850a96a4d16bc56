//! Error taxonomy for capability adapters and public reasoning operations.

use serde::{Deserialize, Serialize};

/// Result type for adapter calls (graph, text generation, memory store).
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Result type for public reasoning operations.
pub type ReasoningResult<T> = Result<T, ReasoningError>;

/// Errors raised by a capability backend.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

impl From<sled::Error> for CapabilityError {
    fn from(e: sled::Error) -> Self {
        CapabilityError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CapabilityError {
    fn from(e: serde_json::Error) -> Self {
        CapabilityError::Malformed(e.to_string())
    }
}

/// Errors surfaced by consolidation, reasoning, fusion, and orchestration operations.
///
/// Empty graph results are never an error; callers receive an empty value instead.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("{capability} unavailable: {message}")]
    CapabilityUnavailable { capability: String, message: String },

    #[error("{capability} timed out after {after_ms}ms")]
    Timeout { capability: String, after_ms: u64 },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ReasoningError {
    pub fn capability(capability: &str, source: CapabilityError) -> Self {
        match source {
            CapabilityError::Malformed(m) => ReasoningError::MalformedInput(m),
            other => ReasoningError::CapabilityUnavailable {
                capability: capability.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ReasoningError::CapabilityUnavailable { .. } => "capability_unavailable",
            ReasoningError::Timeout { .. } => "timeout",
            ReasoningError::MalformedInput(_) => "malformed_input",
            ReasoningError::NotFound(_) => "not_found",
        }
    }

    /// Structured error result handed back to callers instead of a fault.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind().to_string(),
            error: self.to_string(),
        }
    }
}

/// Serializable `{kind, error}` shape for an operation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_backend_output_maps_to_malformed_input() {
        let e = ReasoningError::capability("text_generate", CapabilityError::Malformed("not json".into()));
        assert_eq!(e.kind(), "malformed_input");
    }

    #[test]
    fn report_carries_kind_and_message() {
        let e = ReasoningError::Timeout {
            capability: "graph_query".into(),
            after_ms: 250,
        };
        let r = e.report();
        assert_eq!(r.kind, "timeout");
        assert!(r.error.contains("250ms"));
    }
}
