//! Composite model response envelope.

use serde::{Deserialize, Serialize};
use crate::document::RagDocument;

/// Final output of a composite model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeModelResponse {
    /// Final text
    pub content: String,

    /// Documents used to augment the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_context: Option<Vec<RagDocument>>,

    /// Provenance and timing
    pub metadata: ResponseMetadata,
}

/// Provenance and timing for a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Composite model name that produced the response
    pub model_used: String,

    /// Wall-clock time from resolution to scoring
    pub processing_time_ms: u64,

    /// Whether retrieval ran
    pub rag_enabled: bool,

    /// Whether the post-processing pipeline ran
    pub post_processed: bool,

    /// Heuristic quality estimate in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}
