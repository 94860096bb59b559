//! Retrievable documents and retrieval queries.

use serde::{Deserialize, Serialize};
use crate::Time;

/// Default number of documents returned by a query.
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum similarity for a document to be returned.
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// A unit of retrievable knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagDocument {
    /// Unique, stable identifier
    pub id: String,

    /// Document text
    pub content: String,

    /// Descriptive metadata
    pub metadata: DocumentMetadata,

    /// Embedding, computed when the document is added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl RagDocument {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: DocumentMetadata::default(),
            embedding: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    /// Set the tags.
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.metadata.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Relevance score attached by a query, or 0.
    pub fn relevance(&self) -> f32 {
        self.metadata.relevance_score.unwrap_or(0.0)
    }

    /// Title if present, otherwise the id.
    pub fn display_title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or(&self.id)
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Human-readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Where the document came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// When the document was stored; stamped on add when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Time>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Similarity to the query; only set on query results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

/// Optional result filters. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagFilters {
    /// Keep documents carrying at least one of these tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Keep documents whose source equals this exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Keep documents scoring at least this much
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_relevance_score: Option<f32>,
}

/// A similarity query against the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagQueryOptions {
    /// Query text
    pub query: String,

    /// Maximum documents to return
    pub top_k: usize,

    /// Minimum similarity score
    pub threshold: f32,

    /// Additional filters
    #[serde(default)]
    pub filters: Option<RagFilters>,
}

impl RagQueryOptions {
    /// Query with the default top-K and threshold.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            filters: None,
        }
    }

    /// Set top-K.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the filters.
    pub fn with_filters(mut self, filters: RagFilters) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Result of a similarity query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagResult {
    /// Matching documents, best first, with `relevance_score` set
    pub documents: Vec<RagDocument>,

    /// Number of documents that passed threshold and filters, before top-K
    pub total_results: usize,

    /// Query latency in milliseconds
    pub query_time_ms: u64,
}

impl RagResult {
    /// Mean relevance of the returned documents, 0 when empty.
    pub fn average_relevance(&self) -> f32 {
        average_relevance(&self.documents)
    }
}

/// Mean relevance score of `documents`, 0 when empty.
pub fn average_relevance(documents: &[RagDocument]) -> f32 {
    if documents.is_empty() {
        return 0.0;
    }
    documents.iter().map(RagDocument::relevance).sum::<f32>() / documents.len() as f32
}
