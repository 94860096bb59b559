//! Composite model core data models.
//!
//! This crate defines the data structures shared by retrieval,
//! post-processing, routing and orchestration.

#![warn(missing_docs)]

// Core identities
mod id;

// Model configuration
mod model;

// Retrieval
mod document;

// Conversation and responses
mod conversation;
mod response;

// Re-exports
pub use id::*;

pub use model::{
    BaseModel, ModelCapabilities, ModelConfig, ModelTier, Provider, UnknownProvider,
    LARGE_TIER_CONTEXT_LENGTH,
};
pub use document::{
    average_relevance, DocumentMetadata, RagDocument, RagFilters, RagQueryOptions, RagResult,
    DEFAULT_THRESHOLD, DEFAULT_TOP_K,
};
pub use conversation::{ConversationMessage, MessageRole, ModelContext};
pub use response::{CompositeModelResponse, ResponseMetadata};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
