//! Storage trait abstraction.

use async_trait::async_trait;
use composite_core::{ConversationMessage, RagDocument};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Source of conversation history for retrieval.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// Fetch up to `limit` messages, newest first.
    ///
    /// With `project_id` set only that project's messages are returned.
    async fn recent_messages(
        &self,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>>;
}

/// Durable home for retrieval documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a document, replacing any stored copy with the same id.
    async fn persist_document(&self, document: &RagDocument) -> Result<()>;

    /// Every persisted document, in no particular order.
    async fn list_documents(&self) -> Result<Vec<RagDocument>>;
}
