//! In-memory storage for tests and ephemeral sessions.

use std::sync::RwLock;
use async_trait::async_trait;
use composite_core::{ConversationMessage, RagDocument};
use super::{ConversationSource, DocumentStore, Result, StorageError};

/// In-memory conversation history and document store.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    messages: RwLock<Vec<ConversationMessage>>,
    documents: RwLock<Vec<RagDocument>>,
}

impl InMemoryConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with messages.
    pub fn with_messages(messages: Vec<ConversationMessage>) -> Self {
        Self {
            messages: RwLock::new(messages),
            documents: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConversationSource for InMemoryConversationStore {
    async fn recent_messages(
        &self,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>> {
        let messages = self
            .messages
            .read()
            .map_err(|_| StorageError::Other("message store poisoned".to_string()))?;

        let mut selected: Vec<_> = messages
            .iter()
            .filter(|m| match project_id {
                Some(p) => m.project_id.as_deref() == Some(p),
                None => true,
            })
            .cloned()
            .collect();

        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        selected.truncate(limit);
        Ok(selected)
    }
}

#[async_trait]
impl DocumentStore for InMemoryConversationStore {
    async fn persist_document(&self, document: &RagDocument) -> Result<()> {
        let mut docs = self
            .documents
            .write()
            .map_err(|_| StorageError::Other("document store poisoned".to_string()))?;
        match docs.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document.clone(),
            None => docs.push(document.clone()),
        }
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<RagDocument>> {
        let docs = self
            .documents
            .read()
            .map_err(|_| StorageError::Other("document store poisoned".to_string()))?;
        Ok(docs.clone())
    }
}
