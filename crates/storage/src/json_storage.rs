//! JSON file storage implementation.
//!
//! Stores conversation messages and retrieval documents as JSON files in a
//! `.composite` directory:
//!
//! ```text
//! <root>/messages/<project>/<message-id>.json
//! <root>/documents/<document-id>.json
//! ```
//!
//! Messages without a project live under `messages/_global`.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use composite_core::{ConversationMessage, RagDocument};
use super::{ConversationSource, DocumentStore, Result};
use tokio::fs;
use tracing::debug;

const GLOBAL_PROJECT_DIR: &str = "_global";

/// File-based JSON storage backend.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage, creating the `messages/` and `documents/`
    /// subdirectories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("messages")).await?;
        fs::create_dir_all(root.join("documents")).await?;

        Ok(Self { root })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project_id: Option<&str>) -> PathBuf {
        let dir = project_id.map(file_stem).unwrap_or_else(|| GLOBAL_PROJECT_DIR.to_string());
        self.root.join("messages").join(dir)
    }

    fn message_path(&self, message: &ConversationMessage) -> PathBuf {
        self.project_dir(message.project_id.as_deref())
            .join(format!("{}.json", message.id))
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.root.join("documents").join(format!("{}.json", file_stem(id)))
    }

    /// Save a conversation message (create or update).
    pub async fn save_message(&self, message: &ConversationMessage) -> Result<()> {
        fs::create_dir_all(self.project_dir(message.project_id.as_deref())).await?;
        let json = serde_json::to_string_pretty(message)?;
        write_atomic(&self.message_path(message), json.as_bytes()).await
    }
}

#[async_trait]
impl ConversationSource for JsonStorage {
    async fn recent_messages(
        &self,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>> {
        let mut messages: Vec<ConversationMessage> = match project_id {
            Some(_) => {
                let dir = self.project_dir(project_id);
                if fs::metadata(&dir).await.is_err() {
                    return Ok(Vec::new());
                }
                list_dir(&dir).await?
            }
            None => {
                let mut all = Vec::new();
                let mut rd = fs::read_dir(self.root.join("messages")).await?;
                while let Some(entry) = rd.next_entry().await? {
                    if entry.file_type().await?.is_dir() {
                        all.extend(list_dir::<ConversationMessage>(&entry.path()).await?);
                    }
                }
                all
            }
        };

        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        messages.truncate(limit);

        debug!("Loaded {} messages from {}", messages.len(), self.root.display());
        Ok(messages)
    }
}

#[async_trait]
impl DocumentStore for JsonStorage {
    async fn persist_document(&self, document: &RagDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        write_atomic(&self.document_path(&document.id), json.as_bytes()).await
    }

    async fn list_documents(&self) -> Result<Vec<RagDocument>> {
        list_dir(&self.root.join("documents")).await
    }
}

/// Map an arbitrary id onto a file name. ASCII alphanumerics, `-` and `.`
/// are kept; every other byte becomes `_xx` hex, so distinct ids never
/// share a file.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}

/// Write through a sibling temp file and rename into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use composite_core::MessageRole;
    use chrono::Duration;

    #[tokio::test]
    async fn test_recent_messages_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        let now = chrono::Utc::now();
        for i in 0..5 {
            let mut msg = ConversationMessage::new(MessageRole::User, format!("message {}", i))
                .in_project("p1");
            msg.created_at = now + Duration::seconds(i);
            storage.save_message(&msg).await.unwrap();
        }
        storage
            .save_message(&ConversationMessage::new(MessageRole::User, "other").in_project("p2"))
            .await
            .unwrap();

        let recent = storage.recent_messages(Some("p1"), 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "message 4");
        assert_eq!(recent[2].content, "message 2");

        let all = storage.recent_messages(None, 100).await.unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_project_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let recent = storage.recent_messages(Some("missing"), 10).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_persist_document_with_path_like_id() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        let doc = RagDocument::new("file-abc-src/components/Button.tsx", "export const Button = 1;")
            .with_tags(["file", "tsx"]);
        storage.persist_document(&doc).await.unwrap();

        let loaded = storage.list_documents().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, doc.id);
        assert!(storage.root().join("documents/file-abc-src_2fcomponents_2fButton.tsx.json").exists());
    }

    #[tokio::test]
    async fn test_slash_and_underscore_ids_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        storage.persist_document(&RagDocument::new("file-x-src/a.tsx", "slash")).await.unwrap();
        storage.persist_document(&RagDocument::new("file-x-src_a.tsx", "underscore")).await.unwrap();
        storage.persist_document(&RagDocument::new("file-x-src_a.tsx", "replaced")).await.unwrap();

        let mut contents: Vec<_> = storage
            .list_documents()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.content)
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["replaced", "slash"]);

        let mut rd = fs::read_dir(storage.root().join("documents")).await.unwrap();
        while let Some(entry) = rd.next_entry().await.unwrap() {
            assert_ne!(entry.path().extension().and_then(|e| e.to_str()), Some("tmp"));
        }
    }
}
