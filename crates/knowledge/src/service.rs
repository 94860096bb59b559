//! Retrieval service: document store plus similarity query.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use composite_core::{ConversationMessage, RagDocument, RagFilters, RagQueryOptions, RagResult};
use composite_storage::{ConversationSource, DocumentStore};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::embedding::{Embedder, HashEmbedder};
use crate::vector::cosine_similarity;

/// Maximum messages fetched by [`RagService::load_documents`].
pub const MESSAGE_LOAD_LIMIT: usize = 100;

/// Documents in insertion order with an id index for in-place upserts.
#[derive(Default)]
struct DocumentIndex {
    documents: Vec<Arc<RagDocument>>,
    positions: HashMap<String, usize>,
}

impl DocumentIndex {
    fn upsert(&mut self, document: RagDocument) {
        match self.positions.get(&document.id) {
            Some(&pos) => self.documents[pos] = Arc::new(document),
            None => {
                self.positions.insert(document.id.clone(), self.documents.len());
                self.documents.push(Arc::new(document));
            }
        }
    }

    fn clear(&mut self) {
        self.documents.clear();
        self.positions.clear();
    }
}

/// In-memory retrieval service shared by all composite model calls.
///
/// Documents are replaced whole on upsert, so a query iterating a snapshot
/// never sees a half-written entry. Persists run in the background; call
/// [`RagService::flush`] before dropping the service to let them finish.
pub struct RagService {
    embedder: Arc<dyn Embedder>,
    index: RwLock<DocumentIndex>,
    source: Option<Arc<dyn ConversationSource>>,
    store: Option<Arc<dyn DocumentStore>>,
    pending: Mutex<JoinSet<()>>,
}

impl RagService {
    /// Create a service using the hash embedder, with no conversation source
    /// and no persistence.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a service.
    pub fn builder() -> RagServiceBuilder {
        RagServiceBuilder::default()
    }

    /// Embed, timestamp and upsert a document, then persist it in the
    /// background. Persistence failures are logged and ignored.
    pub async fn add_document(&self, mut document: RagDocument) {
        document.embedding = Some(self.embedder.embed(&document.content));
        document.metadata.relevance_score = None;
        if document.metadata.timestamp.is_none() {
            document.metadata.timestamp = Some(chrono::Utc::now());
        }

        if let Some(store) = &self.store {
            let store = Arc::clone(store);
            let copy = document.clone();
            let mut pending = self.pending.lock().await;
            while pending.try_join_next().is_some() {}
            pending.spawn(async move {
                if let Err(e) = store.persist_document(&copy).await {
                    warn!("Failed to persist document {}: {}", copy.id, e);
                }
            });
        }

        self.index.write().await.upsert(document);
    }

    /// Wait for every background persist started so far.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!("Document persist task failed: {}", e);
            }
        }
    }

    /// Seed the index from the document store without writing back.
    ///
    /// Documents whose stored embedding is missing or has the wrong length
    /// are re-embedded. Read failures are logged and leave the index
    /// unchanged. Returns the number of documents loaded.
    pub async fn load_persisted(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        let documents = match store.list_documents().await {
            Ok(documents) => documents,
            Err(e) => {
                warn!("Failed to read persisted documents: {}", e);
                return 0;
            }
        };

        let dimensions = self.embedder.dimensions();
        let mut index = self.index.write().await;
        let loaded = documents.len();
        for mut document in documents {
            if document.embedding.as_ref().map(|e| e.len()) != Some(dimensions) {
                document.embedding = Some(self.embedder.embed(&document.content));
            }
            document.metadata.relevance_score = None;
            index.upsert(document);
        }

        info!("Loaded {} persisted documents", loaded);
        loaded
    }

    /// Load recent conversation messages (and their generated files) as
    /// documents.
    ///
    /// Fetch failures are logged and leave the store unchanged.
    pub async fn load_documents(&self, project_id: Option<&str>) {
        let Some(source) = &self.source else {
            debug!("No conversation source configured; skipping document load");
            return;
        };

        let messages = match source.recent_messages(project_id, MESSAGE_LOAD_LIMIT).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to load conversation documents: {}", e);
                return;
            }
        };

        let mut loaded = 0usize;
        for message in &messages {
            for document in documents_from_message(message) {
                self.add_document(document).await;
                loaded += 1;
            }
        }

        info!(
            "Loaded {} documents from {} messages (project: {})",
            loaded,
            messages.len(),
            project_id.unwrap_or("all")
        );
    }

    /// Rank stored documents against a query.
    pub async fn query(&self, options: &RagQueryOptions) -> RagResult {
        let start = Instant::now();
        let query_embedding = self.embedder.embed(&options.query);

        let snapshot: Vec<Arc<RagDocument>> = self.index.read().await.documents.clone();

        let mut matches: Vec<(f32, RagDocument)> = snapshot
            .iter()
            .filter_map(|doc| {
                let score = doc
                    .embedding
                    .as_deref()
                    .map(|e| cosine_similarity(&query_embedding, e))
                    .unwrap_or(0.0);

                if score < options.threshold {
                    return None;
                }
                if let Some(filters) = &options.filters {
                    if !passes_filters(doc, score, filters) {
                        return None;
                    }
                }

                let mut result = RagDocument {
                    id: doc.id.clone(),
                    content: doc.content.clone(),
                    metadata: doc.metadata.clone(),
                    embedding: None,
                };
                result.metadata.relevance_score = Some(score);
                Some((score, result))
            })
            .collect();

        matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let total_results = matches.len();
        let documents: Vec<_> = matches
            .into_iter()
            .take(options.top_k)
            .map(|(_, doc)| doc)
            .collect();

        debug!(
            "Query matched {} of {} documents, returning {}",
            total_results,
            snapshot.len(),
            documents.len()
        );

        RagResult {
            documents,
            total_results,
            query_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Remove every document.
    pub async fn clear_documents(&self) {
        self.index.write().await.clear();
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.index.read().await.documents.len()
    }
}

impl Default for RagService {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`RagService`].
#[derive(Default)]
pub struct RagServiceBuilder {
    embedder: Option<Arc<dyn Embedder>>,
    source: Option<Arc<dyn ConversationSource>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl RagServiceBuilder {
    /// Use a custom embedder.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Read conversation history from `source`.
    pub fn conversation_source(mut self, source: Arc<dyn ConversationSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Persist added documents to `store` and warm-load from it.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the service.
    pub fn build(self) -> RagService {
        RagService {
            embedder: self.embedder.unwrap_or_else(|| Arc::new(HashEmbedder::new())),
            index: RwLock::new(DocumentIndex::default()),
            source: self.source,
            store: self.store,
            pending: Mutex::new(JoinSet::new()),
        }
    }
}

/// Filters are permissive: an empty tag list filters nothing, and a NaN
/// minimum score is ignored.
fn passes_filters(doc: &RagDocument, score: f32, filters: &RagFilters) -> bool {
    if let Some(wanted) = filters.tags.as_ref().filter(|t| !t.is_empty()) {
        let has_tag = doc
            .metadata
            .tags
            .as_ref()
            .map(|tags| tags.iter().any(|t| wanted.contains(t)))
            .unwrap_or(false);
        if !has_tag {
            return false;
        }
    }

    if let Some(source) = &filters.source {
        if doc.metadata.source.as_deref() != Some(source.as_str()) {
            return false;
        }
    }

    if let Some(min) = filters.min_relevance_score.filter(|m| !m.is_nan()) {
        if score < min {
            return false;
        }
    }

    true
}

/// One document for the message text plus one per attached file.
fn documents_from_message(message: &ConversationMessage) -> Vec<RagDocument> {
    let mut documents = Vec::with_capacity(1 + message.files.as_ref().map_or(0, |f| f.len()));

    let mut doc = RagDocument::new(format!("message-{}", message.id), message.content.clone())
        .with_title(format!("{} {} message", message.role, message.message_type))
        .with_source("conversation")
        .with_tags([message.role.as_str().to_string(), message.message_type.clone()]);
    doc.metadata.timestamp = Some(message.created_at);
    documents.push(doc);

    if let Some(files) = &message.files {
        for (path, content) in files {
            let mut tags = vec!["file".to_string()];
            if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
                tags.push(ext.to_string());
            }

            let mut file_doc =
                RagDocument::new(format!("file-{}-{}", message.id, path), content.clone())
                    .with_title(path.clone())
                    .with_source(path.clone())
                    .with_tags(tags);
            file_doc.metadata.timestamp = Some(message.created_at);
            documents.push(file_doc);
        }
    }

    documents
}
