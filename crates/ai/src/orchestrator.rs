//! Composite response orchestration.

use std::sync::Arc;
use std::time::Instant;

use composite_core::{
    average_relevance, CompositeModelResponse, ModelConfig, ModelContext, ModelTier,
    RagDocument, RagQueryOptions, ResponseMetadata,
};
use composite_knowledge::RagService;
use composite_quality::{FilterContext, PostProcessor, ProcessingOptions};
use composite_routing::{estimate_processing_time, ModelRegistry};
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::error::{CompositeError, Result};
use crate::prompt::{build_system_prompt, build_user_prompt};
use crate::provider::{ChatMessage, ChatRole, ContentBlock, LlmRequest, ProviderOutput, ProviderTable};

/// Model name that routes through [`ModelRegistry::recommend_model`].
pub const AUTO_MODEL: &str = "auto";

/// Returned when the provider produced no text.
pub const NO_RESPONSE: &str = "No response generated";

/// Confidence before adjustments.
pub const BASE_CONFIDENCE: f32 = 0.7;
/// Maximum bonus from retrieved document relevance.
pub const RAG_CONFIDENCE_WEIGHT: f32 = 0.2;
/// Content longer than this many characters earns [`LENGTH_CONFIDENCE_BONUS`].
pub const LENGTH_BONUS_CHARS: usize = 500;
/// Bonus for long content.
pub const LENGTH_CONFIDENCE_BONUS: f32 = 0.05;

/// Heuristic confidence in [0, 1] from retrieval relevance and output length.
pub fn score_confidence(rag_context: &[RagDocument], content_chars: usize) -> f32 {
    let mut confidence = BASE_CONFIDENCE;
    if !rag_context.is_empty() {
        confidence += RAG_CONFIDENCE_WEIGHT * average_relevance(rag_context).clamp(0.0, 1.0);
    }
    if content_chars > LENGTH_BONUS_CHARS {
        confidence += LENGTH_CONFIDENCE_BONUS;
    }
    confidence.clamp(0.0, 1.0)
}

/// Concatenated text blocks, or [`NO_RESPONSE`] when there are none.
pub fn extract_text(output: &ProviderOutput) -> String {
    let text = output
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        text
    }
}

/// Entry point for composite model calls.
///
/// Holds shared handles to the registry, retrieval service and
/// post-processor; clone the handles to share them with other callers.
pub struct CompositeModelService {
    registry: Arc<ModelRegistry>,
    rag: Arc<RagService>,
    post_processor: Arc<PostProcessor>,
    providers: ProviderTable,
    retrieval: RetrievalConfig,
}

impl CompositeModelService {
    /// Create a service with default retrieval settings.
    pub fn new(
        registry: Arc<ModelRegistry>,
        rag: Arc<RagService>,
        post_processor: Arc<PostProcessor>,
        providers: ProviderTable,
    ) -> Self {
        Self {
            registry,
            rag,
            post_processor,
            providers,
            retrieval: RetrievalConfig::default(),
        }
    }

    /// Override retrieval settings.
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Model registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Retrieval service.
    pub fn rag(&self) -> &Arc<RagService> {
        &self.rag
    }

    /// Post-processor.
    pub fn post_processor(&self) -> &Arc<PostProcessor> {
        &self.post_processor
    }

    /// Recommend a model name for a task.
    pub fn recommend_model(&self, task: &str) -> String {
        self.registry.recommend_model(task)
    }

    /// Estimate processing time for `query` on a named model.
    pub fn estimate_processing_time(&self, query: &str, model_name: Option<&str>) -> u64 {
        let config = model_name.and_then(|name| self.registry.get_model_config(name));
        estimate_processing_time(query, config.as_deref())
    }

    /// Generate a response with the named composite model.
    ///
    /// Retrieval and post-processing run only when the model enables them.
    /// Unknown models, missing providers and provider failures are errors.
    pub async fn generate_response(
        &self,
        model_name: &str,
        context: &ModelContext,
    ) -> Result<CompositeModelResponse> {
        let start = Instant::now();

        let config = self.resolve(model_name, &context.user_query)?;
        let provider = self
            .providers
            .get(config.base_model.provider)
            .ok_or(CompositeError::ProviderNotConfigured(config.base_model.provider))?;
        info!("Generating with {} ({})", config.name, provider.name());

        let rag_context = if config.rag_enabled {
            self.retrieve(&config, context).await
        } else {
            Vec::new()
        };

        let request = LlmRequest {
            model_id: config.base_model.model_id.clone(),
            system_prompt: build_system_prompt(
                &config,
                &rag_context,
                context.additional_context.as_ref(),
            ),
            messages: conversation_turns(context, &rag_context),
            temperature: config.base_model.temperature,
            max_tokens: config.base_model.max_tokens,
        };

        let output = provider
            .generate(&request)
            .await
            .map_err(CompositeError::Provider)?;
        let mut content = extract_text(&output);
        let extracted_chars = content.chars().count();

        if config.post_processing_enabled {
            let filter_context = FilterContext {
                model: Some((*config).clone()),
                rag_context: rag_context.clone(),
            };
            content = self
                .post_processor
                .process(&content, &ProcessingOptions::all(), Some(&filter_context));
        }

        let confidence = score_confidence(&rag_context, extracted_chars);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Generated {} chars with {} in {}ms (confidence {:.2})",
            content.len(),
            config.name,
            processing_time_ms,
            confidence
        );

        Ok(CompositeModelResponse {
            content,
            rag_context: (!rag_context.is_empty()).then_some(rag_context),
            metadata: ResponseMetadata {
                model_used: config.name.clone(),
                processing_time_ms,
                rag_enabled: config.rag_enabled,
                post_processed: config.post_processing_enabled,
                confidence: Some(confidence),
            },
        })
    }

    fn resolve(&self, model_name: &str, query: &str) -> Result<Arc<ModelConfig>> {
        let name = if model_name == AUTO_MODEL {
            let recommended = self.registry.recommend_model(query);
            debug!("Auto-selected model {}", recommended);
            recommended
        } else {
            model_name.to_string()
        };

        self.registry
            .get_model_config(&name)
            .ok_or(CompositeError::ModelNotFound(name))
    }

    async fn retrieve(&self, config: &ModelConfig, context: &ModelContext) -> Vec<RagDocument> {
        self.rag.load_documents(Some(&context.project_id)).await;

        let top_k = match config.tier() {
            ModelTier::Large => self.retrieval.top_k_large,
            ModelTier::Standard => self.retrieval.top_k,
        };
        let options = RagQueryOptions::new(context.user_query.clone())
            .with_top_k(top_k)
            .with_threshold(self.retrieval.threshold);

        let result = self.rag.query(&options).await;
        debug!(
            "Retrieved {} of {} documents in {}ms",
            result.documents.len(),
            result.total_results,
            result.query_time_ms
        );
        result.documents
    }
}

/// Prior turns, oldest first, followed by the assembled user prompt.
fn conversation_turns(context: &ModelContext, rag_context: &[RagDocument]) -> Vec<ChatMessage> {
    let mut turns: Vec<ChatMessage> = context
        .previous_messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| ChatMessage {
            role: ChatRole::from_message_role(m.role),
            content: m.content.clone(),
        })
        .collect();
    turns.push(ChatMessage::user(build_user_prompt(&context.user_query, rag_context)));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LlmProvider;
    use async_trait::async_trait;
    use composite_core::{ConversationMessage, MessageRole, Provider};
    use composite_routing::{LARGE_MODEL, MID_MODEL};
    use composite_storage::InMemoryConversationStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays scripted outputs and records requests.
    #[derive(Default)]
    struct ScriptedProvider {
        outputs: Mutex<VecDeque<anyhow::Result<ProviderOutput>>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedProvider {
        fn replying(outputs: Vec<anyhow::Result<ProviderOutput>>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<LlmRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &LlmRequest) -> anyhow::Result<ProviderOutput> {
            self.requests.lock().unwrap().push(request.clone());
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ProviderOutput::default()))
        }
    }

    fn service_with(provider: Arc<ScriptedProvider>, rag: RagService) -> CompositeModelService {
        let providers = ProviderTable::new()
            .with(Provider::OpenAi, provider.clone())
            .with(Provider::Anthropic, provider);
        CompositeModelService::new(
            Arc::new(ModelRegistry::new()),
            Arc::new(rag),
            Arc::new(PostProcessor::new()),
            providers,
        )
    }

    #[tokio::test]
    async fn test_unknown_model_is_not_found() {
        let service = service_with(ScriptedProvider::replying(vec![]), RagService::new());
        let err = service
            .generate_response("nope", &ModelContext::new("p1", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompositeError::ModelNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_missing_provider_is_error() {
        let service = CompositeModelService::new(
            Arc::new(ModelRegistry::new()),
            Arc::new(RagService::new()),
            Arc::new(PostProcessor::new()),
            ProviderTable::new(),
        );
        let err = service
            .generate_response(MID_MODEL, &ModelContext::new("p1", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompositeError::ProviderNotConfigured(Provider::OpenAi)));
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = ScriptedProvider::replying(vec![Err(anyhow::anyhow!("rate limited"))]);
        let service = service_with(provider, RagService::new());
        let err = service
            .generate_response(MID_MODEL, &ModelContext::new("p1", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompositeError::Provider(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_plain_generation_without_context() {
        let provider = ScriptedProvider::replying(vec![Ok(ProviderOutput::text(
            "```js\nconst a = 1\n```",
        ))]);
        let service = service_with(provider.clone(), RagService::new());

        let response = service
            .generate_response(MID_MODEL, &ModelContext::new("p1", "make a constant"))
            .await
            .unwrap();

        assert_eq!(response.content, "```js\nconst a = 1;\n```");
        assert!(response.rag_context.is_none());
        assert_eq!(response.metadata.model_used, MID_MODEL);
        assert!(response.metadata.rag_enabled);
        assert!(response.metadata.post_processed);
        assert_eq!(response.metadata.confidence, Some(BASE_CONFIDENCE));

        let request = &provider.requests()[0];
        assert_eq!(request.model_id, "gpt-4o");
        assert_eq!(request.messages, vec![ChatMessage::user("make a constant")]);
        assert!(request.system_prompt.contains("code generation"));
    }

    #[tokio::test]
    async fn test_retrieval_augments_prompt_and_confidence() {
        let store = Arc::new(InMemoryConversationStore::with_messages(vec![
            ConversationMessage::new(MessageRole::Assistant, "React button component with hover state")
                .in_project("p1"),
            ConversationMessage::new(MessageRole::User, "React button component with hover state")
                .in_project("other"),
        ]));
        let rag = RagService::builder().conversation_source(store).build();
        let provider = ScriptedProvider::replying(vec![Ok(ProviderOutput::text("Done."))]);
        let service = service_with(provider.clone(), rag);

        let response = service
            .generate_response(
                MID_MODEL,
                &ModelContext::new("p1", "React button component with hover state"),
            )
            .await
            .unwrap();

        let docs = response.rag_context.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].relevance() > 0.99);
        assert!(response.metadata.confidence.unwrap() > 0.89);
        assert_eq!(service.rag().document_count().await, 1);

        let request = &provider.requests()[0];
        let prompt = &request.messages.last().unwrap().content;
        assert!(prompt.starts_with("Context:\n"));
        assert!(prompt.ends_with("Request:\nReact button component with hover state"));
        assert!(request.system_prompt.contains("Relevant project documents"));
    }

    #[tokio::test]
    async fn test_history_sent_as_turns() {
        let provider = ScriptedProvider::replying(vec![Ok(ProviderOutput::text("ok"))]);
        let service = service_with(provider.clone(), RagService::new());
        let newest_first = vec![
            ConversationMessage::new(MessageRole::Assistant, "Here is the form."),
            ConversationMessage::new(MessageRole::User, "Build a form"),
        ];
        let context = ModelContext::new("p1", "Add validation").with_recent_messages(newest_first);

        service.generate_response(MID_MODEL, &context).await.unwrap();

        assert_eq!(
            provider.requests()[0].messages,
            vec![
                ChatMessage::user("Build a form"),
                ChatMessage::assistant("Here is the form."),
                ChatMessage::user("Add validation"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_or_non_text_output_gives_sentinel() {
        let provider = ScriptedProvider::replying(vec![
            Ok(ProviderOutput::default()),
            Ok(ProviderOutput {
                content: vec![ContentBlock::ToolUse {
                    name: "write".to_string(),
                    input: serde_json::json!({}),
                }],
            }),
        ]);
        let service = service_with(provider, RagService::new());
        let context = ModelContext::new("p1", "hi");

        for _ in 0..2 {
            let response = service.generate_response(MID_MODEL, &context).await.unwrap();
            assert_eq!(response.content, NO_RESPONSE);
        }
    }

    #[tokio::test]
    async fn test_auto_routes_by_query() {
        let provider = ScriptedProvider::replying(vec![Ok(ProviderOutput::text("a")), Ok(ProviderOutput::text("b"))]);
        let service = service_with(provider.clone(), RagService::new());

        let large = service
            .generate_response(AUTO_MODEL, &ModelContext::new("p1", "design a microservices architecture"))
            .await
            .unwrap();
        let mid = service
            .generate_response(AUTO_MODEL, &ModelContext::new("p1", "create a button component"))
            .await
            .unwrap();

        assert_eq!(large.metadata.model_used, LARGE_MODEL);
        assert_eq!(mid.metadata.model_used, MID_MODEL);
        assert_eq!(provider.requests()[0].model_id, "claude-3-opus-20240229");
    }

    #[tokio::test]
    async fn test_disabled_features_are_skipped() {
        let provider = ScriptedProvider::replying(vec![Ok(ProviderOutput::text("const a = 1"))]);
        let service = service_with(provider, RagService::new());
        let mut config = (*service.registry().get_model_config(MID_MODEL).unwrap()).clone();
        config.name = "bare".to_string();
        config.rag_enabled = false;
        config.post_processing_enabled = false;
        service.registry().add_model(config);

        let response = service
            .generate_response("bare", &ModelContext::new("p1", "x"))
            .await
            .unwrap();
        assert_eq!(response.content, "const a = 1");
        assert!(!response.metadata.rag_enabled);
        assert!(!response.metadata.post_processed);
    }

    #[tokio::test]
    async fn test_length_bonus_uses_extracted_text() {
        let raw = "const a = 1\n".repeat(41);
        assert_eq!(raw.chars().count(), 492);
        let provider = ScriptedProvider::replying(vec![Ok(ProviderOutput::text(raw))]);
        let service = service_with(provider, RagService::new());

        let response = service
            .generate_response(MID_MODEL, &ModelContext::new("p1", "list constants"))
            .await
            .unwrap();

        assert!(response.content.chars().count() > LENGTH_BONUS_CHARS);
        assert_eq!(response.metadata.confidence, Some(BASE_CONFIDENCE));
    }

    #[test]
    fn test_confidence_bounds() {
        let mut doc = RagDocument::new("d", "x");
        for relevance in [-1.0, 0.0, 0.5, 1.0, 3.0] {
            doc.metadata.relevance_score = Some(relevance);
            for len in [0, 500, 501, 10_000] {
                let c = score_confidence(&vec![doc.clone(); 3], len);
                assert!((0.0..=1.0).contains(&c));
            }
        }
        assert_eq!(score_confidence(&[], 0), 0.7);
        assert!((score_confidence(&[], 501) - 0.75).abs() < 1e-6);
        doc.metadata.relevance_score = Some(1.0);
        assert!((score_confidence(&[doc], 501) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_uses_named_model() {
        let service = service_with(ScriptedProvider::replying(vec![]), RagService::new());
        let query = "design a distributed system";
        assert!(
            service.estimate_processing_time(query, Some(LARGE_MODEL))
                > service.estimate_processing_time(query, Some(MID_MODEL))
        );
        assert_eq!(
            service.estimate_processing_time(query, Some("unknown")),
            service.estimate_processing_time(query, None)
        );
    }
}
