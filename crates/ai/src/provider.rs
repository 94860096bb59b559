//! LLM provider abstraction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use composite_core::{MessageRole, Provider};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::config::CompositeConfig;
use crate::openai::OpenAiProvider;

/// Speaker of a chat turn sent to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The user
    User,
    /// The model
    Assistant,
}

impl ChatRole {
    /// Role for a stored message. System messages are sent as user turns.
    pub fn from_message_role(role: MessageRole) -> Self {
        match role {
            MessageRole::Assistant => ChatRole::Assistant,
            MessageRole::User | MessageRole::System => ChatRole::User,
        }
    }
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker
    pub role: ChatRole,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// Provider-side model identifier
    pub model_id: String,

    /// System prompt
    pub system_prompt: String,

    /// Chat turns, oldest first; the last one is the user prompt
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// A block of provider output.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Generated text
    Text(String),

    /// A tool invocation request
    ToolUse {
        /// Tool name
        name: String,
        /// Tool arguments
        input: serde_json::Value,
    },

    /// Anything else the provider returned
    Other(serde_json::Value),
}

/// Structured provider output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOutput {
    /// Output blocks in order
    pub content: Vec<ContentBlock>,
}

impl ProviderOutput {
    /// Output holding a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
        }
    }
}

/// An upstream text generation service.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logging.
    fn name(&self) -> &str;

    /// Generate a completion.
    async fn generate(&self, request: &LlmRequest) -> anyhow::Result<ProviderOutput>;
}

/// Provider implementations keyed by [`Provider`].
#[derive(Clone, Default)]
pub struct ProviderTable {
    providers: HashMap<Provider, Arc<dyn LlmProvider>>,
}

impl ProviderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP providers for every endpoint that has an API key.
    pub fn from_config(config: &CompositeConfig) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut table = Self::new();

        let openai = &config.providers.openai;
        if let Some(key) = &openai.api_key {
            table.insert(
                Provider::OpenAi,
                Arc::new(OpenAiProvider::new(openai.base_url.clone(), key.clone(), timeout)),
            );
        }

        let anthropic = &config.providers.anthropic;
        if let Some(key) = &anthropic.api_key {
            table.insert(
                Provider::Anthropic,
                Arc::new(AnthropicProvider::new(anthropic.base_url.clone(), key.clone(), timeout)),
            );
        }

        debug!("Configured providers: {:?}", table.providers());
        table
    }

    /// Register a provider implementation, replacing any existing one.
    pub fn insert(&mut self, provider: Provider, implementation: Arc<dyn LlmProvider>) {
        self.providers.insert(provider, implementation);
    }

    /// Builder-style [`ProviderTable::insert`].
    pub fn with(mut self, provider: Provider, implementation: Arc<dyn LlmProvider>) -> Self {
        self.insert(provider, implementation);
        self
    }

    /// Look up the implementation for a provider.
    pub fn get(&self, provider: Provider) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(&provider).cloned()
    }

    /// Providers with an implementation.
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<_> = self.providers.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }
}
