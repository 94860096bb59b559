//! Composite model orchestration
//!
//! Provider abstraction, prompt assembly and the response orchestrator that
//! ties routing, retrieval and post-processing together.

#![warn(missing_docs)]

pub mod error;
pub mod config;
pub mod provider;
pub mod openai;
pub mod anthropic;
pub mod prompt;
pub mod orchestrator;

pub use error::{CompositeError, Result};
pub use config::{CompositeConfig, ProviderEndpoint, ProvidersConfig, RetrievalConfig};
pub use provider::{
    ChatMessage, ChatRole, ContentBlock, LlmProvider, LlmRequest, ProviderOutput, ProviderTable,
};
pub use openai::OpenAiProvider;
pub use anthropic::AnthropicProvider;
pub use orchestrator::{
    extract_text, score_confidence, CompositeModelService, AUTO_MODEL, NO_RESPONSE,
};
