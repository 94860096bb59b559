//! Composite model configuration.

use serde::{Deserialize, Serialize};

/// Context length at or above which a model counts as the large tier.
pub const LARGE_TIER_CONTEXT_LENGTH: u32 = 150_000;

/// Upstream LLM provider behind a composite model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI-style chat completions API
    OpenAi,
    /// Anthropic-style messages API
    Anthropic,
}

impl Provider {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl std::str::FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// The underlying LLM a composite model delegates generation to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    /// Provider serving the model
    pub provider: Provider,

    /// Provider-side model identifier
    pub model_id: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// Declared capabilities of a composite model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    /// Maximum context window, in tokens
    pub max_context_length: u32,

    /// Whether the model can call tools
    pub supports_tool_calling: bool,

    /// Whether the model can stream output
    pub supports_streaming: bool,

    /// Whether the model accepts non-text input
    pub supports_multimodal: bool,

    /// Task labels this model is tuned for, in priority order
    pub optimal_for_tasks: Vec<String>,
}

/// Size tier of a model, derived from its context length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Everyday model
    Standard,
    /// Large-context model for complex work
    Large,
}

/// A named composite model: base LLM plus optional RAG and post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Unique registry key
    pub name: String,

    /// Configuration version
    pub version: String,

    /// Underlying model
    pub base_model: BaseModel,

    /// Retrieve project documents before generation
    pub rag_enabled: bool,

    /// Run the post-processing pipeline on the output
    pub post_processing_enabled: bool,

    /// Declared capabilities
    pub capabilities: ModelCapabilities,
}

impl ModelConfig {
    /// Size tier of this model.
    pub fn tier(&self) -> ModelTier {
        if self.capabilities.max_context_length >= LARGE_TIER_CONTEXT_LENGTH {
            ModelTier::Large
        } else {
            ModelTier::Standard
        }
    }

    /// Whether any optimal-task label matches `task`, case-insensitively.
    ///
    /// A label matches when either string contains the other.
    pub fn matches_task(&self, task: &str) -> bool {
        let task = task.to_lowercase();
        if task.trim().is_empty() {
            return false;
        }
        self.capabilities.optimal_for_tasks.iter().any(|label| {
            let label = label.to_lowercase();
            task.contains(&label) || label.contains(&task)
        })
    }
}
