//! Service configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompositeError, Result};

/// Environment variable overriding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Top-level configuration, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Root of the JSON document and message store
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Provider endpoints and credentials
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// HTTP timeout for provider calls, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Endpoints for each provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// OpenAI-style chat completions endpoint
    #[serde(default = "default_openai")]
    pub openai: ProviderEndpoint,

    /// Anthropic-style messages endpoint
    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderEndpoint,
}

/// One provider endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// API key; unset means the provider is not configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,
}

/// Retrieval settings used by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Documents retrieved for standard-tier models
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Documents retrieved for large-tier models
    #[serde(default = "default_top_k_large")]
    pub top_k_large: usize,

    /// Minimum similarity score
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".composite")
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_openai() -> ProviderEndpoint {
    ProviderEndpoint {
        api_key: None,
        base_url: "https://api.openai.com/v1".to_string(),
    }
}

fn default_anthropic() -> ProviderEndpoint {
    ProviderEndpoint {
        api_key: None,
        base_url: "https://api.anthropic.com/v1".to_string(),
    }
}

fn default_top_k() -> usize {
    5
}

fn default_top_k_large() -> usize {
    10
}

fn default_threshold() -> f32 {
    0.5
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            providers: ProvidersConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            anthropic: default_anthropic(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            top_k_large: default_top_k_large(),
            threshold: default_threshold(),
        }
    }
}

impl CompositeConfig {
    /// Load from `path`, or defaults when the file does not exist, then
    /// apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CompositeError::Config(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&text)
                .map_err(|e| CompositeError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override API keys from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(OPENAI_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.providers.openai.api_key = Some(key);
        }
        if let Some(key) = lookup(ANTHROPIC_API_KEY_ENV).filter(|k| !k.is_empty()) {
            self.providers.anthropic.api_key = Some(key);
        }
    }
}
