//! Orchestration errors.

use composite_core::Provider;
use thiserror::Error;

/// Errors surfaced by [`CompositeModelService`](crate::CompositeModelService).
#[derive(Debug, Error)]
pub enum CompositeError {
    /// No composite model registered under this name
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// No provider implementation for the model's provider
    #[error("no provider configured for {0}")]
    ProviderNotConfigured(Provider),

    /// The provider call failed
    #[error("provider error: {0:#}")]
    Provider(#[source] anyhow::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for orchestration.
pub type Result<T> = std::result::Result<T, CompositeError>;
