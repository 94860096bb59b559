//! Post-processing filter abstraction.

use composite_core::{ModelConfig, RagDocument};

/// Name of the built-in code optimization pass.
pub const CODE_OPTIMIZATION: &str = "codeOptimization";
/// Name of the built-in error correction pass.
pub const ERROR_CORRECTION: &str = "errorCorrection";
/// Name of the built-in formatting pass.
pub const FORMATTING: &str = "formatting";
/// Name of the built-in validation pass.
pub const VALIDATION: &str = "validation";

/// What a filter knows about the generation it is cleaning up.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Model that produced the content
    pub model: Option<ModelConfig>,

    /// Documents retrieved for the prompt
    pub rag_context: Vec<RagDocument>,
}

/// A named, prioritized text transform.
///
/// Lower priorities run first. A filter that returns an error is skipped
/// and the pipeline continues with the content it was given.
pub trait PostProcessingFilter: Send + Sync {
    /// Unique name.
    fn name(&self) -> &str;

    /// Execution order key, ascending.
    fn priority(&self) -> i32;

    /// Transform `content`.
    fn apply(&self, content: &str, context: &FilterContext) -> anyhow::Result<String>;
}

/// Filter backed by a closure, for custom passes.
pub struct FnFilter<F> {
    name: String,
    priority: i32,
    f: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&str, &FilterContext) -> anyhow::Result<String> + Send + Sync,
{
    /// Create a filter.
    pub fn new(name: impl Into<String>, priority: i32, f: F) -> Self {
        Self {
            name: name.into(),
            priority,
            f,
        }
    }
}

impl<F> PostProcessingFilter for FnFilter<F>
where
    F: Fn(&str, &FilterContext) -> anyhow::Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn apply(&self, content: &str, context: &FilterContext) -> anyhow::Result<String> {
        (self.f)(content, context)
    }
}
