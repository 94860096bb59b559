//! Post-processing filter registry.

use std::sync::Arc;

use crate::filter::PostProcessingFilter;
use crate::passes::{CodeOptimizationFilter, ErrorCorrectionFilter, FormattingFilter, ValidationFilter};

/// Registry of named filters, in registration order.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: Vec<Arc<dyn PostProcessingFilter>>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Create a registry holding the four built-in passes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CodeOptimizationFilter));
        registry.register(Arc::new(ErrorCorrectionFilter));
        registry.register(Arc::new(FormattingFilter));
        registry.register(Arc::new(ValidationFilter));
        registry
    }

    /// Register a filter. A filter with the same name is replaced in place.
    pub fn register(&mut self, filter: Arc<dyn PostProcessingFilter>) {
        match self.filters.iter_mut().find(|f| f.name() == filter.name()) {
            Some(slot) => *slot = filter,
            None => self.filters.push(filter),
        }
    }

    /// Unregister a filter by name.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn PostProcessingFilter>> {
        let index = self.filters.iter().position(|f| f.name() == name)?;
        Some(self.filters.remove(index))
    }

    /// Get a filter by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn PostProcessingFilter>> {
        self.filters.iter().find(|f| f.name() == name).cloned()
    }

    /// List all filters.
    pub fn list(&self) -> &[Arc<dyn PostProcessingFilter>] {
        &self.filters
    }

    /// Names of all filters.
    pub fn names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name().to_string()).collect()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
