//! Post-processing engine.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::filter::{
    FilterContext, PostProcessingFilter, CODE_OPTIMIZATION, ERROR_CORRECTION, FORMATTING,
    VALIDATION,
};
use crate::registry::FilterRegistry;

/// Which passes to run.
#[derive(Clone, Default)]
pub struct ProcessingOptions {
    /// Run the `codeOptimization` pass
    pub enable_code_optimization: bool,

    /// Run the `errorCorrection` pass
    pub enable_error_correction: bool,

    /// Run the `formatting` pass
    pub enable_formatting: bool,

    /// Run the `validation` pass
    pub enable_validation: bool,

    /// Extra filters, always run
    pub custom_filters: Vec<Arc<dyn PostProcessingFilter>>,
}

impl ProcessingOptions {
    /// All four built-in passes, no custom filters.
    pub fn all() -> Self {
        Self {
            enable_code_optimization: true,
            enable_error_correction: true,
            enable_formatting: true,
            enable_validation: true,
            custom_filters: Vec::new(),
        }
    }

    /// Add a custom filter.
    pub fn with_filter(mut self, filter: Arc<dyn PostProcessingFilter>) -> Self {
        self.custom_filters.push(filter);
        self
    }

    fn enabled_builtins(&self) -> impl Iterator<Item = &'static str> {
        [
            (CODE_OPTIMIZATION, self.enable_code_optimization),
            (ERROR_CORRECTION, self.enable_error_correction),
            (FORMATTING, self.enable_formatting),
            (VALIDATION, self.enable_validation),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
    }
}

impl fmt::Debug for ProcessingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingOptions")
            .field("enable_code_optimization", &self.enable_code_optimization)
            .field("enable_error_correction", &self.enable_error_correction)
            .field("enable_formatting", &self.enable_formatting)
            .field("enable_validation", &self.enable_validation)
            .field(
                "custom_filters",
                &self.custom_filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Runs the filter chain over generated content.
///
/// Built-in passes are looked up by name in the filter pool, so a filter
/// added under a built-in name takes over that pass.
pub struct PostProcessor {
    registry: RwLock<FilterRegistry>,
}

impl PostProcessor {
    /// Create a processor with the built-in passes.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(FilterRegistry::with_builtins()),
        }
    }

    /// Run the selected filters in ascending priority order.
    ///
    /// A filter that errors or panics is skipped and the chain continues
    /// with the content it was given.
    pub fn process(
        &self,
        content: &str,
        options: &ProcessingOptions,
        context: Option<&FilterContext>,
    ) -> String {
        let default_context = FilterContext::default();
        let context = context.unwrap_or(&default_context);

        let mut chain: Vec<Arc<dyn PostProcessingFilter>> = {
            let registry = self.read();
            options
                .enabled_builtins()
                .filter_map(|name| registry.get(name))
                .collect()
        };
        chain.extend(options.custom_filters.iter().cloned());
        // Stable: ties keep selection order.
        chain.sort_by_key(|f| f.priority());

        let mut current = content.to_string();
        for filter in chain {
            match catch_unwind(AssertUnwindSafe(|| filter.apply(&current, context))) {
                Ok(Ok(next)) => {
                    debug!("Filter {} applied", filter.name());
                    current = next;
                }
                Ok(Err(e)) => warn!("Filter {} failed, skipping: {:#}", filter.name(), e),
                Err(_) => warn!("Filter {} panicked, skipping", filter.name()),
            }
        }

        current
    }

    /// Add a filter to the pool, replacing any with the same name.
    pub fn add_filter(&self, filter: Arc<dyn PostProcessingFilter>) {
        self.write().register(filter);
    }

    /// Remove a filter from the pool by name.
    pub fn remove_filter(&self, name: &str) -> bool {
        self.write().unregister(name).is_some()
    }

    /// Names of the filters in the pool.
    pub fn filter_names(&self) -> Vec<String> {
        self.read().names()
    }

    /// Restore the built-in pool.
    pub fn reset(&self) {
        *self.write() = FilterRegistry::with_builtins();
    }

    fn read(&self) -> RwLockReadGuard<'_, FilterRegistry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FilterRegistry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new()
    }
}
