//! Composite model registry.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use composite_core::{BaseModel, ModelCapabilities, ModelConfig, Provider};
use tracing::debug;

use crate::classifier::{classify, ADVANCED_ALGORITHMS, CODE_GENERATION, CODE_REVIEW, COMPLEX_ARCHITECTURE, DEBUGGING};

/// Everyday built-in model, also the recommendation fallback.
pub const MID_MODEL: &str = "composite-mid";
/// Large-context built-in model.
pub const LARGE_MODEL: &str = "composite-large";

/// The two built-in model configurations, mid first.
pub fn builtin_models() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            name: MID_MODEL.to_string(),
            version: "1.0.0".to_string(),
            base_model: BaseModel {
                provider: Provider::OpenAi,
                model_id: "gpt-4o".to_string(),
                temperature: 0.7,
                max_tokens: 4096,
            },
            rag_enabled: true,
            post_processing_enabled: true,
            capabilities: ModelCapabilities {
                max_context_length: 128_000,
                supports_tool_calling: true,
                supports_streaming: true,
                supports_multimodal: false,
                optimal_for_tasks: vec![
                    CODE_GENERATION.to_string(),
                    DEBUGGING.to_string(),
                    "component creation".to_string(),
                    "refactoring".to_string(),
                ],
            },
        },
        ModelConfig {
            name: LARGE_MODEL.to_string(),
            version: "1.0.0".to_string(),
            base_model: BaseModel {
                provider: Provider::Anthropic,
                model_id: "claude-3-opus-20240229".to_string(),
                temperature: 0.5,
                max_tokens: 8192,
            },
            rag_enabled: true,
            post_processing_enabled: true,
            capabilities: ModelCapabilities {
                max_context_length: 200_000,
                supports_tool_calling: true,
                supports_streaming: true,
                supports_multimodal: true,
                optimal_for_tasks: vec![
                    COMPLEX_ARCHITECTURE.to_string(),
                    "system design".to_string(),
                    ADVANCED_ALGORITHMS.to_string(),
                    CODE_REVIEW.to_string(),
                ],
            },
        },
    ]
}

/// Catalog of composite models, kept in registration order.
///
/// Order matters: when several models match a task, the earliest
/// registered one is recommended.
pub struct ModelRegistry {
    models: RwLock<Vec<Arc<ModelConfig>>>,
    default_model: String,
}

impl ModelRegistry {
    /// Create a registry holding the built-in models.
    pub fn new() -> Self {
        let registry = Self::empty();
        for model in builtin_models() {
            registry.add_model(model);
        }
        registry
    }

    /// Create a registry with no models.
    pub fn empty() -> Self {
        Self {
            models: RwLock::new(Vec::new()),
            default_model: MID_MODEL.to_string(),
        }
    }

    /// Set the name returned when no model matches a task.
    pub fn with_default_model(mut self, name: impl Into<String>) -> Self {
        self.default_model = name.into();
        self
    }

    /// Name returned when no model matches a task.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Registered model names, in registration order.
    pub fn get_available_models(&self) -> Vec<String> {
        self.read().iter().map(|m| m.name.clone()).collect()
    }

    /// Look up a model by name.
    pub fn get_model_config(&self, name: &str) -> Option<Arc<ModelConfig>> {
        self.read().iter().find(|m| m.name == name).cloned()
    }

    /// All registered configurations, in registration order.
    pub fn models(&self) -> Vec<Arc<ModelConfig>> {
        self.read().clone()
    }

    /// Register a model. A model with the same name is replaced in place,
    /// keeping its position.
    pub fn add_model(&self, config: ModelConfig) {
        let mut models = self.write();
        let config = Arc::new(config);
        match models.iter_mut().find(|m| m.name == config.name) {
            Some(slot) => {
                debug!("Replacing model {}", config.name);
                *slot = config;
            }
            None => {
                debug!("Registering model {}", config.name);
                models.push(config);
            }
        }
    }

    /// Remove a model by name.
    pub fn remove_model(&self, name: &str) -> bool {
        let mut models = self.write();
        let before = models.len();
        models.retain(|m| m.name != name);
        models.len() != before
    }

    /// Recommend a model name for a task.
    ///
    /// The task text is matched against each model's optimal tasks in
    /// registration order; if nothing matches, the text is classified and
    /// the classified task type is matched the same way. Falls back to the
    /// default model.
    pub fn recommend_model(&self, task: &str) -> String {
        if let Some(name) = self.first_match(task) {
            return name;
        }

        let classified = classify(task);
        if let Some(name) = self.first_match(&classified.task_type) {
            debug!("Recommending {} via task type {}", name, classified.task_type);
            return name;
        }

        self.default_model.clone()
    }

    /// Restore the built-in models.
    pub fn reset(&self) {
        *self.write() = builtin_models().into_iter().map(Arc::new).collect();
    }

    fn first_match(&self, task: &str) -> Option<String> {
        self.read()
            .iter()
            .find(|m| m.matches_task(task))
            .map(|m| m.name.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<ModelConfig>>> {
        self.models.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<ModelConfig>>> {
        self.models.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composite_core::ModelTier;

    fn model(name: &str, tasks: &[&str]) -> ModelConfig {
        let mut config = builtin_models().remove(0);
        config.name = name.to_string();
        config.capabilities.optimal_for_tasks = tasks.iter().map(|s| s.to_string()).collect();
        config
    }

    #[test]
    fn test_builtins() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.get_available_models(), vec![MID_MODEL, LARGE_MODEL]);

        let mid = registry.get_model_config(MID_MODEL).unwrap();
        let large = registry.get_model_config(LARGE_MODEL).unwrap();
        assert!(large.capabilities.max_context_length > mid.capabilities.max_context_length);
        assert_eq!(mid.tier(), ModelTier::Standard);
        assert_eq!(large.tier(), ModelTier::Large);
        assert!(large.capabilities.supports_multimodal);
    }

    #[test]
    fn test_add_replaces_in_place_and_remove() {
        let registry = ModelRegistry::new();
        let mut replacement = model(MID_MODEL, &["anything"]);
        replacement.version = "2.0.0".to_string();
        registry.add_model(replacement);

        assert_eq!(registry.get_available_models(), vec![MID_MODEL, LARGE_MODEL]);
        assert_eq!(registry.get_model_config(MID_MODEL).unwrap().version, "2.0.0");

        assert!(registry.remove_model(MID_MODEL));
        assert!(!registry.remove_model(MID_MODEL));
        assert!(registry.get_model_config(MID_MODEL).is_none());

        registry.reset();
        assert_eq!(registry.get_available_models(), vec![MID_MODEL, LARGE_MODEL]);
    }

    #[test]
    fn test_first_registered_match_wins() {
        let registry = ModelRegistry::empty();
        registry.add_model(model("first", &["testing"]));
        registry.add_model(model("second", &["unit testing"]));
        assert_eq!(registry.recommend_model("unit testing"), "first");

        let reversed = ModelRegistry::empty();
        reversed.add_model(model("second", &["unit testing"]));
        reversed.add_model(model("first", &["testing"]));
        assert_eq!(reversed.recommend_model("unit testing"), "second");
    }

    #[test]
    fn test_recommend_end_to_end() {
        let registry = ModelRegistry::empty();
        registry.add_model(model("mid", &["code generation"]));
        registry.add_model(model("lg", &["complex architecture"]));

        assert_eq!(registry.recommend_model("design a microservices architecture"), "lg");
        assert_eq!(registry.recommend_model("create a button component"), "mid");
    }

    #[test]
    fn test_recommend_falls_back_to_default() {
        let registry = ModelRegistry::empty()
            .with_default_model("fallback");
        registry.add_model(model("only", &["poetry"]));
        assert_eq!(registry.recommend_model("fix my bug"), "fallback");
        assert_eq!(registry.recommend_model(""), "fallback");
    }

    #[test]
    fn test_builtin_routing() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.recommend_model("complex architecture"), LARGE_MODEL);
        assert_eq!(registry.recommend_model("code review"), LARGE_MODEL);
        assert_eq!(registry.recommend_model("scale our infrastructure"), LARGE_MODEL);
        assert_eq!(registry.recommend_model("build a login form"), MID_MODEL);
    }
}
