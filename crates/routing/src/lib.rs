//! Model routing
//!
//! Composite model registry, keyword task classification and
//! processing-time estimates.

#![warn(missing_docs)]

pub mod registry;
pub mod classifier;
pub mod estimator;

pub use registry::{builtin_models, ModelRegistry, LARGE_MODEL, MID_MODEL};
pub use classifier::{classify, TaskClassification, TaskComplexity};
pub use estimator::{estimate_processing_time, estimate_processing_time_for};
