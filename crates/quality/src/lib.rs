//! Post-processing pipeline
//!
//! Ordered, fault-isolated text transforms applied to generated output:
//! code optimization, error correction, formatting and bracket validation,
//! plus caller-supplied custom filters.

#![warn(missing_docs)]

pub mod code;
pub mod filter;
pub mod passes;
pub mod registry;
pub mod engine;

pub use engine::{PostProcessor, ProcessingOptions};
pub use filter::{
    FilterContext, FnFilter, PostProcessingFilter, CODE_OPTIMIZATION, ERROR_CORRECTION,
    FORMATTING, VALIDATION,
};
pub use registry::FilterRegistry;
pub use passes::{
    validation::BracketReport, CodeOptimizationFilter, ErrorCorrectionFilter, FormattingFilter,
    ValidationFilter,
};
