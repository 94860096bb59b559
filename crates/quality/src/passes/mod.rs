//! Built-in passes.
//!
//! Each pass is a set of independent `&str -> String` transforms plus a
//! [`PostProcessingFilter`](crate::PostProcessingFilter) that chains them.

pub mod optimization;
pub mod correction;
pub mod formatting;
pub mod validation;

pub use optimization::CodeOptimizationFilter;
pub use correction::ErrorCorrectionFilter;
pub use formatting::FormattingFilter;
pub use validation::ValidationFilter;
