//! Keyword task classification.

use serde::{Deserialize, Serialize};

/// Task complexity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    /// Simple, short tasks
    Low,
    /// Everyday tasks
    Medium,
    /// Architecture and algorithm work
    High,
}

impl TaskComplexity {
    /// Estimate multiplier for this bucket.
    pub fn multiplier(&self) -> f64 {
        match self {
            TaskComplexity::Low => 1.0,
            TaskComplexity::Medium => 1.5,
            TaskComplexity::High => 2.0,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskComplexity::Low => "low",
            TaskComplexity::Medium => "medium",
            TaskComplexity::High => "high",
        }
    }
}

impl std::fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskClassification {
    /// Task label, comparable against `optimal_for_tasks`
    #[serde(rename = "type")]
    pub task_type: String,

    /// Complexity bucket
    pub complexity: TaskComplexity,
}

/// Task label for architecture and scaling work.
pub const COMPLEX_ARCHITECTURE: &str = "complex architecture";
/// Task label for algorithm and performance work.
pub const ADVANCED_ALGORITHMS: &str = "advanced algorithms";
/// Task label for review and refactoring.
pub const CODE_REVIEW: &str = "code review";
/// Task label for debugging.
pub const DEBUGGING: &str = "debugging";
/// Task label for generating new code, also the fallback.
pub const CODE_GENERATION: &str = "code generation";

/// Keyword buckets, checked in order; first hit wins.
const BUCKETS: &[(&[&str], &str, TaskComplexity)] = &[
    (
        &["architecture", "scalab", "microservice", "distributed", "system design", "infrastructure"],
        COMPLEX_ARCHITECTURE,
        TaskComplexity::High,
    ),
    (
        &["algorithm", "optimiz", "performance", "complexity", "data structure"],
        ADVANCED_ALGORITHMS,
        TaskComplexity::High,
    ),
    (
        &["review", "refactor", "improve", "clean up"],
        CODE_REVIEW,
        TaskComplexity::Medium,
    ),
    (
        &["debug", "fix", "error", "bug", "issue"],
        DEBUGGING,
        TaskComplexity::Medium,
    ),
    (
        &["create", "build", "generate", "implement", "make"],
        CODE_GENERATION,
        TaskComplexity::Medium,
    ),
];

/// Classify a free-text query by keyword.
pub fn classify(query: &str) -> TaskClassification {
    let query = query.to_lowercase();

    let (task_type, complexity) = BUCKETS
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| query.contains(k)))
        .map(|&(_, label, complexity)| (label, complexity))
        .unwrap_or((CODE_GENERATION, TaskComplexity::Medium));

    TaskClassification {
        task_type: task_type.to_string(),
        complexity,
    }
}
