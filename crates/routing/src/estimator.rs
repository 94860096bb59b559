//! Processing time estimation.

use composite_core::{ModelConfig, ModelTier};

use crate::classifier::{classify, TaskComplexity};

/// Fixed latency floor, in milliseconds.
pub const BASE_LATENCY_MS: f64 = 2000.0;
/// Added per full 100 characters of query.
pub const MS_PER_100_CHARS: f64 = 100.0;
/// Multiplier for large-tier models.
pub const LARGE_TIER_MULTIPLIER: f64 = 1.5;
/// Added when retrieval runs.
pub const RAG_OVERHEAD_MS: f64 = 500.0;
/// Added when post-processing runs.
pub const POST_PROCESSING_OVERHEAD_MS: f64 = 300.0;

/// Estimate from the raw inputs.
pub fn estimate_processing_time_for(
    query_chars: usize,
    complexity: TaskComplexity,
    tier: ModelTier,
    rag_enabled: bool,
    post_processing_enabled: bool,
) -> u64 {
    let length_term = (query_chars / 100) as f64 * MS_PER_100_CHARS;
    let mut ms = (BASE_LATENCY_MS + length_term) * complexity.multiplier();

    if tier == ModelTier::Large {
        ms *= LARGE_TIER_MULTIPLIER;
    }
    if rag_enabled {
        ms += RAG_OVERHEAD_MS;
    }
    if post_processing_enabled {
        ms += POST_PROCESSING_OVERHEAD_MS;
    }

    ms.round() as u64
}

/// Estimate for a query on `model`, or on a bare standard model when none
/// is given.
pub fn estimate_processing_time(query: &str, model: Option<&ModelConfig>) -> u64 {
    let complexity = classify(query).complexity;
    let (tier, rag, post) = model
        .map(|m| (m.tier(), m.rag_enabled, m.post_processing_enabled))
        .unwrap_or((ModelTier::Standard, false, false));

    estimate_processing_time_for(query.chars().count(), complexity, tier, rag, post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::builtin_models;

    #[test]
    fn test_formula() {
        assert_eq!(
            estimate_processing_time_for(20, TaskComplexity::Low, ModelTier::Standard, false, false),
            2000
        );
        // (2000 + 300) * 1.5 * 1.5 + 500 + 300
        assert_eq!(
            estimate_processing_time_for(350, TaskComplexity::Medium, ModelTier::Large, true, true),
            5975
        );
    }

    #[test]
    fn test_long_high_beats_short_low() {
        for tier in [ModelTier::Standard, ModelTier::Large] {
            for (rag, post) in [(false, false), (true, true)] {
                let long = estimate_processing_time_for(2000, TaskComplexity::High, tier, rag, post);
                let short = estimate_processing_time_for(20, TaskComplexity::Low, tier, rag, post);
                assert!(long > short);
            }
        }
    }

    #[test]
    fn test_deterministic_and_model_aware() {
        let models = builtin_models();
        let query = "design a distributed system";
        let mid = estimate_processing_time(query, Some(&models[0]));
        let large = estimate_processing_time(query, Some(&models[1]));

        assert_eq!(mid, estimate_processing_time(query, Some(&models[0])));
        assert!(large > mid);
        assert_eq!(estimate_processing_time(query, None), 4000);
    }
}
