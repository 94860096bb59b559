//! Text embeddings for similarity retrieval.
//!
//! [`HashEmbedder`] is a deterministic, dependency-free fingerprint: every
//! lower-cased word is hashed and spread over all dimensions as a sine wave,
//! weighted by `1 / (position + 1)`, and the sum is L2-normalised. It is
//! sensitive to word order and frequency and carries no semantics beyond
//! shared words. Stored embeddings depend on its exact numeric behavior.

/// Embedding length produced by [`HashEmbedder`].
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Text to fixed-length vector.
pub trait Embedder: Send + Sync {
    /// Embed `text`. Implementations must be deterministic.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Length of every vector returned by [`Embedder::embed`].
    fn dimensions(&self) -> usize;

    /// Name recorded alongside embeddings.
    fn model_name(&self) -> &str;
}

/// Sine-spread rolling-hash embedder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create an embedder with [`EMBEDDING_DIMENSIONS`] dimensions.
    pub fn new() -> Self {
        Self::with_dimensions(EMBEDDING_DIMENSIONS)
    }

    /// Create an embedder with a custom length.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0.0f64; self.dimensions];

        for (position, word) in text.to_lowercase().split_whitespace().enumerate() {
            let hash = word_hash(word) as f64;
            let weight = 1.0 / (position as f64 + 1.0);
            for (j, slot) in acc.iter_mut().enumerate() {
                *slot += (hash + j as f64).sin() * weight;
            }
        }

        let magnitude = acc.iter().map(|v| v * v).sum::<f64>().sqrt();
        let magnitude = if magnitude == 0.0 { 1.0 } else { magnitude };

        acc.into_iter().map(|v| (v / magnitude) as f32).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hash-sine-v1"
    }
}

/// Rolling polynomial hash (`h * 31 + c`) over UTF-16 code units with
/// 32-bit wraparound.
fn word_hash(word: &str) -> i32 {
    word.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32)
    })
}
