//! Knowledge Service
//!
//! Text embedding, document storage, and similarity retrieval for
//! retrieval-augmented generation.

#![warn(missing_docs)]

pub mod embedding;
pub mod vector;
pub mod service;

pub use embedding::{Embedder, HashEmbedder, EMBEDDING_DIMENSIONS};
pub use vector::cosine_similarity;
pub use service::{RagService, RagServiceBuilder, MESSAGE_LOAD_LIMIT};
