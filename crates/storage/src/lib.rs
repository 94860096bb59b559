//! Storage abstraction and implementations for composite models.
//!
//! This crate provides the conversation source that feeds retrieval and the
//! document store that retrieval persists to and warm-starts from, with a
//! JSON-file reference implementation and an in-memory one.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{ConversationSource, DocumentStore, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::InMemoryConversationStore;
