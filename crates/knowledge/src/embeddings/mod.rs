//! Embedding capability used by the dense vectorizer.
//!
//! Providers turn batches of text into fixed-width vectors. The engine only
//! depends on the [`EmbeddingProvider`] trait; which provider backs it is a
//! configuration choice.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
