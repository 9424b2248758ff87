//! Document indexing and retrieval engine.
//!
//! Splits documents into overlapping character chunks, turns each chunk
//! into a vector (lexical TF-IDF or dense embeddings), and answers
//! nearest-neighbor queries over a flat index. Index artifacts persist to
//! SQLite and are served through [`ServingState`].

pub mod artifact;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod pipeline;
pub mod progress;
pub mod retriever;
pub mod serving;
pub mod sources;
pub mod store;
pub mod types;
pub mod vectorizer;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use artifact::IndexArtifact;
pub use chunker::{chunk, ChunkConfig};
pub use config::EngineConfig;
pub use index::{FlatIndex, SearchHit, SimilarityMetric};
pub use pipeline::{build, build_index, BuildOutput};
pub use progress::{ProgressEvent, ProgressReporter};
pub use retriever::Retriever;
pub use serving::{ErrorBody, QueryOutcome, ServingState};
pub use sources::DirectorySource;
pub use types::{Answer, BuildStats, Chunk, Document, HealthStatus, Query, ScoredChunk, SourceRecord};
pub use vectorizer::{Vectorizer, VectorizerKind, VectorizerState};
