//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

use crate::index::SimilarityMetric;

/// A source document handed over by the extraction layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Source name (usually a path relative to the documents folder)
    pub source: String,

    /// Raw extracted text
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A text segment of one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document name
    pub source: String,

    /// 0-based index of this chunk within its source
    pub chunk_id: u32,

    /// Text content
    pub text: String,
}

/// Per-document bookkeeping recorded alongside the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source document name
    pub source: String,

    /// SHA-256 of the document text, hex encoded
    pub content_hash: String,

    /// Document size in bytes
    pub byte_count: u64,

    /// Number of chunks produced from this source
    pub chunk_count: u32,
}

/// A retrieval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Free-text question
    pub text: String,

    /// Number of chunks to return
    pub top_k: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            top_k,
        }
    }
}

/// A retrieved chunk and its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,

    /// Similarity or distance, depending on the index metric
    pub score: f32,
}

/// Response to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Query text as received
    pub query: String,

    /// Score of the best result, 0.0 when there are no results
    pub best_score: f32,

    /// Similarity convention the scores follow
    pub metric: SimilarityMetric,

    /// True for cosine similarity, false for squared distance
    pub higher_is_better: bool,

    /// Results ordered best-first
    pub results: Vec<ScoredChunk>,
}

/// Service health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always "ok" when the process answers
    pub status: String,

    /// Chunks currently loaded, 0 when no index is loaded
    pub chunk_count: usize,
}

/// Statistics from a build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Number of documents scanned
    pub documents_count: u32,

    /// Number of chunks produced
    pub chunks_count: u32,

    /// Vector dimensionality of the built index
    pub dimensions: usize,

    /// Duration in seconds
    pub duration_secs: f64,
}
