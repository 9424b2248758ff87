//! Error types for vaultqa.
//!
//! One enum covers every failure class of the indexing and retrieval
//! engine plus the I/O plumbing around it. Each class stays a distinct
//! variant so callers can match on it instead of parsing messages.

use thiserror::Error;

/// Unified error type for vaultqa.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid configuration (chunk parameters, provider settings, paths)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vector widths disagree between the index, the vectorizer or a query
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The lexical vectorizer was asked to transform before `fit`
    #[error("Vectorizer has not been fitted")]
    NotFitted,

    /// A query arrived before any index was built or loaded
    #[error("Index not ready: build an index first")]
    IndexNotReady,

    /// The corpus produced zero chunks
    #[error("Corpus is empty: no chunks were produced from the documents")]
    EmptyCorpus,

    /// The query text was empty or whitespace
    #[error("Query text is empty")]
    EmptyQuery,

    /// The query was malformed in some other way (e.g. `top_k == 0`)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Transient embedding failure (unreachable, timed out, overloaded)
    #[error("Embedding capability unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Permanent embedding failure (bad request, malformed response)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence layer errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Stable machine-readable kind, used in structured service errors.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigurationError",
            AppError::DimensionMismatch { .. } => "IndexDimensionMismatch",
            AppError::NotFitted => "NotFitted",
            AppError::IndexNotReady => "IndexNotReady",
            AppError::EmptyCorpus => "EmptyCorpus",
            AppError::EmptyQuery => "EmptyQuery",
            AppError::InvalidQuery(_) => "InvalidQuery",
            AppError::EmbeddingUnavailable(_) => "EmbeddingUnavailable",
            AppError::Embedding(_) => "EmbeddingError",
            AppError::Io(_) => "IoError",
            AppError::Storage(_) => "StorageError",
            AppError::Serialization(_) => "SerializationError",
            AppError::Other(_) => "InternalError",
        }
    }

    /// Whether the caller sent a bad request (as opposed to a server fault).
    pub fn is_client_fault(&self) -> bool {
        matches!(self, AppError::EmptyQuery | AppError::InvalidQuery(_))
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::EmbeddingUnavailable(_))
    }

    /// HTTP-style status code for transport layers.
    pub fn status_code(&self) -> u16 {
        if self.is_client_fault() {
            400
        } else {
            500
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
