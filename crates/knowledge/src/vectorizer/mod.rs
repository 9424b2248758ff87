//! Text vectorization strategies.
//!
//! Two interchangeable variants share one interface:
//! - `Lexical`: fitted vocabulary with IDF weights, one dimension per term
//! - `Dense`: an external embedding provider with a fixed output width
//!
//! The variant is chosen by configuration. Both expose `fit` (a no-op for
//! dense), `vectorize` and `vectorize_batch`.

pub mod dense;
pub mod lexical;

pub use dense::{DenseState, DenseVectorizer};
pub use lexical::{LexicalState, LexicalVectorizer};

use crate::embeddings::{create_provider, EmbeddingConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use vaultqa_core::{AppError, AppResult};

/// Which vectorizer variant to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorizerKind {
    #[default]
    Lexical,
    Dense,
}

impl fmt::Display for VectorizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => f.write_str("lexical"),
            Self::Dense => f.write_str("dense"),
        }
    }
}

impl FromStr for VectorizerKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" | "tfidf" => Ok(Self::Lexical),
            "dense" | "embedding" => Ok(Self::Dense),
            other => Err(AppError::Config(format!(
                "Unknown vectorizer: '{}'. Supported: lexical, dense",
                other
            ))),
        }
    }
}

/// Persisted vectorizer state, tagged by variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VectorizerState {
    Lexical(LexicalState),
    Dense(DenseState),
}

impl VectorizerState {
    pub fn kind(&self) -> VectorizerKind {
        match self {
            Self::Lexical(_) => VectorizerKind::Lexical,
            Self::Dense(_) => VectorizerKind::Dense,
        }
    }

    /// Output width of vectors produced under this state.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Lexical(state) => state.vocabulary.len(),
            Self::Dense(state) => state.dimensions,
        }
    }
}

/// A vectorizer of either variant.
#[derive(Debug, Clone)]
pub enum Vectorizer {
    Lexical(LexicalVectorizer),
    Dense(DenseVectorizer),
}

impl Vectorizer {
    /// Create a fresh vectorizer for a build. Lexical vectorizers come back
    /// unfitted; dense ones get a provider from `embedding`.
    pub fn from_config(kind: VectorizerKind, embedding: &EmbeddingConfig) -> AppResult<Self> {
        match kind {
            VectorizerKind::Lexical => Ok(Self::Lexical(LexicalVectorizer::new())),
            VectorizerKind::Dense => Ok(Self::Dense(dense_from_config(embedding)?)),
        }
    }

    /// Restore the vectorizer an index was built with.
    ///
    /// For dense state, `embedding` must name the same provider, model and
    /// width that produced the stored vectors.
    pub fn from_state(state: &VectorizerState, embedding: &EmbeddingConfig) -> AppResult<Self> {
        match state {
            VectorizerState::Lexical(lexical) => Ok(Self::Lexical(
                LexicalVectorizer::from_state(lexical.clone())?,
            )),
            VectorizerState::Dense(dense) => {
                embedding.validate_consistency(&dense.provider, &dense.model, dense.dimensions)?;
                Ok(Self::Dense(dense_from_config(embedding)?))
            }
        }
    }

    pub fn kind(&self) -> VectorizerKind {
        match self {
            Self::Lexical(_) => VectorizerKind::Lexical,
            Self::Dense(_) => VectorizerKind::Dense,
        }
    }

    /// Fit hook. Learns the vocabulary for lexical; nothing for dense.
    pub fn fit(&mut self, corpus: &[String]) -> AppResult<()> {
        match self {
            Self::Lexical(lexical) => lexical.fit(corpus),
            Self::Dense(_) => Ok(()),
        }
    }

    pub fn dimensions(&self) -> AppResult<usize> {
        match self {
            Self::Lexical(lexical) => lexical.dimensions(),
            Self::Dense(dense) => Ok(dense.dimensions()),
        }
    }

    pub fn state(&self) -> AppResult<VectorizerState> {
        match self {
            Self::Lexical(lexical) => Ok(VectorizerState::Lexical(lexical.state()?.clone())),
            Self::Dense(dense) => Ok(VectorizerState::Dense(dense.state())),
        }
    }

    pub async fn vectorize(&self, text: &str) -> AppResult<Vec<f32>> {
        match self {
            Self::Lexical(lexical) => lexical.transform(text),
            Self::Dense(dense) => dense.embed(text).await,
        }
    }

    /// Vectorize many texts, preserving order. All-or-nothing.
    pub async fn vectorize_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        match self {
            Self::Lexical(lexical) => texts.iter().map(|t| lexical.transform(t)).collect(),
            Self::Dense(dense) => dense.embed_batch(texts).await,
        }
    }
}

fn dense_from_config(embedding: &EmbeddingConfig) -> AppResult<DenseVectorizer> {
    let provider = create_provider(embedding)?;
    DenseVectorizer::new(
        provider,
        embedding.batch_size,
        Duration::from_secs(embedding.timeout_secs),
    )
}
