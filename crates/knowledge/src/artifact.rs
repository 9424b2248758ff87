//! The index artifact: everything a build produces and a server loads.

use crate::index::FlatIndex;
use crate::types::{Chunk, SourceRecord};
use crate::vectorizer::VectorizerState;
use chrono::{DateTime, Utc};
use vaultqa_core::{AppError, AppResult};

/// Fitted vectorizer state, the flat index and the chunk list.
///
/// The vector at index position `i` was produced from `chunks[i]`. The
/// constructor is the only way to assemble one, so that correspondence and
/// the vector width always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexArtifact {
    vectorizer: VectorizerState,
    index: FlatIndex,
    chunks: Vec<Chunk>,
    sources: Vec<SourceRecord>,
    built_at: DateTime<Utc>,
}

impl IndexArtifact {
    pub fn new(
        vectorizer: VectorizerState,
        index: FlatIndex,
        chunks: Vec<Chunk>,
        sources: Vec<SourceRecord>,
        built_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if index.len() != chunks.len() {
            return Err(AppError::Storage(format!(
                "Index holds {} vectors but there are {} chunks",
                index.len(),
                chunks.len()
            )));
        }

        if !index.is_empty() && index.dimensions() != vectorizer.dimensions() {
            return Err(AppError::DimensionMismatch {
                expected: vectorizer.dimensions(),
                actual: index.dimensions(),
            });
        }

        Ok(Self {
            vectorizer,
            index,
            chunks,
            sources,
            built_at,
        })
    }

    pub fn vectorizer(&self) -> &VectorizerState {
        &self.vectorizer
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    pub fn sources(&self) -> &[SourceRecord] {
        &self.sources
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
