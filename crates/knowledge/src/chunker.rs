//! Character-based text chunking with configurable size and overlap.
//!
//! Sizes are counted in Unicode scalar values, never bytes, so a chunk
//! boundary can not split a multi-byte character.

use crate::types::{Chunk, Document};
use vaultqa_core::{AppError, AppResult};

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Create chunking parameters, rejecting `chunk_size == 0` and
    /// `overlap >= chunk_size` (the window would never advance).
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `text` into overlapping segments.
///
/// Validates the parameters and delegates to [`chunk_text`].
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    let config = ChunkConfig::new(chunk_size, overlap)?;
    Ok(chunk_text(text, &config))
}

/// Split `text` into segments of up to `chunk_size` characters, each one
/// starting `chunk_size - overlap` characters after the previous one.
///
/// Stops as soon as a segment reaches the end of the text, so the final
/// segment may be shorter than `chunk_size`. Empty text yields no segments.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character start, plus the end of the text.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = offsets.len() - 1;

    let mut segments = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(char_count);
        segments.push(text[offsets[start]..offsets[end]].to_string());

        if end == char_count {
            break;
        }
        start += config.step();
    }

    segments
}

/// Chunk one document, numbering chunks from 0 in text order.
pub fn chunk_document(document: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = chunk_text(&document.text, config)
        .into_iter()
        .enumerate()
        .map(|(chunk_id, text)| Chunk {
            source: document.source.clone(),
            chunk_id: chunk_id as u32,
            text,
        })
        .collect();

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        document.source,
        chunks.len(),
        config.chunk_size,
        config.overlap
    );

    chunks
}
