//! Build pipeline: documents in, index artifact out.
//!
//! Chunk every document, vectorize every chunk (fitting first for the
//! lexical variant), then build the flat index over the vectors in chunk
//! order. Any failure aborts the build; there is no partial artifact.

use crate::artifact::IndexArtifact;
use crate::chunker::{chunk_document, ChunkConfig};
use crate::index::{FlatIndex, SimilarityMetric};
use crate::progress::ProgressReporter;
use crate::types::{BuildStats, Chunk, Document, SourceRecord};
use crate::vectorizer::Vectorizer;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Instant;
use vaultqa_core::{AppError, AppResult};

/// Chunks handed to the vectorizer between two progress events.
const VECTORIZE_SLICE: usize = 256;

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    pub artifact: IndexArtifact,

    /// The vectorizer, fitted when lexical, ready to vectorize queries
    pub vectorizer: Vectorizer,

    pub stats: BuildStats,
}

/// Build with raw chunking parameters, validating them first.
pub async fn build(
    documents: &[Document],
    chunk_size: usize,
    overlap: usize,
    vectorizer: Vectorizer,
    metric: SimilarityMetric,
) -> AppResult<BuildOutput> {
    let chunk_config = ChunkConfig::new(chunk_size, overlap)?;
    build_index(
        documents,
        &chunk_config,
        vectorizer,
        metric,
        &ProgressReporter::noop(),
    )
    .await
}

/// Build an index artifact from `documents`.
///
/// Fails with `EmptyCorpus` when chunking yields nothing and with `Config`
/// when two documents share a source name.
pub async fn build_index(
    documents: &[Document],
    chunk_config: &ChunkConfig,
    mut vectorizer: Vectorizer,
    metric: SimilarityMetric,
    progress: &ProgressReporter,
) -> AppResult<BuildOutput> {
    let start = Instant::now();
    let total_documents = documents.len() as u64;

    tracing::info!(
        "Building {} index from {} documents (chunk_size={}, overlap={})",
        vectorizer.kind(),
        documents.len(),
        chunk_config.chunk_size(),
        chunk_config.overlap()
    );

    let mut seen = HashSet::with_capacity(documents.len());
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut sources = Vec::with_capacity(documents.len());

    for (i, document) in documents.iter().enumerate() {
        if !seen.insert(document.source.as_str()) {
            return Err(AppError::Config(format!(
                "Duplicate document source '{}'",
                document.source
            )));
        }

        progress.scan(i as u64 + 1, Some(total_documents), &document.source);

        let document_chunks = chunk_document(document, chunk_config);
        tracing::debug!(
            "Chunked {}: {} chars, {} chunks",
            document.source,
            document.text.chars().count(),
            document_chunks.len()
        );

        sources.push(SourceRecord {
            source: document.source.clone(),
            content_hash: content_hash(&document.text),
            byte_count: document.text.len() as u64,
            chunk_count: document_chunks.len() as u32,
        });
        chunks.extend(document_chunks);

        progress.chunk(i as u64 + 1, Some(total_documents), chunks.len() as u64);
    }

    if chunks.is_empty() {
        return Err(AppError::EmptyCorpus);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    vectorizer.fit(&texts)?;

    let kind = vectorizer.kind().to_string();
    let total_chunks = texts.len() as u64;
    let mut vectors = Vec::with_capacity(texts.len());
    for slice in texts.chunks(VECTORIZE_SLICE) {
        vectors.extend(vectorizer.vectorize_batch(slice).await?);
        progress.embed(vectors.len() as u64, Some(total_chunks), &kind);
    }

    let dimensions = vectorizer.dimensions()?;
    let index = FlatIndex::with_dimensions(dimensions, vectors, metric)?;
    progress.index(index.len() as u64, dimensions);

    let artifact = IndexArtifact::new(vectorizer.state()?, index, chunks, sources, Utc::now())?;

    let stats = BuildStats {
        documents_count: documents.len() as u32,
        chunks_count: artifact.len() as u32,
        dimensions,
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Build completed: {} documents, {} chunks, dim={}, metric={} in {:.2}s",
        stats.documents_count,
        stats.chunks_count,
        stats.dimensions,
        metric,
        stats.duration_secs
    );

    Ok(BuildOutput {
        artifact,
        vectorizer,
        stats,
    })
}

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingConfig;
    use crate::progress::{Phase, ProgressEvent};
    use crate::vectorizer::VectorizerKind;
    use std::sync::{Arc, Mutex};

    fn lexical() -> Vectorizer {
        Vectorizer::from_config(VectorizerKind::Lexical, &EmbeddingConfig::default()).unwrap()
    }

    fn documents() -> Vec<Document> {
        vec![
            Document::new("generator.txt", "x".repeat(900)),
            Document::new("empty.txt", ""),
            Document::new("pump.md", "Prime the pump before starting it."),
        ]
    }

    #[tokio::test]
    async fn test_positions_follow_document_order() {
        let output = build(&documents(), 500, 100, lexical(), SimilarityMetric::Cosine)
            .await
            .unwrap();
        let chunks = output.artifact.chunks();

        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[0].source.as_str(), chunks[0].chunk_id), ("generator.txt", 0));
        assert_eq!((chunks[1].source.as_str(), chunks[1].chunk_id), ("generator.txt", 1));
        assert_eq!((chunks[2].source.as_str(), chunks[2].chunk_id), ("pump.md", 0));
        assert_eq!(output.artifact.index().len(), 3);
        assert_eq!(output.stats.documents_count, 3);
        assert_eq!(output.stats.chunks_count, 3);
    }

    #[tokio::test]
    async fn test_sources_record_hash_and_counts() {
        let output = build(&documents(), 500, 100, lexical(), SimilarityMetric::Cosine)
            .await
            .unwrap();
        let sources = output.artifact.sources();

        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[1].chunk_count, 0);
        assert_eq!(sources[0].byte_count, 900);
        assert_eq!(sources[1].content_hash, content_hash(""));
        assert_eq!(sources[2].content_hash.len(), 64);
    }

    #[tokio::test]
    async fn test_empty_corpus_fails() {
        let result = build(&[], 500, 100, lexical(), SimilarityMetric::Cosine).await;
        assert!(matches!(result, Err(AppError::EmptyCorpus)));

        let blank = vec![Document::new("a.txt", ""), Document::new("b.txt", "")];
        let result = build(&blank, 500, 100, lexical(), SimilarityMetric::Cosine).await;
        assert!(matches!(result, Err(AppError::EmptyCorpus)));
    }

    #[tokio::test]
    async fn test_invalid_chunk_parameters_fail_fast() {
        let result = build(&documents(), 100, 100, lexical(), SimilarityMetric::Cosine).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_duplicate_sources_rejected() {
        let duplicated = vec![
            Document::new("notes.txt", "first copy"),
            Document::new("notes.txt", "second copy"),
        ];
        let result = build(&duplicated, 500, 100, lexical(), SimilarityMetric::Cosine).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_progress_counters() {
        let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        let chunk_config = ChunkConfig::new(500, 100).unwrap();
        build_index(
            &documents(),
            &chunk_config,
            lexical(),
            SimilarityMetric::Cosine,
            &reporter,
        )
        .await
        .unwrap();

        let events = events.lock().unwrap();
        let last = |phase: Phase| {
            events
                .iter()
                .rev()
                .find(|e| e.phase == phase)
                .cloned()
                .unwrap()
        };

        assert_eq!(events.iter().filter(|e| e.phase == Phase::Scan).count(), 3);
        assert!(last(Phase::Chunk).message.starts_with("3 chunks"));
        assert_eq!(last(Phase::Embed).current, 3);
        assert_eq!(last(Phase::Index).current, 3);
    }

    #[tokio::test]
    async fn test_dense_build_uses_provider_width() {
        let embedding = EmbeddingConfig {
            dimensions: 48,
            batch_size: 2,
            ..Default::default()
        };
        let vectorizer = Vectorizer::from_config(VectorizerKind::Dense, &embedding).unwrap();

        let output = build(&documents(), 500, 100, vectorizer, SimilarityMetric::SquaredL2)
            .await
            .unwrap();

        assert_eq!(output.stats.dimensions, 48);
        assert_eq!(output.artifact.index().dimensions(), 48);
        assert_eq!(output.artifact.vectorizer().dimensions(), 48);
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
