//! Rebuilding an identical corpus yields an identical index.

use super::field_notes;
use crate::chunker::chunk;
use crate::embeddings::EmbeddingConfig;
use crate::index::SimilarityMetric;
use crate::pipeline::{build, BuildOutput};
use crate::vectorizer::{Vectorizer, VectorizerKind, VectorizerState};

async fn build_with(kind: VectorizerKind) -> BuildOutput {
    let embedding = EmbeddingConfig {
        dimensions: 64,
        ..Default::default()
    };
    let vectorizer = Vectorizer::from_config(kind, &embedding).unwrap();
    build(&field_notes(), 60, 15, vectorizer, SimilarityMetric::Cosine)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lexical_rebuild_is_identical() {
    let first = build_with(VectorizerKind::Lexical).await;
    let second = build_with(VectorizerKind::Lexical).await;

    assert_eq!(first.artifact.vectorizer(), second.artifact.vectorizer());
    assert_eq!(first.artifact.index(), second.artifact.index());
    assert_eq!(first.artifact.chunks(), second.artifact.chunks());
    assert_eq!(first.artifact.sources(), second.artifact.sources());

    let VectorizerState::Lexical(state) = first.artifact.vectorizer() else {
        panic!("expected lexical state");
    };
    let mut sorted = state.vocabulary.clone();
    sorted.sort();
    assert_eq!(state.vocabulary, sorted);
}

#[tokio::test]
async fn test_dense_rebuild_is_identical() {
    let first = build_with(VectorizerKind::Dense).await;
    let second = build_with(VectorizerKind::Dense).await;

    assert_eq!(first.artifact.index(), second.artifact.index());
    assert_eq!(first.artifact.chunks(), second.artifact.chunks());
}

#[tokio::test]
async fn test_vectors_follow_chunk_text() {
    let output = build_with(VectorizerKind::Lexical).await;

    for (position, chunk) in output.artifact.chunks().iter().enumerate() {
        let expected = output.vectorizer.vectorize(&chunk.text).await.unwrap();
        assert_eq!(
            output.artifact.index().vector(position).unwrap(),
            expected.as_slice(),
            "vector at position {} does not match its chunk",
            position
        );
    }
}

#[test]
fn test_chunk_golden_output() {
    let text: String = ('a'..='z').cycle().take(30).collect();
    let chunks = chunk(&text, 12, 4).unwrap();

    assert_eq!(
        chunks,
        vec![
            "abcdefghijkl".to_string(),
            "ijklmnopqrst".to_string(),
            "qrstuvwxyzab".to_string(),
            "yzabcd".to_string(),
        ]
    );
}
