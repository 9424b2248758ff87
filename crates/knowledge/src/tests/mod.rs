//! Cross-module scenario tests.

mod determinism;

use crate::artifact::IndexArtifact;
use crate::embeddings::EmbeddingProvider;
use crate::index::{FlatIndex, SimilarityMetric};
use crate::retriever::Retriever;
use crate::types::{Chunk, Document};
use crate::vectorizer::{DenseVectorizer, Vectorizer};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vaultqa_core::AppResult;

/// Provider that returns fixed vectors for known texts.
#[derive(Debug)]
pub(crate) struct TableProvider {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
}

impl TableProvider {
    pub(crate) fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dimensions,
            table: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TableProvider {
    fn provider_name(&self) -> &str {
        "table"
    }

    fn model_name(&self) -> &str {
        "table-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                self.table
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimensions])
            })
            .collect())
    }
}

/// Retriever over hand-picked vectors. Chunk `i` is `"chunk {i}"` from
/// `toy.txt`; `queries` maps query text to its vector.
pub(crate) fn toy_retriever(
    vectors: Vec<Vec<f32>>,
    metric: SimilarityMetric,
    queries: &[(&str, Vec<f32>)],
) -> Retriever {
    let dimensions = vectors[0].len();
    let provider = Arc::new(TableProvider::new(dimensions, queries));
    let dense = DenseVectorizer::new(provider, 8, Duration::from_secs(5)).unwrap();
    let vectorizer = Vectorizer::Dense(dense);

    let chunks = (0..vectors.len())
        .map(|i| Chunk {
            source: "toy.txt".to_string(),
            chunk_id: i as u32,
            text: format!("chunk {}", i),
        })
        .collect();
    let index = FlatIndex::build(vectors, metric).unwrap();
    let artifact =
        IndexArtifact::new(vectorizer.state().unwrap(), index, chunks, Vec::new(), Utc::now())
            .unwrap();

    Retriever::new(vectorizer, artifact).unwrap()
}

/// A small maintenance-notes corpus.
pub(crate) fn field_notes() -> Vec<Document> {
    vec![
        Document::new(
            "generator.md",
            "# Generator\nChange the oil every fifty hours of runtime. \
             Check the air filter monthly and replace the spark plug each season.",
        ),
        Document::new(
            "solar.md",
            "# Solar\nWipe dust off the panels after storms. \
             The charge controller shows battery voltage; keep it above 12.2 volts.",
        ),
        Document::new(
            "water.txt",
            "Replace the water filter cartridge twice a year. \
             Flush the cistern before winter so the pipes do not freeze.",
        ),
    ]
}

pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
