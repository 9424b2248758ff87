//! Dense vectorizer backed by an injected embedding provider.

use crate::embeddings::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vaultqa_core::{AppError, AppResult};

/// Persistable identity of the embedding model an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseState {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

/// Embeds text through a provider, in fixed-size batches with a per-call
/// timeout. No fitting step.
#[derive(Debug, Clone)]
pub struct DenseVectorizer {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    timeout: Duration,
}

impl DenseVectorizer {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        if batch_size == 0 {
            return Err(AppError::Config(
                "embedding batch_size must be greater than 0".to_string(),
            ));
        }
        if provider.dimensions() == 0 {
            return Err(AppError::Config(format!(
                "Embedding provider '{}' reports 0 dimensions",
                provider.provider_name()
            )));
        }
        Ok(Self {
            provider,
            batch_size,
            timeout,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn state(&self) -> DenseState {
        DenseState {
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model_name().to_string(),
            dimensions: self.provider.dimensions(),
        }
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    /// Embed `texts` in order, one vector per text.
    ///
    /// Fails as a unit: any failed, timed-out or malformed batch aborts the
    /// whole call and no vectors are returned.
    pub async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let dimensions = self.dimensions();
        let mut vectors = Vec::with_capacity(texts.len());

        for (batch_number, batch) in texts.chunks(self.batch_size).enumerate() {
            let embedded = tokio::time::timeout(self.timeout, self.provider.embed_batch(batch))
                .await
                .map_err(|_| {
                    AppError::EmbeddingUnavailable(format!(
                        "Provider '{}' timed out after {:?} on batch {}",
                        self.provider.provider_name(),
                        self.timeout,
                        batch_number
                    ))
                })??;

            if embedded.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} vectors for a batch of {} texts",
                    embedded.len(),
                    batch.len()
                )));
            }

            if let Some(bad) = embedded.iter().find(|v| v.len() != dimensions) {
                return Err(AppError::DimensionMismatch {
                    expected: dimensions,
                    actual: bad.len(),
                });
            }

            tracing::debug!(
                "Embedded batch {} ({} texts, dim={})",
                batch_number,
                batch.len(),
                dimensions
            );
            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}
