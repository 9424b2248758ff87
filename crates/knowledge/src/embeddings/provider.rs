//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use std::sync::Arc;
use vaultqa_core::{AppError, AppResult};

/// Trait for embedding providers.
///
/// `embed_batch` must return one vector per input text, in input order, or
/// fail as a whole. Transient failures are reported as
/// `AppError::EmbeddingUnavailable`, permanent ones as `AppError::Embedding`.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider.as_str() {
        "trigram" => {
            if config.model != super::providers::trigram::MODEL {
                return Err(AppError::Config(format!(
                    "Unknown trigram model: '{}'. The trigram provider only supports '{}'",
                    config.model,
                    super::providers::trigram::MODEL
                )));
            }
            let provider =
                super::providers::trigram::TrigramProvider::new(config.dimensions, config.normalize);
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = super::providers::ollama::OllamaProvider::new(config)?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            config.provider
        ))),
    }
}
