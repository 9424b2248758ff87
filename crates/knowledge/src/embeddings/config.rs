//! Embedding configuration types.

use serde::{Deserialize, Serialize};
use vaultqa_core::{AppError, AppResult};

/// Embedding settings for the dense vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Number of texts sent to the provider per call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound for one provider call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Provider endpoint override (e.g. the Ollama base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_provider() -> String {
    "trigram".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            normalize: default_normalize(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Reject settings no provider can work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Config(
                "embedding dimensions must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "embedding batch_size must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "embedding timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that this config produces the same embeddings as an index built
    /// with `provider`/`model`/`dimensions`.
    pub fn validate_consistency(
        &self,
        provider: &str,
        model: &str,
        dimensions: usize,
    ) -> AppResult<()> {
        if self.provider != provider {
            return Err(AppError::Config(format!(
                "Provider mismatch: index was built with '{}', configured '{}'",
                provider, self.provider
            )));
        }

        if self.model != model {
            return Err(AppError::Config(format!(
                "Model mismatch: index was built with '{}', configured '{}'",
                model, self.model
            )));
        }

        if self.dimensions != dimensions {
            return Err(AppError::DimensionMismatch {
                expected: dimensions,
                actual: self.dimensions,
            });
        }

        Ok(())
    }
}
