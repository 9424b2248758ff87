//! Engine configuration management.
//!
//! Engine settings live in `.vaultqa/engine.yaml` inside the workspace and
//! fall back to defaults when the file is absent.

use crate::chunker::ChunkConfig;
use crate::embeddings::EmbeddingConfig;
use crate::index::SimilarityMetric;
use crate::vectorizer::VectorizerKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vaultqa_core::config::STATE_DIR;
use vaultqa_core::{AppError, AppResult};

/// Indexing and retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Folder holding the documents, relative to the workspace unless absolute
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub vectorizer: VectorizerKind,

    #[serde(default)]
    pub metric: SimilarityMetric,

    /// Results returned when a query does not say
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Provider settings for the dense vectorizer
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("vault")
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_top_k() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            vectorizer: VectorizerKind::default(),
            metric: SimilarityMetric::default(),
            default_top_k: default_top_k(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject settings that would fail later in the pipeline.
    pub fn validate(&self) -> AppResult<()> {
        self.chunk_config()?;

        if self.default_top_k == 0 {
            return Err(AppError::Config(
                "default_top_k must be greater than 0".to_string(),
            ));
        }

        self.embedding.validate()
    }

    /// Validated chunking parameters.
    pub fn chunk_config(&self) -> AppResult<ChunkConfig> {
        ChunkConfig::new(self.chunk_size, self.chunk_overlap)
    }

    /// Documents folder resolved against `workspace`.
    pub fn documents_path(&self, workspace: &Path) -> PathBuf {
        if self.documents_dir.is_absolute() {
            self.documents_dir.clone()
        } else {
            workspace.join(&self.documents_dir)
        }
    }
}

/// Load engine configuration for a workspace.
///
/// Returns the defaults when `.vaultqa/engine.yaml` does not exist.
pub fn load_config(workspace: &Path) -> AppResult<EngineConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!(
            "Using default engine config (no config file at {:?})",
            config_path
        );
        return Ok(EngineConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: EngineConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.validate()?;

    tracing::debug!("Loaded engine config from {:?}", config_path);
    Ok(config)
}

/// Save engine configuration for a workspace.
pub fn save_config(workspace: &Path, config: &EngineConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml)?;

    tracing::debug!("Saved engine config to {:?}", config_path);
    Ok(())
}

/// Path to the engine config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("engine.yaml")
}

/// Path to the persisted index artifact.
pub fn get_index_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_DIR).join("index.sqlite")
}
