//! Index command handler.
//!
//! Reads the documents folder, builds a fresh index and persists it.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use vaultqa_core::{config::AppConfig, AppResult};
use vaultqa_knowledge::config::{get_index_path, load_config};
use vaultqa_knowledge::{
    DirectorySource, ProgressEvent, ProgressReporter, ServingState, SimilarityMetric, VectorizerKind,
};

/// Build the index from a folder of text documents
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Documents folder (default: `documents_dir` from .vaultqa/engine.yaml)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Chunk length in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Vectorizer (lexical, dense)
    #[arg(long)]
    pub vectorizer: Option<VectorizerKind>,

    /// Similarity metric (cosine, squared-l2)
    #[arg(long)]
    pub metric: Option<SimilarityMetric>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let mut engine = load_config(&config.workspace)?;
        if let Some(chunk_size) = self.chunk_size {
            engine.chunk_size = chunk_size;
        }
        if let Some(overlap) = self.overlap {
            engine.chunk_overlap = overlap;
        }
        if let Some(vectorizer) = self.vectorizer {
            engine.vectorizer = vectorizer;
        }
        if let Some(metric) = self.metric {
            engine.metric = metric;
        }
        engine.validate()?;

        let documents_dir = self
            .path
            .clone()
            .unwrap_or_else(|| engine.documents_path(&config.workspace));
        let documents = DirectorySource::new(&documents_dir).documents()?;

        config.ensure_state_dir()?;
        let index_path = get_index_path(&config.workspace);

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple())
            }))
        };

        let state = ServingState::from_config(&engine);
        let stats = state
            .rebuild(&documents, &engine, Some(&index_path), &progress)
            .await?;

        if self.json {
            let output = serde_json::json!({
                "documents": stats.documents_count,
                "chunks": stats.chunks_count,
                "dimensions": stats.dimensions,
                "duration_secs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} documents ({} chunks, dim={}, {} vectorizer, {} metric) in {:.2}s",
                stats.documents_count,
                stats.chunks_count,
                stats.dimensions,
                engine.vectorizer,
                engine.metric,
                stats.duration_secs
            );
            println!("Index written to {}", index_path.display());
        }

        Ok(())
    }
}
