//! Serving state: the loaded index behind an explicit lifecycle.
//!
//! A server constructs one `ServingState` at startup and shares it by
//! reference. Until an index is installed every query fails with
//! `IndexNotReady`. Installing a new retriever swaps it in atomically;
//! queries already running keep the snapshot they started with.

use crate::config::EngineConfig;
use crate::pipeline::build_index;
use crate::progress::ProgressReporter;
use crate::retriever::Retriever;
use crate::store::{load_artifact, save_artifact};
use crate::types::{Answer, BuildStats, Document, HealthStatus, Query};
use crate::vectorizer::Vectorizer;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use vaultqa_core::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
enum Lifecycle {
    #[default]
    Unloaded,
    Ready(Arc<Retriever>),
}

/// Owner of the currently served index.
#[derive(Debug)]
pub struct ServingState {
    lifecycle: RwLock<Lifecycle>,
    default_top_k: usize,
}

impl Default for ServingState {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Structured error returned at the service boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip)]
    pub status: u16,
}

impl From<&AppError> for ErrorBody {
    fn from(error: &AppError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            status: error.status_code(),
        }
    }
}

/// Either an answer or a structured error, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Answer(Answer),
    Error(ErrorBody),
}

impl QueryOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Answer(_) => 200,
            Self::Error(body) => body.status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

impl ServingState {
    /// An unloaded state answering with `default_top_k` results when a
    /// query does not say.
    pub fn new(default_top_k: usize) -> Self {
        Self {
            lifecycle: RwLock::new(Lifecycle::Unloaded),
            default_top_k,
        }
    }

    /// Serving state configured from engine settings.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.default_top_k)
    }

    /// Swap in `retriever`. Returns the number of chunks now served.
    pub fn install(&self, retriever: Retriever) -> usize {
        let chunk_count = retriever.chunk_count();
        let mut lifecycle = self
            .lifecycle
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *lifecycle = Lifecycle::Ready(Arc::new(retriever));
        drop(lifecycle);

        tracing::info!("Serving index with {} chunks", chunk_count);
        chunk_count
    }

    /// Snapshot of the current retriever.
    pub fn retriever(&self) -> AppResult<Arc<Retriever>> {
        match &*self.lifecycle.read().unwrap_or_else(PoisonError::into_inner) {
            Lifecycle::Ready(retriever) => Ok(Arc::clone(retriever)),
            Lifecycle::Unloaded => Err(AppError::IndexNotReady),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.retriever().is_ok()
    }

    /// `{status: "ok", chunk_count}`; chunk_count is 0 while unloaded.
    pub fn health(&self) -> HealthStatus {
        let chunk_count = self
            .retriever()
            .map(|retriever| retriever.chunk_count())
            .unwrap_or(0);

        HealthStatus {
            status: "ok".to_string(),
            chunk_count,
        }
    }

    /// Answer `text` with `top_k` results, or the default when `None`.
    pub async fn query(&self, text: &str, top_k: Option<usize>) -> AppResult<Answer> {
        if text.trim().is_empty() {
            return Err(AppError::EmptyQuery);
        }

        let retriever = self.retriever()?;
        let query = Query::new(text, top_k.unwrap_or(self.default_top_k));
        retriever.answer(&query).await
    }

    /// Like [`query`](Self::query), but every failure becomes a structured
    /// error instead of propagating.
    pub async fn query_response(&self, text: &str, top_k: Option<usize>) -> QueryOutcome {
        match self.query(text, top_k).await {
            Ok(answer) => QueryOutcome::Answer(answer),
            Err(error) => {
                if error.is_client_fault() {
                    tracing::debug!("Rejected query: {}", error);
                } else {
                    tracing::warn!("Query failed ({}): {}", error.kind(), error);
                }
                QueryOutcome::Error(ErrorBody::from(&error))
            }
        }
    }

    /// Load the artifact persisted at `path` and serve it.
    ///
    /// On failure the previously served index, if any, stays in place.
    pub fn load_from(&self, path: &Path, config: &EngineConfig) -> AppResult<usize> {
        let artifact = load_artifact(path)?;
        let vectorizer = Vectorizer::from_state(artifact.vectorizer(), &config.embedding)?;
        let retriever = Retriever::new(vectorizer, artifact)?;

        tracing::info!("Loaded index from {:?}", path);
        Ok(self.install(retriever))
    }

    /// Build a fresh index from `documents`, optionally persist it, then
    /// serve it.
    ///
    /// Queries keep using the old index until the swap. On failure nothing
    /// is persisted or swapped.
    pub async fn rebuild(
        &self,
        documents: &[Document],
        config: &EngineConfig,
        persist_to: Option<&Path>,
        progress: &ProgressReporter,
    ) -> AppResult<BuildStats> {
        let chunk_config = config.chunk_config()?;
        let vectorizer = Vectorizer::from_config(config.vectorizer, &config.embedding)?;

        let output = build_index(documents, &chunk_config, vectorizer, config.metric, progress)
            .await?;

        if let Some(path) = persist_to {
            progress.persist(output.artifact.len() as u64, &path.to_string_lossy());
            save_artifact(path, &output.artifact)?;
        }

        let retriever = Retriever::new(output.vectorizer, output.artifact)?;
        self.install(retriever);

        Ok(output.stats)
    }
}
