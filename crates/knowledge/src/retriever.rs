//! Query-time retrieval: vectorize, search, map positions back to chunks.

use crate::artifact::IndexArtifact;
use crate::types::{Answer, Query, ScoredChunk};
use crate::vectorizer::Vectorizer;
use vaultqa_core::{AppError, AppResult};

/// Answers queries against one loaded artifact.
///
/// Holds no mutable state, so one instance can serve any number of
/// concurrent callers.
#[derive(Debug)]
pub struct Retriever {
    vectorizer: Vectorizer,
    artifact: IndexArtifact,
}

impl Retriever {
    /// Pair a vectorizer with the artifact it built. Their widths must
    /// agree.
    pub fn new(vectorizer: Vectorizer, artifact: IndexArtifact) -> AppResult<Self> {
        let dimensions = vectorizer.dimensions()?;
        if !artifact.is_empty() && dimensions != artifact.index().dimensions() {
            return Err(AppError::DimensionMismatch {
                expected: artifact.index().dimensions(),
                actual: dimensions,
            });
        }

        Ok(Self {
            vectorizer,
            artifact,
        })
    }

    pub fn artifact(&self) -> &IndexArtifact {
        &self.artifact
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub fn chunk_count(&self) -> usize {
        self.artifact.len()
    }

    /// Top `query.top_k` chunks for `query.text`, best first.
    ///
    /// `best_score` is the first result's score, or 0.0 with no results.
    pub async fn answer(&self, query: &Query) -> AppResult<Answer> {
        if query.text.trim().is_empty() {
            return Err(AppError::EmptyQuery);
        }
        if query.top_k == 0 {
            return Err(AppError::InvalidQuery(
                "top_k must be a positive integer".to_string(),
            ));
        }

        let vector = self.vectorizer.vectorize(&query.text).await?;
        let hits = self.artifact.index().search(&vector, query.top_k)?;

        let results = hits
            .into_iter()
            .map(|hit| {
                let chunk = self.artifact.chunk(hit.position).cloned().ok_or_else(|| {
                    AppError::Storage(format!("No chunk at index position {}", hit.position))
                })?;
                Ok(ScoredChunk {
                    chunk,
                    score: hit.score,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let metric = self.artifact.index().metric();
        let best_score = results.first().map(|r| r.score).unwrap_or(0.0);

        tracing::debug!(
            "Answered query ({} chars): {} results, best_score={:.4}",
            query.text.chars().count(),
            results.len(),
            best_score
        );

        Ok(Answer {
            query: query.text.clone(),
            best_score,
            metric,
            higher_is_better: metric.higher_is_better(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingConfig;
    use crate::index::SimilarityMetric;
    use crate::pipeline::build;
    use crate::types::Document;
    use crate::vectorizer::VectorizerKind;

    async fn retriever(metric: SimilarityMetric) -> Retriever {
        let documents = vec![
            Document::new("generator.txt", "Change the generator oil every fifty hours."),
            Document::new("solar.txt", "Wipe dust off the solar panels each month."),
            Document::new("water.txt", "Replace the water filter cartridge twice a year."),
        ];
        let vectorizer =
            Vectorizer::from_config(VectorizerKind::Lexical, &EmbeddingConfig::default()).unwrap();
        let output = build(&documents, 500, 100, vectorizer, metric).await.unwrap();
        Retriever::new(output.vectorizer, output.artifact).unwrap()
    }

    #[tokio::test]
    async fn test_best_match_first() {
        let retriever = retriever(SimilarityMetric::Cosine).await;
        let answer = retriever
            .answer(&Query::new("how often to change generator oil", 2))
            .await
            .unwrap();

        assert_eq!(answer.results.len(), 2);
        assert_eq!(answer.results[0].chunk.source, "generator.txt");
        assert_eq!(answer.best_score, answer.results[0].score);
        assert!(answer.higher_is_better);
        assert_eq!(answer.metric, SimilarityMetric::Cosine);
    }

    #[tokio::test]
    async fn test_distance_convention() {
        let retriever = retriever(SimilarityMetric::SquaredL2).await;
        let answer = retriever
            .answer(&Query::new("solar panels dust", 3))
            .await
            .unwrap();

        assert!(!answer.higher_is_better);
        assert_eq!(answer.results[0].chunk.source, "solar.txt");
        assert!(answer.results[0].score <= answer.results[1].score);
        assert!(answer.results[1].score <= answer.results[2].score);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let retriever = retriever(SimilarityMetric::Cosine).await;
        assert!(matches!(
            retriever.answer(&Query::new("", 3)).await,
            Err(AppError::EmptyQuery)
        ));
        assert!(matches!(
            retriever.answer(&Query::new("  \n\t", 3)).await,
            Err(AppError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let retriever = retriever(SimilarityMetric::Cosine).await;
        let result = retriever.answer(&Query::new("oil", 0)).await;
        assert!(matches!(result, Err(AppError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_top_k_clamped_to_corpus() {
        let retriever = retriever(SimilarityMetric::Cosine).await;
        let answer = retriever.answer(&Query::new("filter", 50)).await.unwrap();
        assert_eq!(answer.results.len(), 3);
    }

    #[tokio::test]
    async fn test_orthogonal_query_still_succeeds() {
        let retriever = retriever(SimilarityMetric::Cosine).await;
        let answer = retriever
            .answer(&Query::new("zebra xylophone", 1))
            .await
            .unwrap();

        assert_eq!(answer.results.len(), 1);
        assert_eq!(answer.best_score, 0.0);
        // All scores tie at 0.0, lowest position wins
        assert_eq!(answer.results[0].chunk.source, "generator.txt");
    }

    #[tokio::test]
    async fn test_width_mismatch_rejected() {
        let built = retriever(SimilarityMetric::Cosine).await;
        let dense = Vectorizer::from_config(
            VectorizerKind::Dense,
            &EmbeddingConfig {
                dimensions: 7,
                ..Default::default()
            },
        )
        .unwrap();

        let result = Retriever::new(dense, built.artifact().clone());
        assert!(matches!(result, Err(AppError::DimensionMismatch { .. })));
    }
}
