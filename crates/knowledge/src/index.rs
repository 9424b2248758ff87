//! Flat (exhaustive) vector index.
//!
//! Every query is compared against every stored vector, O(n·d) per query.
//! That is fast enough for corpora of up to roughly a million chunks and
//! keeps results exact. An approximate index can slot in behind the same
//! `search` contract later.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use vaultqa_core::{AppError, AppResult};

/// Similarity measure, fixed when the index is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity in [-1, 1], higher is better
    #[default]
    Cosine,
    /// Squared Euclidean distance, >= 0, lower is better
    SquaredL2,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::SquaredL2 => "squared_l2",
        }
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// Score `candidate` against `query`. Both slices have equal length.
    ///
    /// NaN scores (from NaN components) are mapped to the worst possible
    /// value so they never outrank a real score.
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> f32 {
        let score = match self {
            Self::Cosine => cosine_similarity(query, candidate),
            Self::SquaredL2 => squared_l2(query, candidate),
        };

        if score.is_nan() {
            self.worst()
        } else {
            score
        }
    }

    fn worst(&self) -> f32 {
        match self {
            Self::Cosine => f32::NEG_INFINITY,
            Self::SquaredL2 => f32::INFINITY,
        }
    }

    /// `Less` when score `a` ranks ahead of score `b`.
    fn rank(&self, a: f32, b: f32) -> Ordering {
        match self {
            Self::Cosine => b.total_cmp(&a),
            Self::SquaredL2 => a.total_cmp(&b),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "cosine" => Ok(Self::Cosine),
            "squared_l2" | "l2" | "euclidean" => Ok(Self::SquaredL2),
            other => Err(AppError::Config(format!(
                "Unknown similarity metric: '{}'. Supported: cosine, squared_l2",
                other
            ))),
        }
    }
}

/// One search result: a stored position and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub score: f32,
}

/// Exhaustive similarity index over equally sized vectors.
///
/// Vectors are kept row-major in one contiguous buffer; row `i` is the
/// vector inserted at position `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    metric: SimilarityMetric,
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from `vectors`, which must all share one width.
    ///
    /// An empty vector list yields an empty index of dimensionality 0.
    pub fn build(vectors: Vec<Vec<f32>>, metric: SimilarityMetric) -> AppResult<Self> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        Self::with_dimensions(dimensions, vectors, metric)
    }

    /// Build an index whose vectors must all have exactly `dimensions`
    /// components.
    pub fn with_dimensions(
        dimensions: usize,
        vectors: Vec<Vec<f32>>,
        metric: SimilarityMetric,
    ) -> AppResult<Self> {
        if dimensions == 0 && !vectors.is_empty() {
            return Err(AppError::Config(
                "Cannot index zero-dimensional vectors".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(dimensions * vectors.len());
        for vector in vectors {
            if vector.len() != dimensions {
                return Err(AppError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(&vector);
        }

        tracing::debug!(
            "Built flat index: {} vectors, dim={}, metric={}",
            data.len().checked_div(dimensions).unwrap_or(0),
            dimensions,
            metric
        );

        Ok(Self {
            metric,
            dimensions,
            data,
        })
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.dimensions).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimensions;
        self.data.get(start..start + self.dimensions)
    }

    /// Iterate stored vectors in position order.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0, and an index with 0 dimensions is empty
        self.data.chunks_exact(self.dimensions.max(1))
    }

    /// Return the `k` best-scoring positions, best first.
    ///
    /// `k` is clamped to the number of stored vectors. Equal scores are
    /// ordered by ascending position. An empty index returns no hits.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .vectors()
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                score: self.metric.score(query, vector),
            })
            .collect();

        let metric = self.metric;
        let order = |a: &SearchHit, b: &SearchHit| {
            metric
                .rank(a.score, b.score)
                .then_with(|| a.position.cmp(&b.position))
        };

        let k = k.min(hits.len());
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, order);
            hits.truncate(k);
        }
        hits.sort_by(order);

        Ok(hits)
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sum of squared per-dimension differences.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(hits: &[SearchHit]) -> Vec<usize> {
        hits.iter().map(|h| h.position).collect()
    }

    #[test]
    fn test_squared_l2_tie_break_by_position() {
        let index = FlatIndex::build(
            vec![vec![1.0], vec![5.0], vec![3.0]],
            SimilarityMetric::SquaredL2,
        )
        .unwrap();

        let hits = index.search(&[3.0], 2).unwrap();
        assert_eq!(
            hits,
            vec![
                SearchHit {
                    position: 2,
                    score: 0.0
                },
                SearchHit {
                    position: 0,
                    score: 4.0
                },
            ]
        );

        let all = index.search(&[3.0], 3).unwrap();
        assert_eq!(positions(&all), vec![2, 0, 1]);
    }

    #[test]
    fn test_cosine_orders_descending() {
        let index = FlatIndex::build(
            vec![
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![-1.0, 0.0],
            ],
            SimilarityMetric::Cosine,
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 4).unwrap();
        assert_eq!(positions(&hits), vec![1, 2, 0, 3]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!((hits[3].score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_ties_prefer_earlier_position() {
        let index = FlatIndex::build(
            vec![vec![2.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![3.0, 0.0]],
            SimilarityMetric::Cosine,
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(positions(&hits), vec![0, 2, 3]);
    }

    #[test]
    fn test_k_is_clamped() {
        let index =
            FlatIndex::build(vec![vec![1.0], vec![2.0]], SimilarityMetric::SquaredL2).unwrap();
        assert_eq!(index.search(&[0.0], 10).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = FlatIndex::build(Vec::new(), SimilarityMetric::Cosine).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert!(index.search(&[1.0, 2.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let result = FlatIndex::build(
            vec![vec![1.0, 2.0], vec![1.0]],
            SimilarityMetric::Cosine,
        );
        assert!(matches!(
            result,
            Err(AppError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_search_rejects_wrong_query_width() {
        let index = FlatIndex::build(vec![vec![1.0, 2.0]], SimilarityMetric::Cosine).unwrap();
        assert!(matches!(
            index.search(&[1.0, 2.0, 3.0], 1),
            Err(AppError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_zero_dimensional_vectors_rejected() {
        let result = FlatIndex::build(vec![vec![], vec![]], SimilarityMetric::Cosine);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_nan_never_outranks_real_scores() {
        let index = FlatIndex::build(
            vec![vec![f32::NAN, 0.0], vec![0.5, 0.5]],
            SimilarityMetric::Cosine,
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(positions(&hits), vec![1, 0]);
    }

    #[test]
    fn test_large_index_selects_true_top_k() {
        let vectors: Vec<Vec<f32>> = (0..500).map(|i| vec![(i % 97) as f32]).collect();
        let index = FlatIndex::build(vectors, SimilarityMetric::SquaredL2).unwrap();

        let hits = index.search(&[50.0], 5).unwrap();
        assert_eq!(hits.len(), 5);
        // value 50 appears at positions 50, 147, 244, 341, 438
        assert_eq!(positions(&hits), vec![50, 147, 244, 341, 438]);
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_vector_accessor() {
        let index =
            FlatIndex::build(vec![vec![1.0, 2.0], vec![3.0, 4.0]], SimilarityMetric::Cosine)
                .unwrap();
        assert_eq!(index.vector(1), Some(&[3.0, 4.0][..]));
        assert_eq!(index.vector(2), None);
        assert_eq!(index.vectors().count(), 2);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!(
            "cosine".parse::<SimilarityMetric>().unwrap(),
            SimilarityMetric::Cosine
        );
        assert_eq!(
            "squared-l2".parse::<SimilarityMetric>().unwrap(),
            SimilarityMetric::SquaredL2
        );
        assert!("manhattan".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
