//! Distance functions for vector scoring.
//!
//! Scores follow the collection metric's natural direction:
//! cosine and dot product are similarities (higher = more similar),
//! Euclidean is the raw L2 distance (lower = more similar).
//! Use [`DistanceMetric::rank`] to order scores.
//!
//! No implicit normalization of stored vectors: they are used as-is.

use shardvec_core::DistanceMetric;

/// Compute the score of `b` against `a` under `metric`
pub fn compute_score(a: &[f32], b: &[f32], metric: DistanceMetric) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Dimension mismatch in score computation");

    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::DotProduct => dot_product(a, b),
        DistanceMetric::Euclidean => euclidean_distance(a, b),
    }
}

/// Query-side scorer.
///
/// Built once per search: the metric is fixed and the query norm is computed
/// up front, so per-candidate work is a single pass over the candidate.
#[derive(Debug, Clone)]
pub struct QueryScorer {
    metric: DistanceMetric,
    query: Vec<f32>,
    query_norm: f32,
}

impl QueryScorer {
    /// Scorer for `query` under `metric`
    pub fn new(metric: DistanceMetric, query: Vec<f32>) -> Self {
        let query_norm = l2_norm(&query);
        QueryScorer {
            metric,
            query,
            query_norm,
        }
    }

    /// Metric in use
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Query vector
    pub fn query(&self) -> &[f32] {
        &self.query
    }

    /// Score one candidate
    #[inline]
    pub fn score(&self, candidate: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::Cosine => {
                let norm = l2_norm(candidate);
                if self.query_norm == 0.0 || norm == 0.0 {
                    0.0
                } else {
                    dot_product(&self.query, candidate) / (self.query_norm * norm)
                }
            }
            DistanceMetric::DotProduct => dot_product(&self.query, candidate),
            DistanceMetric::Euclidean => euclidean_distance(&self.query, candidate),
        }
    }
}

/// Cosine similarity: dot(a,b) / (||a|| * ||b||)
///
/// Range: [-1, 1], higher = more similar
/// Returns 0.0 if either vector has zero norm
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product(a, b) / (norm_a * norm_b)
    }
}

/// Dot product (inner product)
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm (Euclidean length)
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Euclidean distance (L2 distance)
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}
