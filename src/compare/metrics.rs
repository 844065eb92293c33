//! List-level similarity metrics.

use super::{require_all_finite, require_equal_lengths, ComparisonError, Side};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier for a list-level similarity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// |A ∩ B| / |A ∪ B| over duplicate-free inputs.
    #[default]
    JaccardSet,
    /// Unbounded sum of pairwise products.
    DotProduct,
    /// Cosine of the angle between the vectors, in [-1, 1].
    Cosine,
    /// Pearson correlation coefficient, in [-1, 1].
    Pearson,
    /// Σmin / Σmax over nonnegative vectors, in [0, 1].
    MinMax,
}

impl SimilarityMetric {
    /// Stable name used in configuration and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::JaccardSet => "jaccard_set",
            SimilarityMetric::DotProduct => "dot_product",
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Pearson => "pearson",
            SimilarityMetric::MinMax => "min_max",
        }
    }

    /// Compute this metric over two sequences.
    pub fn compute(&self, left: &[f64], right: &[f64]) -> Result<f64, ComparisonError> {
        match self {
            SimilarityMetric::JaccardSet => jaccard_set(left, right),
            SimilarityMetric::DotProduct => dot_product(left, right),
            SimilarityMetric::Cosine => cosine(left, right),
            SimilarityMetric::Pearson => pearson(left, right),
            SimilarityMetric::MinMax => min_max(left, right),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set key for a float: every NaN shares one bucket and `-0.0 == 0.0`.
fn set_key(x: f64) -> u64 {
    if x.is_nan() {
        f64::NAN.to_bits()
    } else if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}

fn to_set(values: &[f64], side: Side) -> Result<HashSet<u64>, ComparisonError> {
    let set: HashSet<u64> = values.iter().copied().map(set_key).collect();
    if set.len() != values.len() {
        return Err(ComparisonError::Duplicates(side));
    }
    Ok(set)
}

/// Jaccard similarity treating both inputs as sets.
///
/// Duplicates are an error. An empty union counts as identical.
pub fn jaccard_set(left: &[f64], right: &[f64]) -> Result<f64, ComparisonError> {
    let a = to_set(left, Side::Left)?;
    let b = to_set(right, Side::Right)?;
    let union = a.union(&b).count();
    if union == 0 {
        return Ok(1.0);
    }
    Ok(a.intersection(&b).count() as f64 / union as f64)
}

/// Dot product of equal-length finite vectors.
pub fn dot_product(left: &[f64], right: &[f64]) -> Result<f64, ComparisonError> {
    const CONTEXT: &str = "dot_product";
    require_equal_lengths(CONTEXT, left, right)?;
    require_all_finite(CONTEXT, Side::Left, left)?;
    require_all_finite(CONTEXT, Side::Right, right)?;
    Ok(left.iter().zip(right).map(|(a, b)| a * b).sum())
}

/// Cosine similarity in [-1, 1].
///
/// Two zero vectors are identical (1.0); exactly one zero vector gives 0.0.
pub fn cosine(left: &[f64], right: &[f64]) -> Result<f64, ComparisonError> {
    const CONTEXT: &str = "cosine_similarity";
    require_equal_lengths(CONTEXT, left, right)?;
    require_all_finite(CONTEXT, Side::Left, left)?;
    require_all_finite(CONTEXT, Side::Right, right)?;

    let mut dot = 0.0;
    let mut norm_left = 0.0;
    let mut norm_right = 0.0;
    for (a, b) in left.iter().zip(right) {
        dot += a * b;
        norm_left += a * a;
        norm_right += b * b;
    }

    if norm_left == 0.0 && norm_right == 0.0 {
        return Ok(1.0);
    }
    if norm_left == 0.0 || norm_right == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_left.sqrt() * norm_right.sqrt()))
}

/// Pearson correlation coefficient in [-1, 1].
///
/// Needs at least two samples. Two constant sequences score 1.0 when they
/// are identical and 0.0 otherwise; one constant sequence scores 0.0.
pub fn pearson(left: &[f64], right: &[f64]) -> Result<f64, ComparisonError> {
    const CONTEXT: &str = "pearson_similarity";
    require_equal_lengths(CONTEXT, left, right)?;
    if left.len() < 2 {
        return Err(ComparisonError::TooFewSamples(left.len()));
    }
    require_all_finite(CONTEXT, Side::Left, left)?;
    require_all_finite(CONTEXT, Side::Right, right)?;

    let n = left.len() as f64;
    let mean_left = left.iter().sum::<f64>() / n;
    let mean_right = right.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_left = 0.0;
    let mut var_right = 0.0;
    for (a, b) in left.iter().zip(right) {
        let da = a - mean_left;
        let db = b - mean_right;
        cov += da * db;
        var_left += da * da;
        var_right += db * db;
    }

    if var_left == 0.0 && var_right == 0.0 {
        return Ok(if left == right { 1.0 } else { 0.0 });
    }
    if var_left == 0.0 || var_right == 0.0 {
        return Ok(0.0);
    }
    Ok(cov / (var_left.sqrt() * var_right.sqrt()))
}

/// Min-max similarity `Σ min(x, y) / Σ max(x, y)` for nonnegative vectors.
///
/// An all-zero denominator counts as identical.
pub fn min_max(left: &[f64], right: &[f64]) -> Result<f64, ComparisonError> {
    const CONTEXT: &str = "min_max_similarity";
    require_equal_lengths(CONTEXT, left, right)?;
    require_all_finite(CONTEXT, Side::Left, left)?;
    require_all_finite(CONTEXT, Side::Right, right)?;

    let mut num = 0.0;
    let mut den = 0.0;
    for (index, (&a, &b)) in left.iter().zip(right).enumerate() {
        if a < 0.0 || b < 0.0 {
            return Err(ComparisonError::Negative {
                index,
                left: a,
                right: b,
            });
        }
        num += a.min(b);
        den += a.max(b);
    }

    if den == 0.0 {
        return Ok(1.0);
    }
    Ok(num / den)
}
