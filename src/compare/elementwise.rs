//! Elementwise comparison of paired sequences.

use super::{require_equal_lengths, Compared, ComparisonError};
use std::fmt::Write as _;

/// Default absolute epsilon for [`default_numeric_similarity`].
pub const DEFAULT_ABS_EPSILON: f64 = 1e-12;

/// Default number of mismatches listed in a failure summary.
pub const DEFAULT_MAX_MISMATCHES: usize = 10;

/// Per-index equality. With `nan_equal`, NaN matches NaN.
pub fn equal(
    observed: &[f64],
    reference: &[f64],
    nan_equal: bool,
) -> Result<Vec<Compared<bool>>, ComparisonError> {
    require_equal_lengths("elementwise_equal", observed, reference)?;
    Ok(observed
        .iter()
        .zip(reference)
        .map(|(&a, &b)| Compared {
            observed: a,
            reference: b,
            result: (nan_equal && a.is_nan() && b.is_nan()) || a == b,
        })
        .collect())
}

/// Relative-error closeness where 1.0 means identical.
///
/// `1 - |a-b| / max(|a|, |b|, abs_epsilon)`, clamped to [0, 1]. NaN only
/// matches NaN; infinities only match the same infinity.
pub fn default_numeric_similarity(a: f64, b: f64, abs_epsilon: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return if a.is_nan() && b.is_nan() { 1.0 } else { 0.0 };
    }
    if a.is_infinite() || b.is_infinite() {
        return if a == b { 1.0 } else { 0.0 };
    }
    let denom = a.abs().max(b.abs()).max(abs_epsilon);
    (1.0 - (a - b).abs() / denom).clamp(0.0, 1.0)
}

/// Per-index similarity scores using [`default_numeric_similarity`].
pub fn similarity_scores(
    observed: &[f64],
    reference: &[f64],
    abs_epsilon: f64,
) -> Result<Vec<Compared<f64>>, ComparisonError> {
    if abs_epsilon.is_nan() || abs_epsilon <= 0.0 {
        return Err(ComparisonError::InvalidEpsilon("elementwise_similarity_scores"));
    }
    similarity_scores_with(observed, reference, |a, b| {
        default_numeric_similarity(a, b, abs_epsilon)
    })
}

/// Per-index similarity scores using a caller-supplied scoring function.
pub fn similarity_scores_with<F>(
    observed: &[f64],
    reference: &[f64],
    score: F,
) -> Result<Vec<Compared<f64>>, ComparisonError>
where
    F: Fn(f64, f64) -> f64,
{
    require_equal_lengths("elementwise_similarity_scores", observed, reference)?;
    Ok(observed
        .iter()
        .zip(reference)
        .map(|(&a, &b)| Compared {
            observed: a,
            reference: b,
            result: score(a, b),
        })
        .collect())
}

/// Gate each score with `score >= threshold`.
pub fn similarity_threshold(
    observed: &[f64],
    reference: &[f64],
    threshold: f64,
    abs_epsilon: f64,
) -> Result<Vec<Compared<bool>>, ComparisonError> {
    let scores = similarity_scores(observed, reference, abs_epsilon)?;
    if !threshold.is_finite() {
        return Err(ComparisonError::InvalidThreshold(threshold));
    }
    Ok(scores
        .into_iter()
        .map(|s| Compared {
            observed: s.observed,
            reference: s.reference,
            result: s.result >= threshold,
        })
        .collect())
}

/// List failed equality comparisons, at most `max_items`.
///
/// Returns an empty string when everything matched.
pub fn summarize_equality_mismatches(comparisons: &[Compared<bool>], max_items: usize) -> String {
    let bad = comparisons
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.result)
        .map(|(i, c)| format!("[{}] observed={:?}, reference={:?}", i, c.observed, c.reference));
    summarize(bad, max_items)
}

/// List scores below `threshold`, at most `max_items`.
///
/// Returns an empty string when every score passed.
pub fn summarize_threshold_mismatches(
    scores: &[Compared<f64>],
    threshold: f64,
    max_items: usize,
) -> String {
    let bad = scores
        .iter()
        .enumerate()
        .filter(|(_, c)| below(c.result, threshold))
        .map(|(i, c)| {
            format!(
                "[{}] score={:.6} observed={:?}, reference={:?}",
                i, c.result, c.observed, c.reference
            )
        });
    summarize(bad, max_items)
}

/// Labeled variant of [`summarize_threshold_mismatches`]: entries are
/// identified by label instead of index.
pub fn summarize_labeled_threshold_mismatches(
    labels: &[String],
    scores: &[Compared<f64>],
    threshold: f64,
    max_items: usize,
) -> String {
    let bad = labels
        .iter()
        .zip(scores)
        .filter(|(_, c)| below(c.result, threshold))
        .map(|(label, c)| {
            format!(
                "[{}] score={:.6} observed={:?}, reference={:?}",
                label, c.result, c.observed, c.reference
            )
        });
    summarize(bad, max_items)
}

/// NaN scores never pass.
fn below(score: f64, threshold: f64) -> bool {
    score.is_nan() || score < threshold
}

fn summarize(lines: impl Iterator<Item = String>, max_items: usize) -> String {
    let mut shown = Vec::new();
    let mut total = 0usize;
    for line in lines {
        total += 1;
        if shown.len() < max_items {
            shown.push(line);
        }
    }
    if shown.is_empty() {
        return String::new();
    }
    let mut out = format!("mismatches:\n{}", shown.join("\n"));
    let more = total - shown.len();
    if more > 0 {
        let _ = write!(out, "\n... ({} more)", more);
    }
    out
}
