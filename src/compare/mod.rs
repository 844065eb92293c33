//! Similarity and comparison engine.
//!
//! Three layers, each usable on its own:
//!
//! - [`metrics`]: list-level similarity scores (Jaccard over sets, dot
//!   product, cosine, Pearson, min-max ratio)
//! - [`elementwise`]: per-index equality and similarity scoring with
//!   deterministic mismatch summaries
//! - [`labels`]: alignment of labeled values against a reference label set
//!
//! Data problems (length mismatches, non-finite or negative inputs, label
//! mismatches) are returned as [`ComparisonError`]; requirements turn them
//! into failed checks.

pub mod elementwise;
pub mod labels;
pub mod metrics;
pub mod series;

pub use elementwise::{
    default_numeric_similarity, equal, similarity_scores, similarity_scores_with,
    similarity_threshold, summarize_equality_mismatches, summarize_labeled_threshold_mismatches,
    summarize_threshold_mismatches, DEFAULT_ABS_EPSILON, DEFAULT_MAX_MISMATCHES,
};
pub use labels::{align_by_reference, label_id, normalize_label, AlignPolicy, Aligned, LabeledValues};
pub use metrics::SimilarityMetric;
pub use series::{LabeledSeries, NumericSeries};

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One observed-vs-reference comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compared<T> {
    /// Value produced by the experiment run.
    pub observed: f64,
    /// Expected value.
    pub reference: f64,
    /// Comparison result (`bool` for equality, `f64` for a score).
    pub result: T,
}

/// Which side of a comparison a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// A bounded list of labels for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelList {
    shown: Vec<String>,
    total: usize,
}

impl LabelList {
    /// Keep the first `max_items` labels, remembering how many there were.
    pub fn new(labels: Vec<String>, max_items: usize) -> Self {
        let total = labels.len();
        let shown = labels.into_iter().take(max_items).collect();
        Self { shown, total }
    }

    /// Labels included in the message.
    pub fn shown(&self) -> &[String] {
        &self.shown
    }

    /// Total number of labels, shown or not.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl fmt::Display for LabelList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shown.join(", "))?;
        let more = self.total - self.shown.len();
        if more > 0 {
            write!(f, ", ... ({} more)", more)?;
        }
        Ok(())
    }
}

/// Data errors raised while comparing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComparisonError {
    #[error("{context}: length mismatch: left has {left}, right has {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },

    #[error("{context}.{side}: non-finite value at index {index}: {value:?}")]
    NonFinite {
        context: &'static str,
        side: Side,
        index: usize,
        value: f64,
    },

    #[error("jaccard_set_similarity: {0} input contains duplicates (multiset not allowed)")]
    Duplicates(Side),

    #[error("pearson_similarity: need at least 2 samples, got {0}")]
    TooFewSamples(usize),

    #[error("min_max_similarity: negative value at index {index}: left={left:?}, right={right:?}")]
    Negative { index: usize, left: f64, right: f64 },

    #[error("{0}: abs_epsilon must be > 0")]
    InvalidEpsilon(&'static str),

    #[error("similarity_threshold: threshold must be finite, got {0:?}")]
    InvalidThreshold(f64),

    #[error("{side}: duplicate label: {label:?}")]
    DuplicateLabel { side: &'static str, label: String },

    #[error("missing labels in observed: {0}")]
    MissingLabels(LabelList),

    #[error("extra labels in observed: {0}")]
    ExtraLabels(LabelList),

    #[error("{context}: {message}")]
    Input { context: String, message: String },

    #[error("failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
}

pub(crate) fn require_equal_lengths(
    context: &'static str,
    left: &[f64],
    right: &[f64],
) -> Result<(), ComparisonError> {
    if left.len() != right.len() {
        return Err(ComparisonError::LengthMismatch {
            context,
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(())
}

pub(crate) fn require_all_finite(
    context: &'static str,
    side: Side,
    values: &[f64],
) -> Result<(), ComparisonError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ComparisonError::NonFinite {
            context,
            side,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}
