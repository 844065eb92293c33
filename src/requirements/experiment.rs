//! Experiment-run checks: observed results against reference data.
//!
//! Inputs are loaded when the check is evaluated, so an unreadable results
//! file fails only the requirement that reads it.

use super::result::CheckResult;
use crate::compare::{
    align_by_reference, equal, similarity_scores, summarize_equality_mismatches,
    summarize_labeled_threshold_mismatches, summarize_threshold_mismatches, AlignPolicy,
    ComparisonError, LabeledSeries, NumericSeries, SimilarityMetric, DEFAULT_ABS_EPSILON,
    DEFAULT_MAX_MISMATCHES,
};
use crate::error::{ArtevalError, Result};
use tracing::debug;

fn require_finite(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ArtevalError::invalid(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    Ok(())
}

fn require_positive_epsilon(abs_epsilon: f64) -> Result<()> {
    if abs_epsilon.is_nan() || abs_epsilon <= 0.0 {
        return Err(ArtevalError::invalid("abs_epsilon must be > 0"));
    }
    Ok(())
}

fn require_max_mismatches(max: usize) -> Result<()> {
    if max == 0 {
        return Err(ArtevalError::invalid("max_mismatches must be > 0"));
    }
    Ok(())
}

fn load_pair(
    observed: &NumericSeries,
    reference: &NumericSeries,
) -> std::result::Result<(Vec<f64>, Vec<f64>), ComparisonError> {
    let reference = reference.load()?;
    let observed = observed.load()?;
    Ok((observed, reference))
}

/// A list-level metric must reach `min_similarity`.
#[derive(Debug, Clone)]
pub struct ListSimilarityCheck {
    observed: NumericSeries,
    reference: NumericSeries,
    metric: SimilarityMetric,
    min_similarity: f64,
}

impl ListSimilarityCheck {
    /// Jaccard-over-sets with a minimum of 1.0 unless configured otherwise.
    pub fn new(observed: NumericSeries, reference: NumericSeries) -> Self {
        Self {
            observed,
            reference,
            metric: SimilarityMetric::default(),
            min_similarity: 1.0,
        }
    }

    pub fn metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn min_similarity(mut self, min_similarity: f64) -> Result<Self> {
        require_finite("min_similarity", min_similarity)?;
        self.min_similarity = min_similarity;
        Ok(self)
    }

    pub fn evaluate(&self) -> CheckResult {
        let score = load_pair(&self.observed, &self.reference)
            .and_then(|(obs, reference)| self.metric.compute(&obs, &reference));
        match score {
            Err(e) => CheckResult::failure(e.to_string()),
            Ok(score) => {
                debug!(metric = %self.metric, score, "list similarity");
                if score >= self.min_similarity {
                    CheckResult::success()
                } else {
                    CheckResult::failure(format!(
                        "{} similarity {:.6} < min_similarity {:.6}",
                        self.metric, score, self.min_similarity
                    ))
                }
            }
        }
    }
}

/// Every element must equal its reference.
#[derive(Debug, Clone)]
pub struct ElementwiseEqualityCheck {
    observed: NumericSeries,
    reference: NumericSeries,
    nan_equal: bool,
    max_mismatches: usize,
}

impl ElementwiseEqualityCheck {
    pub fn new(observed: NumericSeries, reference: NumericSeries) -> Self {
        Self {
            observed,
            reference,
            nan_equal: true,
            max_mismatches: DEFAULT_MAX_MISMATCHES,
        }
    }

    /// Whether NaN matches NaN (default true).
    pub fn nan_equal(mut self, nan_equal: bool) -> Self {
        self.nan_equal = nan_equal;
        self
    }

    pub fn max_mismatches(mut self, max: usize) -> Result<Self> {
        require_max_mismatches(max)?;
        self.max_mismatches = max;
        Ok(self)
    }

    pub fn evaluate(&self) -> CheckResult {
        let compared = load_pair(&self.observed, &self.reference)
            .and_then(|(obs, reference)| equal(&obs, &reference, self.nan_equal));
        match compared {
            Err(e) => CheckResult::failure(e.to_string()),
            Ok(comps) if comps.iter().all(|c| c.result) => CheckResult::success(),
            Ok(comps) => CheckResult::failure(format!(
                "elementwise equality check failed\n{}",
                summarize_equality_mismatches(&comps, self.max_mismatches)
            )),
        }
    }
}

/// Every element's relative-error score must reach `threshold`.
#[derive(Debug, Clone)]
pub struct ElementwiseThresholdCheck {
    observed: NumericSeries,
    reference: NumericSeries,
    threshold: f64,
    abs_epsilon: f64,
    max_mismatches: usize,
}

impl ElementwiseThresholdCheck {
    pub fn new(observed: NumericSeries, reference: NumericSeries, threshold: f64) -> Result<Self> {
        require_finite("threshold", threshold)?;
        Ok(Self {
            observed,
            reference,
            threshold,
            abs_epsilon: DEFAULT_ABS_EPSILON,
            max_mismatches: DEFAULT_MAX_MISMATCHES,
        })
    }

    pub fn abs_epsilon(mut self, abs_epsilon: f64) -> Result<Self> {
        require_positive_epsilon(abs_epsilon)?;
        self.abs_epsilon = abs_epsilon;
        Ok(self)
    }

    pub fn max_mismatches(mut self, max: usize) -> Result<Self> {
        require_max_mismatches(max)?;
        self.max_mismatches = max;
        Ok(self)
    }

    pub fn evaluate(&self) -> CheckResult {
        let scores = load_pair(&self.observed, &self.reference)
            .and_then(|(obs, reference)| similarity_scores(&obs, &reference, self.abs_epsilon));
        let scores = match scores {
            Ok(scores) => scores,
            Err(e) => return CheckResult::failure(e.to_string()),
        };
        let summary = summarize_threshold_mismatches(&scores, self.threshold, self.max_mismatches);
        if summary.is_empty() {
            return CheckResult::success();
        }
        CheckResult::failure(format!(
            "elementwise similarity below threshold {:.6}\n{}",
            self.threshold, summary
        ))
    }
}

/// Labeled values aligned to a reference, then threshold-gated per label.
#[derive(Debug, Clone)]
pub struct LabeledThresholdCheck {
    observed: LabeledSeries,
    reference: LabeledSeries,
    threshold: f64,
    policy: AlignPolicy,
    abs_epsilon: f64,
    max_mismatches: usize,
}

impl LabeledThresholdCheck {
    pub fn new(observed: LabeledSeries, reference: LabeledSeries, threshold: f64) -> Result<Self> {
        require_finite("threshold", threshold)?;
        Ok(Self {
            observed,
            reference,
            threshold,
            policy: AlignPolicy::default(),
            abs_epsilon: DEFAULT_ABS_EPSILON,
            max_mismatches: DEFAULT_MAX_MISMATCHES,
        })
    }

    pub fn policy(mut self, policy: AlignPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn abs_epsilon(mut self, abs_epsilon: f64) -> Result<Self> {
        require_positive_epsilon(abs_epsilon)?;
        self.abs_epsilon = abs_epsilon;
        Ok(self)
    }

    pub fn max_mismatches(mut self, max: usize) -> Result<Self> {
        require_max_mismatches(max)?;
        self.max_mismatches = max;
        Ok(self)
    }

    pub fn evaluate(&self) -> CheckResult {
        let scored = self.reference.load().and_then(|reference| {
            let observed = self.observed.load()?;
            let aligned =
                align_by_reference(&observed, &reference, self.policy, self.max_mismatches)?;
            let scores = similarity_scores(&aligned.observed, &aligned.reference, self.abs_epsilon)?;
            Ok((aligned.labels, scores))
        });
        let (labels, scores) = match scored {
            Ok(scored) => scored,
            Err(e) => return CheckResult::failure(e.to_string()),
        };

        let failing = scores
            .iter()
            .filter(|c| c.result.is_nan() || c.result < self.threshold)
            .count();
        if failing == 0 {
            return CheckResult::success();
        }
        CheckResult::failure(format!(
            "{} entries below threshold {:.6}\n{}",
            failing,
            self.threshold,
            summarize_labeled_threshold_mismatches(
                &labels,
                &scores,
                self.threshold,
                self.max_mismatches
            )
        ))
    }
}

/// Always fails. Marks a phase whose checks cannot be automated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailCheck {
    message: String,
}

impl FailCheck {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn evaluate(&self) -> CheckResult {
        CheckResult::failure(self.message.clone())
    }
}
