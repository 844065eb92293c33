//! Turning bundle entries into evaluable requirements.
//!
//! Paths are expanded (`~`, `${VAR}`) and resolved against the bundle's
//! home directory; thresholds fall back to `settings.similarity_ratio`.
//! Construction errors are prefixed with the requirement name.

use crate::compare::{LabeledSeries, NumericSeries};
use crate::config::loader::{expand_path, LoadedBundle};
use crate::config::schema::{CheckConfig, RequirementConfig};
use crate::error::{ArtevalError, Result};
use crate::oracle::Phase;
use crate::requirements::{
    BuildCheck, Check, CommandCheck, ElementwiseEqualityCheck, ElementwiseThresholdCheck,
    EnvVarCheck, FailCheck, LabeledThresholdCheck, ListSimilarityCheck, PathCheck, Requirement,
    VersionCheck,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

impl LoadedBundle {
    /// Expand a configured path and resolve it against the home directory.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        let expanded = expand_path(path)
            .map_err(|message| ArtevalError::invalid(format!("{}: {}", path.display(), message)))?;
        Ok(if expanded.is_relative() {
            self.home_dir.join(expanded)
        } else {
            expanded
        })
    }

    /// Build one phase's requirements, in file order. Names must be unique.
    pub fn requirements(&self, phase: Phase) -> Result<Vec<Requirement>> {
        let entries = self.config.phases.get(phase);
        debug!(phase = phase.label(), count = entries.len(), "building requirements");
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(ArtevalError::invalid(format!(
                    "duplicate requirement name '{}'",
                    entry.name
                )));
            }
        }
        entries.iter().map(|entry| self.requirement(entry)).collect()
    }

    /// Build a single requirement.
    pub fn requirement(&self, entry: &RequirementConfig) -> Result<Requirement> {
        let check = self.check(&entry.check).map_err(|e| match e {
            ArtevalError::InvalidRequirement { message } => {
                ArtevalError::invalid(format!("{}: {}", entry.name, message))
            }
            other => other,
        })?;
        Ok(Requirement::new(entry.name.clone(), check)?.optional(entry.optional))
    }

    fn check(&self, config: &CheckConfig) -> Result<Check> {
        let ratio = self.config.settings.similarity_ratio;
        let check: Check = match config {
            CheckConfig::Version(c) => {
                let mut check = VersionCheck::new(c.command.to_command_line()?, c.required)
                    .compare(c.compare);
                if let Some(pattern) = &c.version_regex {
                    check = check.version_regex(pattern)?;
                }
                if let Some(secs) = c.timeout_secs {
                    check = check.timeout(timeout(secs)?)?;
                }
                check.into()
            }
            CheckConfig::Path(c) => PathCheck::new(self.resolve_path(&c.path)?, c.expect)?.into(),
            CheckConfig::EnvVar(c) => EnvVarCheck::new(&c.var, &c.expected, c.mode)?.into(),
            CheckConfig::Command(c) => {
                let path = c.path.as_deref().map(|p| self.resolve_path(p)).transpose()?;
                let command = c.command.as_ref().map(|s| s.to_command_line()).transpose()?;
                let mut check = CommandCheck::new(path, command)?
                    .signature(c.signature.clone())
                    .env(c.env.clone())?;
                if let Some(secs) = c.timeout_secs {
                    check = check.timeout(timeout(secs)?)?;
                }
                check.into()
            }
            CheckConfig::Build(c) => {
                let cwd = match &c.cwd {
                    Some(dir) => self.resolve_path(dir)?,
                    None => self.home_dir.clone(),
                };
                let mut check =
                    BuildCheck::new(cwd, c.command.to_command_line()?)?.env(c.env.clone())?;
                if let Some(dir) = &c.relative_workdir {
                    check = check.relative_workdir(dir)?;
                }
                if let Some(secs) = c.timeout_secs {
                    check = check.timeout(timeout(secs)?)?;
                }
                check.into()
            }
            CheckConfig::ListSimilarity(c) => {
                let mut observed = c.observed.clone();
                let mut reference = c.reference.clone();
                self.resolve_series_paths(&mut observed)?;
                self.resolve_series_paths(&mut reference)?;
                let mut check = ListSimilarityCheck::new(observed, reference).metric(c.metric);
                if let Some(min) = c.min_similarity {
                    check = check.min_similarity(min)?;
                }
                check.into()
            }
            CheckConfig::ElementwiseEqual(c) => {
                let mut observed = c.observed.clone();
                let mut reference = c.reference.clone();
                self.resolve_series_paths(&mut observed)?;
                self.resolve_series_paths(&mut reference)?;
                let mut check = ElementwiseEqualityCheck::new(observed, reference)
                    .nan_equal(c.nan_equal.unwrap_or(true));
                if let Some(max) = c.max_mismatches {
                    check = check.max_mismatches(max)?;
                }
                check.into()
            }
            CheckConfig::ElementwiseThreshold(c) => {
                let mut observed = c.observed.clone();
                let mut reference = c.reference.clone();
                self.resolve_series_paths(&mut observed)?;
                self.resolve_series_paths(&mut reference)?;
                let mut check = ElementwiseThresholdCheck::new(
                    observed,
                    reference,
                    c.threshold.unwrap_or(ratio),
                )?;
                if let Some(eps) = c.abs_epsilon {
                    check = check.abs_epsilon(eps)?;
                }
                if let Some(max) = c.max_mismatches {
                    check = check.max_mismatches(max)?;
                }
                check.into()
            }
            CheckConfig::LabeledThreshold(c) => {
                let mut observed = c.observed.clone();
                let mut reference = c.reference.clone();
                self.resolve_labeled_paths(&mut observed)?;
                self.resolve_labeled_paths(&mut reference)?;
                let mut check =
                    LabeledThresholdCheck::new(observed, reference, c.threshold.unwrap_or(ratio))?
                        .policy(c.policy);
                if let Some(eps) = c.abs_epsilon {
                    check = check.abs_epsilon(eps)?;
                }
                if let Some(max) = c.max_mismatches {
                    check = check.max_mismatches(max)?;
                }
                check.into()
            }
            CheckConfig::Fail(c) => FailCheck::new(c.message.clone()).into(),
        };
        Ok(check)
    }

    fn resolve_series_paths(&self, series: &mut NumericSeries) -> Result<()> {
        series.map_paths(&|p| self.resolve_path(p))
    }

    fn resolve_labeled_paths(&self, series: &mut LabeledSeries) -> Result<()> {
        series.map_paths(&|p| self.resolve_path(p))
    }
}

/// Seconds from a bundle file as a timeout.
fn timeout(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| ArtevalError::invalid(format!("timeout_secs must be > 0, got {}", secs)))
}
