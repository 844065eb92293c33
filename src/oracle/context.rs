//! Per-run evaluation context and phase labels.

use crate::shell::RunnerSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Explicit state shared by every requirement in one run.
///
/// Created once per bundle run and discarded after reporting. The bundle
/// name is attached to the `oracle` tracing span so log lines carry it.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Bundle being evaluated.
    pub bundle: String,
    /// Dump captured diagnostics for failing requirements.
    pub verbose: bool,
    /// Subprocess runner tuning.
    pub runner: RunnerSettings,
}

impl EvalContext {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            verbose: false,
            runner: RunnerSettings::default(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn runner(mut self, runner: RunnerSettings) -> Self {
        self.runner = runner;
        self
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Evaluation phases, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    EnvSetup,
    ArtifactBuild,
    BenchmarkPrep,
    ExperimentRuns,
}

impl Phase {
    /// Every phase, in the order they run.
    pub const ALL: [Phase; 4] = [
        Phase::EnvSetup,
        Phase::ArtifactBuild,
        Phase::BenchmarkPrep,
        Phase::ExperimentRuns,
    ];

    /// Label used in logs and scorecards.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::EnvSetup => "EnvironmentSetup",
            Phase::ArtifactBuild => "ArtifactBuild",
            Phase::BenchmarkPrep => "BenchmarkPrep",
            Phase::ExperimentRuns => "ExperimentRuns",
        }
    }

    /// Key used in bundle files.
    pub fn key(&self) -> &'static str {
        match self {
            Phase::EnvSetup => "env_setup",
            Phase::ArtifactBuild => "artifact_build",
            Phase::BenchmarkPrep => "benchmark_prep",
            Phase::ExperimentRuns => "experiment_runs",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Phase {
    type Err = String;

    /// Accepts either the bundle key (`env_setup`) or the label
    /// (`EnvironmentSetup`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Phase::ALL
            .into_iter()
            .find(|p| p.key() == wanted || p.label().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                let keys: Vec<&str> = Phase::ALL.iter().map(|p| p.key()).collect();
                format!("unknown phase '{}' (expected one of: {})", s, keys.join(", "))
            })
    }
}
