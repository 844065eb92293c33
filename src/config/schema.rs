//! Bundle file schema.
//!
//! A bundle is one YAML file naming the artifact, where it lives, runner
//! settings, and the requirements of each phase.

use crate::compare::{AlignPolicy, LabeledSeries, NumericSeries, SimilarityMetric};
use crate::error::Result;
use crate::oracle::Phase;
use crate::requirements::{EnvMatch, PathKind, SemanticVersion, VersionCompare};
use crate::shell::{CommandLine, RunnerSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root of a bundle file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Bundle name, used in logs and scorecards.
    pub name: String,

    /// Artifact checkout. Relative paths in requirements resolve against it.
    /// Defaults to the directory containing the bundle file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_dir: Option<PathBuf>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub phases: PhasesConfig,
}

/// Bundle-wide knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default threshold for elementwise and labeled threshold checks.
    pub similarity_ratio: f64,

    /// Per-stream capture cap for subprocess output.
    pub output_cap_bytes: usize,

    /// Readiness wait in the subprocess read loop.
    pub poll_interval_ms: u64,

    /// Post-kill drain budget.
    pub drain_timeout_ms: u64,

    /// Wait for process exit after streams close or after a kill.
    pub reap_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let runner = RunnerSettings::default();
        Self {
            similarity_ratio: 0.75,
            output_cap_bytes: runner.output_cap_bytes,
            poll_interval_ms: millis(runner.poll_interval),
            drain_timeout_ms: millis(runner.drain_timeout),
            reap_timeout_ms: millis(runner.reap_timeout),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Settings {
    pub fn runner(&self) -> RunnerSettings {
        RunnerSettings {
            output_cap_bytes: self.output_cap_bytes,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            reap_timeout: Duration::from_millis(self.reap_timeout_ms),
        }
    }
}

/// Requirement lists per phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasesConfig {
    pub env_setup: Vec<RequirementConfig>,
    pub artifact_build: Vec<RequirementConfig>,
    pub benchmark_prep: Vec<RequirementConfig>,
    pub experiment_runs: Vec<RequirementConfig>,
}

impl PhasesConfig {
    pub fn get(&self, phase: Phase) -> &[RequirementConfig] {
        match phase {
            Phase::EnvSetup => &self.env_setup,
            Phase::ArtifactBuild => &self.artifact_build,
            Phase::BenchmarkPrep => &self.benchmark_prep,
            Phase::ExperimentRuns => &self.experiment_runs,
        }
    }
}

/// One requirement entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementConfig {
    pub name: String,

    /// Failures of optional requirements are warnings.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    #[serde(flatten)]
    pub check: CheckConfig,
}

/// Check definition, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckConfig {
    Version(VersionConfig),
    Path(PathConfig),
    EnvVar(EnvVarConfig),
    Command(CommandConfig),
    Build(BuildConfig),
    ListSimilarity(ListSimilarityConfig),
    ElementwiseEqual(ElementwiseEqualConfig),
    ElementwiseThreshold(ElementwiseThresholdConfig),
    LabeledThreshold(LabeledThresholdConfig),
    Fail(FailConfig),
}

/// A command as written in a bundle: an argv list, or `{shell: "..."}`
/// for the few commands that need pipes or globs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Argv(Vec<String>),
    Shell { shell: String },
}

impl CommandSpec {
    pub fn to_command_line(&self) -> Result<CommandLine> {
        match self {
            CommandSpec::Argv(args) => CommandLine::argv(args.iter().cloned()),
            CommandSpec::Shell { shell } => CommandLine::shell(shell.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    pub command: CommandSpec,
    /// Quote it (`"1.20"`) or give a list (`[1, 20]`); YAML reads `1.20` as
    /// a float.
    pub required: SemanticVersion,
    #[serde(default)]
    pub compare: VersionCompare,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub expect: PathKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvVarConfig {
    pub var: String,
    #[serde(default)]
    pub expected: String,
    #[serde(default, rename = "match")]
    pub mode: EnvMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub command: CommandSpec,
    /// Defaults to the bundle's home directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_workdir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSimilarityConfig {
    pub observed: NumericSeries,
    pub reference: NumericSeries,
    #[serde(default)]
    pub metric: SimilarityMetric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementwiseEqualConfig {
    pub observed: NumericSeries,
    pub reference: NumericSeries,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nan_equal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mismatches: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementwiseThresholdConfig {
    pub observed: NumericSeries,
    pub reference: NumericSeries,
    /// Defaults to `settings.similarity_ratio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mismatches: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledThresholdConfig {
    pub observed: LabeledSeries,
    pub reference: LabeledSeries,
    /// Defaults to `settings.similarity_ratio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub policy: AlignPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mismatches: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailConfig {
    pub message: String,
}
