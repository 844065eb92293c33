//! Declarative requirement checks.
//!
//! A [`Requirement`] pairs a name and an optional flag with one [`Check`]
//! variant. Every variant is evaluated through [`Requirement::evaluate`] and
//! yields a [`CheckResult`]; environment, execution and data problems are
//! reported as failed results, never as errors.
//!
//! # Modules
//!
//! - [`version`] - Executable version checks
//! - [`path`] - File and directory existence
//! - [`env_var`] - Environment variable values and path lists
//! - [`command`] - Artifact presence plus a probe command
//! - [`build`] - Build commands inside a checkout
//! - [`experiment`] - Observed results against reference data
//! - [`result`] - The uniform check outcome

pub mod build;
pub mod command;
pub mod env_var;
pub mod experiment;
pub mod path;
pub mod result;
pub mod version;

pub use build::{BuildCheck, DEFAULT_BUILD_TIMEOUT};
pub use command::{CommandCheck, DEFAULT_COMMAND_TIMEOUT};
pub use env_var::{normalize_path_entry, EnvMatch, EnvVarCheck};
pub use experiment::{
    ElementwiseEqualityCheck, ElementwiseThresholdCheck, FailCheck, LabeledThresholdCheck,
    ListSimilarityCheck,
};
pub use path::{PathCheck, PathKind};
pub use result::{truncate_text, CheckResult, MAX_MESSAGE_CHARS};
pub use version::{
    parse_semantic_version, SemanticVersion, VersionCheck, VersionCompare,
    DEFAULT_VERSION_TIMEOUT,
};

use crate::error::{ArtevalError, Result};
use crate::oracle::EvalContext;

/// What a requirement verifies.
#[derive(Debug, Clone)]
pub enum Check {
    /// An executable reports a satisfying version.
    Version(VersionCheck),
    /// A path exists with the right type.
    Path(PathCheck),
    /// An environment variable holds the expected value.
    EnvVar(EnvVarCheck),
    /// An artifact exists and a probe command succeeds.
    Command(CommandCheck),
    /// A build command exits zero.
    Build(BuildCheck),
    /// A list-level similarity metric reaches a minimum.
    ListSimilarity(ListSimilarityCheck),
    /// Every element equals its reference.
    ElementwiseEquality(ElementwiseEqualityCheck),
    /// Every element scores at least a threshold.
    ElementwiseThreshold(ElementwiseThresholdCheck),
    /// Labeled values score at least a threshold after alignment.
    LabeledThreshold(LabeledThresholdCheck),
    /// Always fails.
    Fail(FailCheck),
}

impl Check {
    /// Stable kind name, as used in bundle files.
    pub fn kind(&self) -> &'static str {
        match self {
            Check::Version(_) => "version",
            Check::Path(_) => "path",
            Check::EnvVar(_) => "env_var",
            Check::Command(_) => "command",
            Check::Build(_) => "build",
            Check::ListSimilarity(_) => "list_similarity",
            Check::ElementwiseEquality(_) => "elementwise_equal",
            Check::ElementwiseThreshold(_) => "elementwise_threshold",
            Check::LabeledThreshold(_) => "labeled_threshold",
            Check::Fail(_) => "fail",
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> CheckResult {
        match self {
            Check::Version(c) => c.evaluate(ctx),
            Check::Path(c) => c.evaluate(),
            Check::EnvVar(c) => c.evaluate(),
            Check::Command(c) => c.evaluate(ctx),
            Check::Build(c) => c.evaluate(ctx),
            Check::ListSimilarity(c) => c.evaluate(),
            Check::ElementwiseEquality(c) => c.evaluate(),
            Check::ElementwiseThreshold(c) => c.evaluate(),
            Check::LabeledThreshold(c) => c.evaluate(),
            Check::Fail(c) => c.evaluate(),
        }
    }
}

macro_rules! impl_from_check {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Check {
            fn from(check: $ty) -> Self {
                Check::$variant(check)
            }
        })*
    };
}

impl_from_check! {
    Version => VersionCheck,
    Path => PathCheck,
    EnvVar => EnvVarCheck,
    Command => CommandCheck,
    Build => BuildCheck,
    ListSimilarity => ListSimilarityCheck,
    ElementwiseEquality => ElementwiseEqualityCheck,
    ElementwiseThreshold => ElementwiseThresholdCheck,
    LabeledThreshold => LabeledThresholdCheck,
    Fail => FailCheck,
}

/// A named check. Failures of optional requirements are warnings.
#[derive(Debug, Clone)]
pub struct Requirement {
    name: String,
    optional: bool,
    check: Check,
}

impl Requirement {
    pub fn new(name: impl Into<String>, check: impl Into<Check>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ArtevalError::invalid("requirement name must be non-empty"));
        }
        Ok(Self {
            name,
            optional: false,
            check: check.into(),
        })
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> CheckResult {
        self.check.evaluate(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_must_be_non_empty() {
        let err = Requirement::new(" ", FailCheck::new("x")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid requirement: requirement name must be non-empty");
    }

    #[test]
    fn required_by_default() {
        let req = Requirement::new("jdk", FailCheck::new("x")).unwrap();
        assert!(!req.is_optional());
        assert!(req.optional(true).is_optional());
    }

    #[test]
    fn evaluate_dispatches_to_variant() {
        let req = Requirement::new("manual", FailCheck::new("needs a human")).unwrap();
        assert_eq!(req.check().kind(), "fail");
        let result = req.evaluate(&EvalContext::default());
        assert!(!result.ok);
        assert_eq!(result.message, "needs a human");
    }

    #[test]
    fn path_variant_evaluates() {
        let temp = tempfile::TempDir::new().unwrap();
        let req = Requirement::new("checkout", PathCheck::new(temp.path(), PathKind::Directory).unwrap())
            .unwrap();
        assert!(req.evaluate(&EvalContext::default()).ok);
    }
}
