//! Version checks: run a command, extract a semantic version, compare it.

use super::result::{format_returncode, format_secs, CheckResult};
use crate::error::{ArtevalError, Result};
use crate::oracle::EvalContext;
use crate::shell::{resolve_program, run_bounded, CommandLine, RunRequest};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

/// Default timeout for version commands.
pub const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// First `X.Y` or `X.Y.Z` token that starts the text or follows whitespace.
static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)v?(\d+)\.(\d+)(?:\.(\d+))?").expect("VERSION_TOKEN must compile")
});

/// A `(major, minor, patch)` triple, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = ArtevalError;

    /// Parses `1.22`, `1.22.3` or `v1.22.3`. A missing patch is 0.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parts: Vec<&str> = body.split('.').collect();
        let parse = |p: &str| p.parse::<u64>().ok();
        let version = match parts.as_slice() {
            [major, minor] => parse(major)
                .zip(parse(minor))
                .map(|(a, b)| SemanticVersion::new(a, b, 0)),
            [major, minor, patch] => match (parse(major), parse(minor), parse(patch)) {
                (Some(a), Some(b), Some(c)) => Some(SemanticVersion::new(a, b, c)),
                _ => None,
            },
            _ => None,
        };
        version.ok_or_else(|| ArtevalError::invalid(format!("invalid version: {:?}", s)))
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // YAML reads `1.22` as a float (and `1.20` as 1.2), so quoted
        // strings or `[1, 20, 0]` lists are the unambiguous forms.
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        let text = match raw {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .map(|v| match v {
                    serde_yaml::Value::Number(n) => n.to_string(),
                    other => format!("{:?}", other),
                })
                .collect::<Vec<_>>()
                .join("."),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected a version string, found {:?}",
                    other
                )))
            }
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Extract the first version token from `text`.
pub fn parse_semantic_version(text: &str) -> Option<SemanticVersion> {
    let caps = VERSION_TOKEN.captures(text)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(SemanticVersion::new(num(1)?, num(2)?, num(3).unwrap_or(0)))
}

/// How the found version must relate to the required one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionCompare {
    Eq,
    #[default]
    Geq,
    Leq,
}

impl VersionCompare {
    pub fn symbol(&self) -> &'static str {
        match self {
            VersionCompare::Eq => "==",
            VersionCompare::Geq => ">=",
            VersionCompare::Leq => "<=",
        }
    }

    pub fn holds(&self, found: SemanticVersion, required: SemanticVersion) -> bool {
        match self {
            VersionCompare::Eq => found == required,
            VersionCompare::Geq => found >= required,
            VersionCompare::Leq => found <= required,
        }
    }
}

/// Checks that an executable exists and reports a satisfying version.
#[derive(Debug, Clone)]
pub struct VersionCheck {
    command: CommandLine,
    required: SemanticVersion,
    compare: VersionCompare,
    pattern: Option<Regex>,
    timeout: Duration,
}

impl VersionCheck {
    pub fn new(command: CommandLine, required: SemanticVersion) -> Self {
        Self {
            command,
            required,
            compare: VersionCompare::default(),
            pattern: None,
            timeout: DEFAULT_VERSION_TIMEOUT,
        }
    }

    pub fn compare(mut self, compare: VersionCompare) -> Self {
        self.compare = compare;
        self
    }

    /// Extract the version from the first capture group of `pattern`
    /// (case-insensitive) instead of scanning for the first version token.
    pub fn version_regex(mut self, pattern: &str) -> Result<Self> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ArtevalError::invalid(format!("invalid version_regex: {}", e)))?;
        if re.captures_len() < 2 {
            return Err(ArtevalError::invalid(
                "version_regex must contain a capturing group",
            ));
        }
        self.pattern = Some(re);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ArtevalError::invalid("timeout must be > 0"));
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Pick the version text out of the command's combined output.
    fn extract(&self, combined: &str) -> std::result::Result<SemanticVersion, &'static str> {
        let candidate = match &self.pattern {
            Some(re) => re
                .captures(combined)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .ok_or("version_regex did not match output")?,
            None => combined,
        };
        parse_semantic_version(candidate).ok_or("could not parse version from output")
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> CheckResult {
        let program = self.command.program();
        let Some(resolved) = resolve_program(&program) else {
            return CheckResult::failure(format!("not found on PATH: '{}'", program));
        };

        let command = match &self.command {
            CommandLine::Argv(args) => {
                let mut argv = args.clone();
                argv[0] = resolved.to_string_lossy().into_owned();
                CommandLine::Argv(argv)
            }
            shell => shell.clone(),
        };

        let output = match run_bounded(&RunRequest::new(&command, self.timeout), &ctx.runner) {
            Ok(output) => output,
            Err(e) => {
                return CheckResult::failure(format!("failed to run '{}': {}", program, e))
                    .with_output("", e.to_string())
            }
        };

        if output.timed_out {
            return CheckResult::failure(format!(
                "version command timed out after {}",
                format_secs(self.timeout)
            ))
            .with_run(&output);
        }

        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let combined = combined.trim();

        if !output.success() {
            let detail = if combined.is_empty() {
                format!("rc = {}", format_returncode(output.exit_code))
            } else {
                combined.to_string()
            };
            return CheckResult::failure(format!("version command failed: {}", detail))
                .with_run(&output);
        }

        let found = match self.extract(combined) {
            Ok(found) => found,
            Err(message) => return CheckResult::failure(message).with_run(&output),
        };

        if !self.compare.holds(found, self.required) {
            return CheckResult::failure(format!(
                "version {} does not satisfy {} {}",
                found,
                self.compare.symbol(),
                self.required
            ))
            .with_run(&output);
        }
        CheckResult::success().with_run(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn go_check(required: SemanticVersion) -> VersionCheck {
        VersionCheck::new(CommandLine::argv(["go", "version"]).unwrap(), required)
            .version_regex(r"go(\d+\.\d+(?:\.\d+)?)")
            .unwrap()
    }

    #[test]
    fn parses_first_version_token() {
        assert_eq!(
            parse_semantic_version("Python 3.11.4"),
            Some(SemanticVersion::new(3, 11, 4))
        );
        assert_eq!(
            parse_semantic_version("v18.2 (lts)"),
            Some(SemanticVersion::new(18, 2, 0))
        );
        assert_eq!(parse_semantic_version("go1.22.3 linux/amd64"), None);
    }

    #[test]
    fn versions_order_lexicographically() {
        assert!(SemanticVersion::new(1, 10, 0) > SemanticVersion::new(1, 9, 9));
        assert!(SemanticVersion::new(2, 0, 0) > SemanticVersion::new(1, 99, 99));
    }

    #[test]
    fn from_str_accepts_short_and_prefixed_forms() {
        assert_eq!("1.22".parse::<SemanticVersion>().unwrap(), SemanticVersion::new(1, 22, 0));
        assert_eq!("v3.1.2".parse::<SemanticVersion>().unwrap(), SemanticVersion::new(3, 1, 2));
        assert!("1".parse::<SemanticVersion>().is_err());
        assert!("1.x.2".parse::<SemanticVersion>().is_err());
    }

    #[test]
    fn deserializes_from_yaml_number_or_string() {
        let v: SemanticVersion = serde_yaml::from_str("1.22").unwrap();
        assert_eq!(v, SemanticVersion::new(1, 22, 0));
        let v: SemanticVersion = serde_yaml::from_str("\"1.22.3\"").unwrap();
        assert_eq!(v, SemanticVersion::new(1, 22, 3));
        let v: SemanticVersion = serde_yaml::from_str("[1, 20, 0]").unwrap();
        assert_eq!(v, SemanticVersion::new(1, 20, 0));
    }

    #[test]
    fn regex_extraction_compares_go_version() {
        let output = "go1.22.3 linux/amd64";
        let ok = go_check(SemanticVersion::new(1, 22, 0));
        let found = ok.extract(output).unwrap();
        assert!(VersionCompare::Geq.holds(found, SemanticVersion::new(1, 22, 0)));
        assert!(!VersionCompare::Geq.holds(found, SemanticVersion::new(1, 23, 0)));
    }

    #[test]
    fn regex_is_case_insensitive() {
        let check = go_check(SemanticVersion::new(1, 0, 0));
        assert_eq!(check.extract("GO1.21").unwrap(), SemanticVersion::new(1, 21, 0));
    }

    #[test]
    fn regex_needs_a_capture_group() {
        let cmd = CommandLine::argv(["go", "version"]).unwrap();
        let err = VersionCheck::new(cmd, SemanticVersion::new(1, 0, 0))
            .version_regex(r"go\d+")
            .unwrap_err();
        assert!(err.to_string().contains("capturing group"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let cmd = CommandLine::argv(["go"]).unwrap();
        assert!(VersionCheck::new(cmd, SemanticVersion::new(1, 0, 0))
            .version_regex("(")
            .is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cmd = CommandLine::argv(["go"]).unwrap();
        assert!(VersionCheck::new(cmd, SemanticVersion::new(1, 0, 0))
            .timeout(Duration::ZERO)
            .is_err());
    }

    #[test]
    fn extraction_failures_have_distinct_messages() {
        let check = go_check(SemanticVersion::new(1, 0, 0));
        assert_eq!(check.extract("nothing here"), Err("version_regex did not match output"));
        let plain = VersionCheck::new(CommandLine::argv(["x"]).unwrap(), SemanticVersion::new(1, 0, 0));
        assert_eq!(plain.extract("no digits"), Err("could not parse version from output"));
    }

    #[test]
    fn missing_executable_fails_without_running() {
        let cmd = CommandLine::argv(["arteval-definitely-not-installed", "--version"]).unwrap();
        let result = VersionCheck::new(cmd, SemanticVersion::new(1, 0, 0))
            .evaluate(&EvalContext::default());
        assert!(!result.ok);
        assert_eq!(
            result.message,
            "not found on PATH: 'arteval-definitely-not-installed'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn evaluates_version_from_command_output() {
        let cmd = CommandLine::argv(["sh", "-c", "echo 'tool version 2.5.1'"]).unwrap();
        let ctx = EvalContext::default();
        let pass = VersionCheck::new(cmd.clone(), SemanticVersion::new(2, 5, 0)).evaluate(&ctx);
        assert!(pass.ok, "{}", pass.message);
        assert_eq!(pass.returncode, Some(0));

        let fail = VersionCheck::new(cmd, SemanticVersion::new(2, 5, 0))
            .compare(VersionCompare::Eq)
            .evaluate(&ctx);
        assert_eq!(fail.message, "version 2.5.1 does not satisfy == 2.5.0");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_output() {
        let cmd = CommandLine::argv(["sh", "-c", "echo broken >&2; exit 1"]).unwrap();
        let result = VersionCheck::new(cmd, SemanticVersion::new(1, 0, 0))
            .evaluate(&EvalContext::default());
        assert_eq!(result.message, "version command failed: broken");
        assert_eq!(result.returncode, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let cmd = CommandLine::argv(["sleep", "5"]).unwrap();
        let result = VersionCheck::new(cmd, SemanticVersion::new(1, 0, 0))
            .timeout(Duration::from_millis(200))
            .unwrap()
            .evaluate(&EvalContext::default());
        assert!(result.timed_out);
        assert_eq!(result.message, "version command timed out after 0.2s");
    }
}
