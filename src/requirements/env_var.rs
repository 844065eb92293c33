//! Environment variable checks.

use super::result::CheckResult;
use crate::error::{ArtevalError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::path::{Component, Path, PathBuf};

/// How the variable's value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvMatch {
    /// The whole value equals `expected`.
    #[default]
    Exact,
    /// One entry of the path-list value equals `expected` after normalization.
    Contains,
    /// One entry of the path-list value matches the regex `expected`.
    Regex,
}

/// Validates an environment variable.
#[derive(Debug, Clone)]
pub struct EnvVarCheck {
    var: String,
    expected: String,
    mode: EnvMatch,
    pattern: Option<Regex>,
}

impl EnvVarCheck {
    pub fn new(var: impl Into<String>, expected: impl Into<String>, mode: EnvMatch) -> Result<Self> {
        let var = var.into();
        let expected = expected.into();
        if var.is_empty() {
            return Err(ArtevalError::invalid("env_var must be non-empty"));
        }
        if mode != EnvMatch::Exact && expected.is_empty() {
            return Err(ArtevalError::invalid("expected must be non-empty"));
        }
        let pattern = match mode {
            EnvMatch::Regex => Some(
                Regex::new(&expected)
                    .map_err(|e| ArtevalError::invalid(format!("invalid regex: {}", e)))?,
            ),
            _ => None,
        };
        Ok(Self {
            var,
            expected,
            mode,
            pattern,
        })
    }

    /// Check against the process environment.
    pub fn evaluate(&self) -> CheckResult {
        self.evaluate_with(|key: &str| std::env::var(key))
    }

    /// Check with a custom env var lookup function.
    pub fn evaluate_with<F>(&self, env_fn: F) -> CheckResult
    where
        F: Fn(&str) -> std::result::Result<String, VarError>,
    {
        let actual = match env_fn(&self.var) {
            Ok(value) => value,
            Err(VarError::NotPresent) => return CheckResult::failure("not set"),
            Err(VarError::NotUnicode(raw)) => raw.to_string_lossy().into_owned(),
        };

        match self.mode {
            EnvMatch::Exact => {
                if actual == self.expected {
                    CheckResult::success()
                } else {
                    CheckResult::failure(format!(
                        "expected '{}', got '{}'",
                        self.expected, actual
                    ))
                }
            }
            EnvMatch::Contains => {
                let want = normalize_path_entry(&self.expected);
                if split_path_list(&actual).any(|e| normalize_path_entry(e) == want) {
                    CheckResult::success()
                } else {
                    CheckResult::failure(format!("missing entry '{}'", self.expected))
                }
            }
            EnvMatch::Regex => {
                let matched = self
                    .pattern
                    .as_ref()
                    .is_some_and(|re| split_path_list(&actual).any(|e| re.is_match(e)));
                if matched {
                    CheckResult::success()
                } else {
                    CheckResult::failure(format!("no entry matches regex '{}'", self.expected))
                }
            }
        }
    }
}

/// Non-empty, trimmed entries of a platform path list.
fn split_path_list(value: &str) -> impl Iterator<Item = &str> {
    let sep = if cfg!(windows) { ';' } else { ':' };
    value.split(sep).map(str::trim).filter(|e| !e.is_empty())
}

/// Lexically normalize a path entry: drop `.` and redundant separators,
/// fold `..` into its parent, and ignore case on Windows.
pub fn normalize_path_entry(entry: &str) -> String {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for comp in Path::new(entry.trim()).components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(comp),
            },
            other => parts.push(other),
        }
    }
    let normalized: PathBuf = parts.iter().collect();
    let text = if normalized.as_os_str().is_empty() {
        ".".to_string()
    } else {
        normalized.to_string_lossy().into_owned()
    };
    if cfg!(windows) {
        text.to_lowercase()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(value: Option<&'static str>) -> impl Fn(&str) -> std::result::Result<String, VarError> {
        move |_| value.map(str::to_string).ok_or(VarError::NotPresent)
    }

    #[test]
    fn unset_variable_fails() {
        let check = EnvVarCheck::new("JAVA_HOME", "/opt/jdk", EnvMatch::Exact).unwrap();
        assert_eq!(check.evaluate_with(env_with(None)).message, "not set");
    }

    #[test]
    fn exact_match() {
        let check = EnvVarCheck::new("JAVA_HOME", "/opt/jdk", EnvMatch::Exact).unwrap();
        assert!(check.evaluate_with(env_with(Some("/opt/jdk"))).ok);
        assert_eq!(
            check.evaluate_with(env_with(Some("/usr/lib/jvm"))).message,
            "expected '/opt/jdk', got '/usr/lib/jvm'"
        );
    }

    #[test]
    fn contains_normalizes_entries() {
        let check = EnvVarCheck::new("PATH", "/opt/go/bin/", EnvMatch::Contains).unwrap();
        assert!(check
            .evaluate_with(env_with(Some("/usr/bin: /opt/go/./bin :/bin")))
            .ok);
        assert_eq!(
            check.evaluate_with(env_with(Some("/usr/bin:/bin"))).message,
            "missing entry '/opt/go/bin/'"
        );
    }

    #[test]
    fn regex_searches_entries() {
        let check = EnvVarCheck::new("PATH", r"go-1\.2\d/bin$", EnvMatch::Regex).unwrap();
        assert!(check.evaluate_with(env_with(Some("/bin:/opt/go-1.22/bin"))).ok);
        assert_eq!(
            check.evaluate_with(env_with(Some("/bin"))).message,
            r"no entry matches regex 'go-1\.2\d/bin$'"
        );
    }

    #[test]
    fn construction_is_validated() {
        assert!(EnvVarCheck::new("", "x", EnvMatch::Exact).is_err());
        assert!(EnvVarCheck::new("PATH", "", EnvMatch::Contains).is_err());
        assert!(EnvVarCheck::new("PATH", "(", EnvMatch::Regex).is_err());
        assert!(EnvVarCheck::new("EMPTY_OK", "", EnvMatch::Exact).is_ok());
    }

    #[test]
    fn normalization_folds_parent_dirs() {
        assert_eq!(normalize_path_entry("/a/b/../c/"), "/a/c");
        assert_eq!(normalize_path_entry("./x"), "x");
        assert_eq!(normalize_path_entry("."), ".");
        assert_eq!(normalize_path_entry("/.."), "/");
        assert_eq!(normalize_path_entry("../x"), "../x");
    }
}
