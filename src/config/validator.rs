//! Bundle validation rules.
//!
//! - The bundle must be named
//! - Settings must be positive and the similarity ratio finite
//! - Requirement names must be non-empty and unique within a phase
//! - Every requirement must construct (valid regexes, timeouts, paths)

use crate::config::loader::LoadedBundle;
use crate::error::{ArtevalError, Result};
use crate::oracle::Phase;
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Phase if the error is phase-specific
    pub phase: Option<Phase>,
}

impl ValidationError {
    fn new(rule: &str, message: String, phase: Option<Phase>) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            phase,
        }
    }
}

/// Validate a bundle and return all errors.
///
/// Collects every problem rather than stopping at the first, so a bundle
/// can be fixed in one pass.
pub fn validate_bundle(bundle: &LoadedBundle) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if bundle.config.name.trim().is_empty() {
        errors.push(ValidationError::new(
            "missing-name",
            "Bundle must have a non-empty 'name'".to_string(),
            None,
        ));
    }

    errors.extend(validate_settings(bundle));
    for phase in Phase::ALL {
        errors.extend(validate_phase(bundle, phase));
    }

    errors
}

fn validate_settings(bundle: &LoadedBundle) -> Vec<ValidationError> {
    let settings = &bundle.config.settings;
    let mut errors = Vec::new();

    if !settings.similarity_ratio.is_finite() {
        errors.push(ValidationError::new(
            "invalid-setting",
            format!(
                "settings.similarity_ratio must be finite, got {}",
                settings.similarity_ratio
            ),
            None,
        ));
    }

    let positive = [
        ("output_cap_bytes", settings.output_cap_bytes as u64),
        ("poll_interval_ms", settings.poll_interval_ms),
        ("drain_timeout_ms", settings.drain_timeout_ms),
        ("reap_timeout_ms", settings.reap_timeout_ms),
    ];
    for (key, value) in positive {
        if value == 0 {
            errors.push(ValidationError::new(
                "invalid-setting",
                format!("settings.{} must be > 0", key),
                None,
            ));
        }
    }

    errors
}

fn validate_phase(bundle: &LoadedBundle, phase: Phase) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, entry) in bundle.config.phases.get(phase).iter().enumerate() {
        if entry.name.trim().is_empty() {
            errors.push(ValidationError::new(
                "missing-requirement-name",
                format!("{}[{}]: requirement must have a non-empty 'name'", phase.key(), index),
                Some(phase),
            ));
            continue;
        }

        if !seen.insert(entry.name.as_str()) {
            errors.push(ValidationError::new(
                "duplicate-requirement",
                format!("{}: duplicate requirement name '{}'", phase.key(), entry.name),
                Some(phase),
            ));
        }

        if let Err(e) = bundle.requirement(entry) {
            let message = match e {
                ArtevalError::InvalidRequirement { message } => message,
                other => other.to_string(),
            };
            errors.push(ValidationError::new(
                "invalid-requirement",
                format!("{}: {}", phase.key(), message),
                Some(phase),
            ));
        }
    }

    errors
}

/// Validate and return an error if invalid.
pub fn validate(bundle: &LoadedBundle) -> Result<()> {
    let errors = validate_bundle(bundle);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(ArtevalError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_bundle;
    use std::path::{Path, PathBuf};

    fn loaded(yaml: &str) -> LoadedBundle {
        LoadedBundle {
            config: parse_bundle(yaml, Path::new("bundle.yml")).unwrap(),
            home_dir: PathBuf::from("/tmp/artifact"),
            source: PathBuf::from("bundle.yml"),
        }
    }

    #[test]
    fn valid_bundle_has_no_errors() {
        let bundle = loaded(
            r#"
name: demo
phases:
  env_setup:
    - {name: sh, kind: path, path: /bin/sh}
"#,
        );
        assert!(validate_bundle(&bundle).is_empty());
        assert!(validate(&bundle).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let bundle = loaded(
            r#"
name: ""
settings:
  poll_interval_ms: 0
phases:
  env_setup:
    - {name: x, kind: fail, message: a}
    - {name: x, kind: fail, message: b}
    - {name: "", kind: fail, message: c}
  artifact_build:
    - {name: build, kind: build, command: [make], timeout_secs: 0}
"#,
        );
        let errors = validate_bundle(&bundle);
        let rules: Vec<&str> = errors.iter().map(|e| e.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec![
                "missing-name",
                "invalid-setting",
                "duplicate-requirement",
                "missing-requirement-name",
                "invalid-requirement",
            ]
        );
        assert_eq!(errors[4].phase, Some(Phase::ArtifactBuild));
        assert!(errors[4].message.contains("build: timeout_secs must be > 0"));
    }

    #[test]
    fn validate_joins_messages() {
        let bundle = loaded("name: ''");
        let err = validate(&bundle).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid bundle: Bundle must have a non-empty 'name'"
        );
    }
}
