//! Artifact presence plus an optional probe command.

use super::result::{format_returncode, format_secs, CheckResult};
use crate::error::{ArtevalError, Result};
use crate::oracle::EvalContext;
use crate::shell::{run_bounded, CommandLine, RunRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for probe commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks that an artifact path exists and/or that a command succeeds,
/// optionally requiring a signature string in its output.
///
/// When both are given the command runs inside the path (or its parent
/// directory when the path is a file).
#[derive(Debug, Clone)]
pub struct CommandCheck {
    path: Option<PathBuf>,
    command: Option<CommandLine>,
    signature: Option<String>,
    timeout: Duration,
    env: BTreeMap<String, String>,
}

impl CommandCheck {
    pub fn new(path: Option<PathBuf>, command: Option<CommandLine>) -> Result<Self> {
        if path.is_none() && command.is_none() {
            return Err(ArtevalError::invalid("must set path and/or command"));
        }
        Ok(Self {
            path,
            command,
            signature: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            env: BTreeMap::new(),
        })
    }

    /// Require this text in stdout or stderr. Blank signatures are ignored.
    pub fn signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ArtevalError::invalid("timeout must be > 0"));
        }
        self.timeout = timeout;
        Ok(self)
    }

    /// Environment overrides for the probe command.
    pub fn env(mut self, env: BTreeMap<String, String>) -> Result<Self> {
        validate_env(&env)?;
        self.env = env;
        Ok(self)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> CheckResult {
        let mut cwd = None;
        if let Some(path) = &self.path {
            if !path.exists() {
                return CheckResult::failure(format!("path missing: {}", path.display()));
            }
            cwd = Some(if path.is_dir() {
                path.clone()
            } else {
                path.parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
            });
        }

        let Some(command) = &self.command else {
            return match cwd {
                Some(dir) => CheckResult::success().with_cwd(dir),
                None => CheckResult::success(),
            };
        };

        let note = cwd
            .as_ref()
            .map(|d| format!(" [cwd = {}]", d.display()))
            .unwrap_or_default();

        let mut request = RunRequest::new(command, self.timeout)
            .env(&self.env)
            .signature(self.signature.as_deref());
        if let Some(dir) = &cwd {
            request = request.cwd(dir);
        }

        let attach_cwd = |result: CheckResult| match &cwd {
            Some(dir) => result.with_cwd(dir),
            None => result,
        };

        let output = match run_bounded(&request, &ctx.runner) {
            Ok(output) => output,
            Err(e) => {
                return attach_cwd(
                    CheckResult::failure(format!(
                        "failed to run command: {}{}: {}",
                        command, note, e
                    ))
                    .with_output("", e.to_string()),
                )
            }
        };

        if output.timed_out {
            return attach_cwd(
                CheckResult::failure(format!(
                    "command timed out after {}: {}{}",
                    format_secs(self.timeout),
                    command,
                    note
                ))
                .with_run(&output),
            );
        }

        if !output.success() {
            return attach_cwd(
                CheckResult::failure(format!(
                    "command failed (rc = {}): {}{}",
                    format_returncode(output.exit_code),
                    command,
                    note
                ))
                .with_run(&output),
            );
        }

        if let Some(sig) = &self.signature {
            if output.signature_found != Some(true) {
                return attach_cwd(
                    CheckResult::failure(format!(
                        "signature not found: '{}': {}{}",
                        sig, command, note
                    ))
                    .with_run(&output),
                );
            }
        }

        attach_cwd(CheckResult::success().with_run(&output))
    }
}

/// Environment override names must be non-empty.
pub(crate) fn validate_env(env: &BTreeMap<String, String>) -> Result<()> {
    if env.keys().any(|k| k.trim().is_empty()) {
        return Err(ArtevalError::invalid("env keys must be non-empty"));
    }
    Ok(())
}
