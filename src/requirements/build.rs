//! Build commands run inside an artifact checkout.

use super::command::validate_env;
use super::result::{format_returncode, format_secs, truncate_text, CheckResult, MAX_MESSAGE_CHARS};
use crate::error::{ArtevalError, Result};
use crate::oracle::EvalContext;
use crate::shell::{run_bounded, CommandLine, RunRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for build commands.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs a build command in `cwd` (or a relative subdirectory of it) and
/// requires a zero exit code.
#[derive(Debug, Clone)]
pub struct BuildCheck {
    cwd: PathBuf,
    command: CommandLine,
    relative_workdir: Option<PathBuf>,
    timeout: Duration,
    env: BTreeMap<String, String>,
}

impl BuildCheck {
    pub fn new(cwd: impl Into<PathBuf>, command: CommandLine) -> Result<Self> {
        let cwd = cwd.into();
        if cwd.as_os_str().is_empty() {
            return Err(ArtevalError::invalid("cwd must be non-empty"));
        }
        Ok(Self {
            cwd,
            command,
            relative_workdir: None,
            timeout: DEFAULT_BUILD_TIMEOUT,
            env: BTreeMap::new(),
        })
    }

    /// Run inside this subdirectory of `cwd`. Must be relative and must not
    /// escape `cwd` once symlinks are resolved.
    pub fn relative_workdir(mut self, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.is_absolute() {
            return Err(ArtevalError::invalid(format!(
                "relative_workdir must be a relative path: {}",
                dir.display()
            )));
        }
        self.relative_workdir = Some(dir);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ArtevalError::invalid("timeout must be > 0"));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn env(mut self, env: BTreeMap<String, String>) -> Result<Self> {
        validate_env(&env)?;
        self.env = env;
        Ok(self)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The directory the command runs in, after existence and containment
    /// checks.
    fn workdir(&self) -> std::result::Result<PathBuf, String> {
        let workdir = match &self.relative_workdir {
            Some(rel) => self.cwd.join(rel),
            None => self.cwd.clone(),
        };
        if !workdir.exists() {
            return Err(format!("working directory missing: {}", workdir.display()));
        }
        if !workdir.is_dir() {
            return Err(format!(
                "working directory is not a directory: {}",
                workdir.display()
            ));
        }
        if self.relative_workdir.is_some() {
            let base = self.cwd.canonicalize().map_err(|e| e.to_string())?;
            let resolved = workdir.canonicalize().map_err(|e| e.to_string())?;
            if !resolved.starts_with(&base) {
                return Err(format!(
                    "working directory escapes base cwd: base={} workdir={}",
                    base.display(),
                    resolved.display()
                ));
            }
        }
        Ok(workdir)
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> CheckResult {
        let workdir = match self.workdir() {
            Ok(dir) => dir,
            Err(message) => return CheckResult::failure(message),
        };

        let request = RunRequest::new(&self.command, self.timeout)
            .cwd(&workdir)
            .env(&self.env);
        let output = match run_bounded(&request, &ctx.runner) {
            Ok(output) => output,
            Err(e) => {
                return CheckResult::failure(format!("failed to run command: {}", e))
                    .with_output("", e.to_string())
                    .with_cwd(&workdir)
            }
        };

        if output.timed_out {
            return CheckResult::failure(format!(
                "command timed out after {}",
                format_secs(self.timeout)
            ))
            .with_run(&output)
            .with_cwd(&workdir);
        }

        if !output.success() {
            let mut message = format!(
                "command failed (rc = {})",
                format_returncode(output.exit_code)
            );
            let summary = output_summary(&output.stdout, &output.stderr);
            if !summary.is_empty() {
                message.push_str(": ");
                message.push_str(&truncate_text(&summary, MAX_MESSAGE_CHARS));
            }
            return CheckResult::failure(message)
                .with_run(&output)
                .with_cwd(&workdir);
        }

        CheckResult::success().with_run(&output).with_cwd(&workdir)
    }
}

/// Trimmed stdout and stderr, labeled when both are present.
fn output_summary(stdout: &str, stderr: &str) -> String {
    match (stdout.trim(), stderr.trim()) {
        ("", "") => String::new(),
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("stdout:\n{}\n\nstderr:\n{}", out, err),
    }
}
