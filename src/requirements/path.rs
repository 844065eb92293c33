//! Filesystem existence and type checks.

use super::result::CheckResult;
use crate::error::{ArtevalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Required type of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    #[default]
    Any,
    File,
    Directory,
}

/// Asserts that a path exists and, optionally, what it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCheck {
    path: PathBuf,
    kind: PathKind,
}

impl PathCheck {
    pub fn new(path: impl Into<PathBuf>, kind: PathKind) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(ArtevalError::invalid("path must be non-empty"));
        }
        Ok(Self { path, kind })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn evaluate(&self) -> CheckResult {
        let p = self.path.display();
        if !self.path.exists() {
            return CheckResult::failure(match self.kind {
                PathKind::File => format!("file missing: {}", p),
                PathKind::Directory => format!("directory missing: {}", p),
                PathKind::Any => format!("path missing: {}", p),
            });
        }
        match self.kind {
            PathKind::Any => CheckResult::success(),
            PathKind::File if self.path.is_file() => CheckResult::success(),
            PathKind::File => CheckResult::failure(format!("expected file: {}", p)),
            PathKind::Directory if self.path.is_dir() => CheckResult::success(),
            PathKind::Directory => CheckResult::failure(format!("expected directory: {}", p)),
        }
    }
}
