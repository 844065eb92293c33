//! Bundle file loading and path expansion.

use crate::config::schema::BundleConfig;
use crate::error::{ArtevalError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `${NAME}` references in paths.
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("ENV_REF must compile")
});

/// A parsed bundle together with its resolved home directory.
#[derive(Debug, Clone)]
pub struct LoadedBundle {
    pub config: BundleConfig,
    /// Absolute-or-expanded home directory; relative paths resolve here.
    pub home_dir: PathBuf,
    /// File the bundle was read from.
    pub source: PathBuf,
}

/// Load a bundle file and resolve its home directory.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid or `home_dir`
/// references an unset variable.
pub fn load_bundle(path: &Path) -> Result<LoadedBundle> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArtevalError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ArtevalError::Io(e)
        }
    })?;

    let config = parse_bundle(&content, path)?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let home_dir = match &config.home_dir {
        Some(dir) => {
            let expanded = expand_path(dir).map_err(|message| ArtevalError::ConfigParseError {
                path: path.to_path_buf(),
                message: format!("home_dir: {}", message),
            })?;
            if expanded.is_relative() {
                base.join(expanded)
            } else {
                expanded
            }
        }
        None => base,
    };

    Ok(LoadedBundle {
        config,
        home_dir,
        source: path.to_path_buf(),
    })
}

/// Parse YAML content into a [`BundleConfig`].
///
/// `source_path` is only used for error reporting.
pub fn parse_bundle(content: &str, source_path: &Path) -> Result<BundleConfig> {
    serde_yaml::from_str(content).map_err(|e| ArtevalError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Expand `${VAR}` references and a leading `~` in a path.
pub fn expand_path(path: &Path) -> std::result::Result<PathBuf, String> {
    expand_path_with(path, |name| std::env::var(name).ok(), home_dir)
}

/// [`expand_path`] with custom variable and home lookups.
pub fn expand_path_with<V, H>(path: &Path, var: V, home: H) -> std::result::Result<PathBuf, String>
where
    V: Fn(&str) -> Option<String>,
    H: Fn() -> Option<PathBuf>,
{
    let text = path.to_string_lossy();

    let mut missing = None;
    let substituted = ENV_REF.replace_all(&text, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        var(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_string());
            String::new()
        })
    });
    if let Some(name) = missing {
        return Err(format!("environment variable not set: {}", name));
    }

    let expanded = if substituted == "~" {
        home().ok_or("cannot expand '~': home directory unknown")?
    } else if let Some(rest) = substituted
        .strip_prefix("~/")
        .or_else(|| substituted.strip_prefix("~\\"))
    {
        home()
            .ok_or("cannot expand '~': home directory unknown")?
            .join(rest)
    } else {
        PathBuf::from(substituted.as_ref())
    };
    Ok(expanded)
}
