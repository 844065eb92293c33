//! Program lookup on PATH.
//!
//! Lookup walks PATH entries directly instead of shelling out to `which`,
//! whose behavior varies across systems and is sometimes a shell builtin.

use std::path::{Path, PathBuf};

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// On Windows, executability is determined by file extension, not permission bits.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Parse the PATH environment variable into a list of directories.
pub fn parse_system_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// Resolve a tool's binary path by iterating over `path_entries`.
///
/// Returns the first match that exists and is executable.
pub fn resolve_tool_path(tool: &str, path_entries: &[PathBuf]) -> Option<PathBuf> {
    for dir in path_entries {
        for candidate in candidates(&dir.join(tool)) {
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Resolve `program` the way a spawn would.
///
/// Names containing a path separator are checked as given; bare names are
/// looked up on the current PATH.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let as_path = Path::new(program);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        return candidates(as_path).into_iter().find(|c| is_executable(c));
    }
    resolve_tool_path(program, &parse_system_path())
}

#[cfg(windows)]
fn candidates(base: &Path) -> Vec<PathBuf> {
    let mut out = vec![base.to_path_buf()];
    if base.extension().is_none() {
        for ext in ["exe", "cmd", "bat"] {
            out.push(base.with_extension(ext));
        }
    }
    out
}

#[cfg(not(windows))]
fn candidates(base: &Path) -> Vec<PathBuf> {
    vec![base.to_path_buf()]
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_tool(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\necho ok\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn resolves_first_executable_match() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_tool(a.path(), "mytool", 0o644);
        let expected = write_tool(b.path(), "mytool", 0o755);
        let found = resolve_tool_path(
            "mytool",
            &[a.path().to_path_buf(), b.path().to_path_buf()],
        );
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn missing_tool_resolves_to_none() {
        let a = TempDir::new().unwrap();
        assert_eq!(resolve_tool_path("nope", &[a.path().to_path_buf()]), None);
    }

    #[test]
    fn directories_are_not_executables() {
        let a = TempDir::new().unwrap();
        fs::create_dir(a.path().join("sub")).unwrap();
        assert_eq!(resolve_tool_path("sub", &[a.path().to_path_buf()]), None);
    }

    #[test]
    fn explicit_paths_bypass_path_lookup() {
        let a = TempDir::new().unwrap();
        let tool = write_tool(a.path(), "runme", 0o755);
        assert_eq!(resolve_program(tool.to_str().unwrap()), Some(tool.clone()));
        assert_eq!(resolve_program("/nonexistent/arteval/runme"), None);
    }

    #[test]
    fn finds_sh_on_system_path() {
        assert!(resolve_program("sh").is_some());
        assert!(resolve_program("").is_none());
    }
}
