//! Workspace and host context resolution.
//!
//! A workspace is the directory an agent edits. Its root is the enclosing
//! git repository when there is one, otherwise the nearest ancestor holding a
//! `.kodu/` directory, otherwise the starting directory itself. All kodu
//! state lives under `{root}/.kodu/`.

use crate::error::{KoduError, Result};
use crate::git;
use serde::Serialize;
use std::env;
use std::path::{Component, Path, PathBuf};

/// State directory name relative to the workspace root.
pub const KODU_DIR: &str = ".kodu";

/// Resolved workspace paths. All paths are absolute.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    /// Absolute path to the workspace root.
    pub root: PathBuf,

    /// Absolute path to the state directory (`{root}/.kodu/`).
    pub kodu_dir: PathBuf,
}

impl WorkspaceContext {
    /// Resolve the workspace from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            KoduError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the workspace from a specific directory.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();
        if !cwd.is_dir() {
            return Err(KoduError::UserError(format!(
                "workspace directory '{}' does not exist",
                cwd.display()
            )));
        }

        let root = match git::get_repo_root(cwd) {
            Ok(root) => root,
            Err(_) => find_kodu_ancestor(cwd).unwrap_or_else(|| cwd.to_path_buf()),
        };

        Ok(Self::at(root))
    }

    /// A context rooted exactly at `root`, without any discovery.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let kodu_dir = root.join(KODU_DIR);
        Self { root, kodu_dir }
    }

    pub fn is_initialized(&self) -> bool {
        self.kodu_dir.is_dir()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.kodu_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.kodu_dir.join("events")
    }

    /// Get the path to the events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Get the path to the persisted file version history.
    pub fn versions_path(&self) -> PathBuf {
        self.kodu_dir.join("versions.json")
    }

    /// Resolve a tool-supplied path against the workspace root.
    ///
    /// Relative paths are joined onto the root. Paths that would leave the
    /// workspace through `..` are rejected.
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(KoduError::UserError("path must not be empty".to_string()));
        }

        let candidate = Path::new(trimmed);
        let relative = if candidate.is_absolute() {
            candidate.strip_prefix(&self.root).map_err(|_| {
                KoduError::UserError(format!(
                    "path '{}' is outside the workspace '{}'",
                    trimmed,
                    self.root.display()
                ))
            })?
        } else {
            candidate
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(KoduError::UserError(format!(
                            "path '{}' escapes the workspace",
                            trimmed
                        )));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {}
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(KoduError::UserError(format!(
                "path '{}' does not name a file",
                trimmed
            )));
        }

        Ok(self.root.join(normalized))
    }

    /// Workspace-relative display form with forward slashes.
    pub fn relative_display(&self, path: &Path) -> String {
        to_posix(path.strip_prefix(&self.root).unwrap_or(path))
    }
}

fn find_kodu_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(KODU_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Render a path with forward slashes regardless of platform.
pub fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Host facts substituted into system prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub default_shell: String,
    pub home_dir: String,
    pub cwd: String,
}

impl SystemInfo {
    /// Detect host information from the process environment.
    pub fn detect(cwd: &Path) -> Self {
        Self::from_lookup(env::consts::OS, cwd, |key| env::var(key).ok())
    }

    /// Detection with an explicit OS identifier and environment lookup.
    pub fn from_lookup<F>(os: &str, cwd: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_shell = if os == "windows" {
            non_empty("COMSPEC").unwrap_or_else(|| "cmd.exe".to_string())
        } else {
            non_empty("SHELL").unwrap_or_else(|| "/bin/sh".to_string())
        };

        let home_dir = non_empty("HOME")
            .or_else(|| non_empty("USERPROFILE"))
            .unwrap_or_else(|| "~".to_string());

        Self {
            os_name: os_display_name(os).to_string(),
            default_shell: default_shell.replace('\\', "/"),
            home_dir: home_dir.replace('\\', "/"),
            cwd: to_posix(cwd),
        }
    }
}

fn os_display_name(os: &str) -> &str {
    match os {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_from_repo_subdirectory() {
        let temp_dir = create_test_repo();
        let subdir = temp_dir.path().join("src").join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        let ctx = WorkspaceContext::resolve_from(&subdir).unwrap();

        assert_eq!(
            ctx.root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
        assert!(ctx.kodu_dir.ends_with(".kodu"));
    }

    #[test]
    fn test_resolve_outside_repo_uses_kodu_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(".kodu")).unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = WorkspaceContext::resolve_from(&nested).unwrap();
        assert_eq!(ctx.root, temp_dir.path());
        assert!(ctx.is_initialized());
    }

    #[test]
    fn test_resolve_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = WorkspaceContext::resolve_from(temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, KoduError::UserError(_)));
    }

    #[test]
    fn test_state_paths() {
        let ctx = WorkspaceContext::at("/w");
        assert_eq!(ctx.config_path(), Path::new("/w/.kodu/config.yaml"));
        assert_eq!(ctx.events_file(), Path::new("/w/.kodu/events/events.ndjson"));
        assert_eq!(ctx.versions_path(), Path::new("/w/.kodu/versions.json"));
    }

    #[test]
    fn test_resolve_path_normalizes_inside_workspace() {
        let ctx = WorkspaceContext::at("/w");
        assert_eq!(
            ctx.resolve_path("src/./lib.rs").unwrap(),
            Path::new("/w/src/lib.rs")
        );
        assert_eq!(
            ctx.resolve_path("src/../Cargo.toml").unwrap(),
            Path::new("/w/Cargo.toml")
        );
        assert_eq!(
            ctx.resolve_path("/w/src/main.rs").unwrap(),
            Path::new("/w/src/main.rs")
        );
    }

    #[test]
    fn test_resolve_path_rejects_escapes() {
        let ctx = WorkspaceContext::at("/w");
        assert!(ctx.resolve_path("../etc/passwd").is_err());
        assert!(ctx.resolve_path("/etc/passwd").is_err());
        assert!(ctx.resolve_path("  ").is_err());
        assert!(ctx.resolve_path(".").is_err());
    }

    #[test]
    fn test_relative_display() {
        let ctx = WorkspaceContext::at("/w");
        assert_eq!(ctx.relative_display(Path::new("/w/src/lib.rs")), "src/lib.rs");
    }

    #[test]
    fn test_system_info_unix() {
        let env: HashMap<&str, &str> = [("SHELL", "/bin/zsh"), ("HOME", "/home/dev")].into();
        let info = SystemInfo::from_lookup("linux", Path::new("/home/dev/project"), |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(info.os_name, "Linux");
        assert_eq!(info.default_shell, "/bin/zsh");
        assert_eq!(info.home_dir, "/home/dev");
        assert_eq!(info.cwd, "/home/dev/project");
    }

    #[test]
    fn test_system_info_windows_uses_forward_slashes() {
        let env: HashMap<&str, &str> = [
            ("COMSPEC", "C:\\Windows\\System32\\cmd.exe"),
            ("USERPROFILE", "C:\\Users\\dev"),
        ]
        .into();
        let info = SystemInfo::from_lookup("windows", Path::new("proj"), |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(info.os_name, "Windows");
        assert_eq!(info.default_shell, "C:/Windows/System32/cmd.exe");
        assert_eq!(info.home_dir, "C:/Users/dev");
    }

    #[test]
    fn test_system_info_defaults_when_env_missing() {
        let info = SystemInfo::from_lookup("linux", Path::new("/"), |_| None);
        assert_eq!(info.default_shell, "/bin/sh");
        assert_eq!(info.home_dir, "~");
    }
}
