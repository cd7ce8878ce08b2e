//! Git command runner and the version-control collaborator used to stamp
//! file edit transactions with a commit.
//!
//! All git invocations go through [`run_git`], which captures stdout/stderr
//! and maps failures to [`KoduError::GitError`].

use crate::error::{KoduError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty()
    }

    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }
}

/// Run a git command in `cwd`.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On exit code 0
/// * `Err(KoduError::GitError)` - On spawn failure or non-zero exit
///
/// ```no_run
/// use kodu::git::run_git;
/// use std::path::Path;
///
/// let output = run_git(Path::new("."), &["status", "--porcelain"])?;
/// println!("Changes: {}", output.stdout);
/// # Ok::<(), kodu::error::KoduError>(())
/// ```
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .output()
        .map_err(|e| {
            KoduError::GitError(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let exit_code = output.status.code().unwrap_or(-1);
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(KoduError::GitError(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            exit_code,
            error_msg
        )))
    }
}

/// Repository root via `git rev-parse --show-toplevel`.
///
/// Returns `KoduError::UserError` (not `GitError`) when `cwd` is not inside a
/// repository, since that is a property of where the user ran the command.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| {
            KoduError::UserError(format!("failed to execute git: {} (is git installed?)", e))
        })?;

    let git_output = GitOutput::from_output(&output);
    if output.status.success() {
        Ok(PathBuf::from(git_output.stdout))
    } else {
        Err(KoduError::UserError(
            "not inside a git repository".to_string(),
        ))
    }
}

/// Returns true when `path` is inside a git work tree.
pub fn is_repository<P: AsRef<Path>>(path: P) -> bool {
    get_repo_root(path).is_ok()
}

/// Branch and commit produced by a version-control commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub branch: String,
    pub commit_hash: String,
}

impl CommitInfo {
    /// The `<git_commit_info>` block appended to tool responses.
    pub fn to_xml(&self) -> String {
        format!(
            "<git_commit_info>\n<branch>{}</branch>\n<commit_hash>{}</commit_hash>\n</git_commit_info>",
            self.branch, self.commit_hash
        )
    }
}

/// Working tree summary returned by [`VersionControl::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VcsStatus {
    pub branch: String,
    /// Porcelain status lines, one per changed path.
    pub changes: Vec<String>,
}

impl VcsStatus {
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }
}

/// The version-control collaborator consumed by file edit transactions.
pub trait VersionControl {
    /// Make sure a repository exists at the workspace root.
    fn init(&self) -> Result<()>;

    fn status(&self) -> Result<VcsStatus>;

    /// Commit the current state of `path` with `message`.
    fn commit(&self, message: &str, path: &Path) -> Result<CommitInfo>;

    fn push(&self) -> Result<()>;
}

/// [`VersionControl`] backed by the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitHandler {
    root: PathBuf,
}

impl GitHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> Result<String> {
        Ok(run_git(&self.root, &["rev-parse", "--abbrev-ref", "HEAD"])?.stdout)
    }
}

impl VersionControl for GitHandler {
    fn init(&self) -> Result<()> {
        if is_repository(&self.root) {
            return Ok(());
        }
        run_git(&self.root, &["init"])?;
        Ok(())
    }

    fn status(&self) -> Result<VcsStatus> {
        let output = run_git(&self.root, &["status", "--porcelain"])?;
        Ok(VcsStatus {
            branch: self.current_branch()?,
            changes: output.lines().into_iter().map(str::to_string).collect(),
        })
    }

    fn commit(&self, message: &str, path: &Path) -> Result<CommitInfo> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let pathspec = relative.to_string_lossy().replace('\\', "/");

        // -A stages deletions too (rollback of a created file).
        run_git(&self.root, &["add", "-A", "--", &pathspec])?;
        run_git(&self.root, &["commit", "-m", message, "--", &pathspec])?;

        Ok(CommitInfo {
            branch: self.current_branch()?,
            commit_hash: run_git(&self.root, &["rev-parse", "HEAD"])?.stdout,
        })
    }

    fn push(&self) -> Result<()> {
        run_git(&self.root, &["push"])?;
        Ok(())
    }
}
