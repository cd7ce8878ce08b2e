//! Atomic file replacement.
//!
//! Content is written to `.{filename}.kodu.tmp` next to the target, synced,
//! and renamed over the target. A reader therefore sees either the old file
//! or the complete new file, never a partially applied edit.
//!
//! On crash a stale temporary file may remain; it is overwritten by the next
//! write to the same target.

use crate::error::{KoduError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to `path`, creating parent directories as needed.
///
/// ```no_run
/// use kodu::fs::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new("src/main.rs"), b"fn main() {}\n")?;
/// # Ok::<(), kodu::error::KoduError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            KoduError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// String convenience wrapper around [`atomic_write`].
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Remove `path` if it exists. Missing files are not an error.
pub fn remove_file_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(KoduError::UserError(format!(
            "failed to remove '{}': {}",
            path.display(),
            e
        ))),
    }
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            KoduError::UserError(format!("invalid file path '{}'", target.display()))
        })?;
    let parent = target.parent().unwrap_or(Path::new("."));
    Ok(parent.join(format!(".{}.kodu.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        KoduError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let written = file.write_all(content).and_then(|_| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(path);
        return Err(KoduError::UserError(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

/// `rename` replaces an existing destination atomically on POSIX and, since
/// Rust 1.70, via `MoveFileExW(MOVEFILE_REPLACE_EXISTING)` on Windows.
fn replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        KoduError::UserError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("lib.rs");

        atomic_write(&file_path, b"pub fn f() {}\n").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "pub fn f() {}\n");
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("lib.rs");
        fs::write(&file_path, "old").unwrap();

        atomic_write_file(&file_path, "new").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "new");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("src").join("agent").join("mod.rs");

        atomic_write_file(&file_path, "mod x;\n").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "mod x;\n");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("a.txt");

        atomic_write(&file_path, b"content").unwrap();

        assert!(!temp_dir.path().join(".a.txt.kodu.tmp").exists());
    }

    #[test]
    fn test_atomic_write_empty_content() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("empty.txt");

        atomic_write(&file_path, b"").unwrap();

        assert!(fs::read(&file_path).unwrap().is_empty());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/w/src/file.rs")).unwrap();
        assert_eq!(temp, Path::new("/w/src/.file.rs.kodu.tmp"));
    }

    #[test]
    fn test_remove_file_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("gone.txt");

        remove_file_if_exists(&file_path).unwrap();

        fs::write(&file_path, "x").unwrap();
        remove_file_if_exists(&file_path).unwrap();
        assert!(!file_path.exists());
    }
}
