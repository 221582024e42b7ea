//! Durable file I/O.
//!
//! Snapshots and job records are published with [`atomic_replace`]: write a
//! temp sibling, fsync it, rename it over the target, then best-effort fsync
//! the parent directory. Readers observe either the old contents or the new
//! contents, never a truncated file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use thiserror::Error;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("failed to create parent directory for {path}: {source}")]
    CreateParent {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write temp file {path}: {source}")]
    WriteTemp {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to replace {path}: {source}")]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn temp_sibling(target: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let suffix = format!(
        "{name}.tmp.{pid}.{counter}.{nanos}",
        pid = std::process::id()
    );
    target.with_file_name(suffix)
}

fn write_temp_durable(temp_path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn sync_parent_dir(target: &Path) {
    if let Some(parent) = target.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_target: &Path) {}

/// Atomically replaces `target` with `contents`.
pub fn atomic_replace(target: &Path, contents: &[u8]) -> Result<(), ReplaceError> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ReplaceError::CreateParent {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let temp_path = temp_sibling(target);
    if let Err(source) = write_temp_durable(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(ReplaceError::WriteTemp {
            path: temp_path,
            source,
        });
    }

    if let Err(source) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(ReplaceError::Rename {
            path: target.to_path_buf(),
            source,
        });
    }

    sync_parent_dir(target);
    Ok(())
}

/// Reads a file to a string, mapping every failure to `None`.
pub fn read_to_string_opt(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Reads and parses a JSON file, mapping every failure to `None`.
pub fn read_json_file(path: &Path) -> Option<Value> {
    let text = read_to_string_opt(path)?;
    serde_json::from_str(&text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replace_creates_parents_and_writes() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/deeper/out.json");
        atomic_replace(&target, b"{\"a\":1}").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn replace_overwrites_previous_contents() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.json");
        atomic_replace(&target, b"old").unwrap();
        atomic_replace(&target, b"new").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn replace_leaves_no_temp_siblings() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.json");
        atomic_replace(&target, b"x").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.json".to_string()]);
    }

    #[test]
    fn read_json_file_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_json_file(&dir.path().join("absent.json")).is_none());
    }
}
