//! ABOUTME: Atomic file writes — write to a sibling temp file, then rename,
//! ABOUTME: so a concurrent reader never observes a partially written file

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicWriteError {
    #[error("failed to create parent directory {path}: {source}")]
    CreateDir { path: String, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: std::io::Error },
    #[error("failed to rename {from} to {to}: {source}")]
    Rename { from: String, to: String, source: std::io::Error },
}

/// Writes `contents` to `path` via a `.tmp` sibling file followed by a
/// rename, creating any missing parent directories first. Mirrors
/// `FileLineageBackend::write_event`'s write sequence.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), AtomicWriteError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| AtomicWriteError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let tmp_path: PathBuf = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });

    std::fs::write(&tmp_path, contents).map_err(|source| AtomicWriteError::Write {
        path: tmp_path.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| AtomicWriteError::Rename {
        from: tmp_path.display().to_string(),
        to: path.display().to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_contents_and_leaves_no_tmp_file_behind() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("state.txt");

        atomic_write(&target, b"hello").unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
        assert!(!target.with_extension("txt.tmp").exists());
    }

    #[test]
    fn overwrites_an_existing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state.txt");
        atomic_write(&target, b"first").unwrap();
        atomic_write(&target, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
    }
}
