//! Writes compiled modules to disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default destination when no output path is given.
pub const DEFAULT_OUTPUT: &str = "main.wasm";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("creating directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("writing {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Writes `bytes` verbatim to `path`, creating missing parent directories.
pub fn write_module(bytes: &[u8], path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();

    // If the output directory does not exist, create it
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if fs::metadata(parent).is_err() {
            fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(path, bytes).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("nested").join("main.wasm");

        write_module(&[0, 97, 115, 109], &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0, 97, 115, 109]);

        // Overwrites an existing file
        write_module(&[1], &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1]);
    }

    #[test]
    fn reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_module(&[0], dir.path()).unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
    }
}
