//! Custom error types for the backup engine.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error while {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target '{0}' is a remote target; remote backups are not supported")]
    UnsupportedTarget(String),

    #[error("Restore destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Invalid backup id: {0}")]
    InvalidBackupId(String),
}

impl BackupError {
    /// Build a mapper that wraps an `io::Error` with the operation and path.
    ///
    /// ```
    /// use backup_engine::BackupError;
    /// use std::path::Path;
    ///
    /// let path = Path::new("/nonexistent/backup-engine-doc");
    /// let err = std::fs::read_dir(path)
    ///     .map_err(BackupError::io("reading", path))
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("reading"));
    /// ```
    pub fn io(op: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> BackupError {
        let path = path.to_path_buf();
        move |source| BackupError::Io { op, path, source }
    }

    /// Convert a directory walk failure, keeping the path it failed on.
    pub fn from_walk(op: &'static str, fallback: &Path, err: walkdir::Error) -> BackupError {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| fallback.to_path_buf());
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
        BackupError::Io { op, path, source }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
