//! Filesystem-backed repository: backups are plain directories.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::BackupRepository;
use crate::utils::errors::{BackupError, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRepository;

impl LocalRepository {
    pub fn new() -> Self {
        Self
    }
}

impl BackupRepository for LocalRepository {
    fn list_entries(&self, project_dir: &Path) -> Result<Vec<String>> {
        let entries = match fs::read_dir(project_dir) {
            Ok(entries) => entries,
            // No backups yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io("listing", project_dir)(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(BackupError::io("listing", project_dir))?;
            let file_type = entry.file_type().map_err(BackupError::io("reading", &entry.path()))?;
            if file_type.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        Ok(names)
    }

    fn exists(&self, storage_path: &Path) -> bool {
        storage_path.is_dir()
    }

    fn prepare(&self, storage_path: &Path) -> Result<()> {
        fs::create_dir_all(storage_path).map_err(BackupError::io("creating", storage_path))
    }

    fn remove(&self, storage_path: &Path) -> Result<()> {
        fs::remove_dir_all(storage_path).map_err(BackupError::io("removing", storage_path))
    }
}
