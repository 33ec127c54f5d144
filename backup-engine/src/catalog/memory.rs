//! In-memory repository for exercising catalog and retention logic without
//! touching the disk.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::BackupRepository;
use crate::utils::errors::{BackupError, Result};

/// Project folder -> names of the backup directories inside it
type Entries = BTreeMap<PathBuf, BTreeSet<String>>;

#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<Entries>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backup directory `name` under `project_dir`
    pub fn insert(&self, project_dir: &Path, name: &str) {
        self.lock()
            .entry(project_dir.to_path_buf())
            .or_default()
            .insert(name.to_string());
    }

    /// Names currently stored under `project_dir`, ascending
    pub fn names(&self, project_dir: &Path) -> Vec<String> {
        self.lock()
            .get(project_dir)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Split a storage path into its project folder and directory name
fn split(storage_path: &Path) -> Option<(&Path, String)> {
    let parent = storage_path.parent()?;
    let name = storage_path.file_name()?.to_string_lossy().to_string();
    Some((parent, name))
}

impl BackupRepository for InMemoryRepository {
    fn list_entries(&self, project_dir: &Path) -> Result<Vec<String>> {
        Ok(self.names(project_dir))
    }

    fn exists(&self, storage_path: &Path) -> bool {
        split(storage_path)
            .map(|(parent, name)| self.lock().get(parent).is_some_and(|names| names.contains(&name)))
            .unwrap_or(false)
    }

    fn prepare(&self, storage_path: &Path) -> Result<()> {
        let (parent, name) = split(storage_path).ok_or_else(|| BackupError::Io {
            op: "creating",
            path: storage_path.to_path_buf(),
            source: ErrorKind::InvalidInput.into(),
        })?;
        self.insert(parent, &name);
        Ok(())
    }

    fn remove(&self, storage_path: &Path) -> Result<()> {
        let removed = split(storage_path)
            .map(|(parent, name)| {
                self.lock()
                    .get_mut(parent)
                    .is_some_and(|names| names.remove(&name))
            })
            .unwrap_or(false);

        if removed {
            Ok(())
        } else {
            Err(BackupError::Io {
                op: "removing",
                path: storage_path.to_path_buf(),
                source: ErrorKind::NotFound.into(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_list_remove() -> Result<()> {
        let repo = InMemoryRepository::new();
        let project = Path::new("/backups/site");
        repo.insert(project, "b");
        repo.insert(project, "a");

        assert_eq!(repo.list_entries(project)?, vec!["a", "b"]);
        assert!(repo.exists(&project.join("a")));

        repo.remove(&project.join("a"))?;
        assert_eq!(repo.names(project), vec!["b"]);
        assert!(!repo.exists(&project.join("a")));
        Ok(())
    }

    #[test]
    fn test_remove_unknown_fails() {
        let repo = InMemoryRepository::new();
        assert!(repo.remove(Path::new("/backups/site/missing")).is_err());
    }

    #[test]
    fn test_prepare_registers_entry() -> Result<()> {
        let repo = InMemoryRepository::new();
        repo.prepare(Path::new("/backups/site/2024-01-01T00-00-00Z"))?;
        repo.prepare(Path::new("/backups/site/2024-01-01T00-00-00Z"))?;
        assert_eq!(repo.names(Path::new("/backups/site")).len(), 1);
        Ok(())
    }
}
