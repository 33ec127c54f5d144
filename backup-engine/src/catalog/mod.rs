//! Backup catalog: discovery, ordering and storage paths of backups.
//!
//! Storage layout on a local target:
//!
//! ```text
//! <base_path>/<project_name>/<backup_id>/<mirrored project tree>
//! ```
//!
//! There is no index file. A backup exists exactly when its directory does,
//! so listing a project means listing the subdirectories of its folder. The
//! directory access itself sits behind [`BackupRepository`].

pub mod local;
pub mod memory;

pub use local::LocalRepository;
pub use memory::InMemoryRepository;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::{BackupId, BackupRecord, BackupTarget};
use crate::report::Reporter;
use crate::utils::errors::Result;

/// Storage of backup directories under a project folder
pub trait BackupRepository: Send + Sync {
    /// Names of the immediate subdirectories of `project_dir`.
    /// A missing `project_dir` yields an empty list.
    fn list_entries(&self, project_dir: &Path) -> Result<Vec<String>>;

    /// Whether a backup directory exists
    fn exists(&self, storage_path: &Path) -> bool;

    /// Make sure `storage_path` exists (idempotent)
    fn prepare(&self, storage_path: &Path) -> Result<()>;

    /// Remove a backup directory tree in a single recursive operation
    fn remove(&self, storage_path: &Path) -> Result<()>;
}

pub struct BackupCatalog<R> {
    repository: R,
    reporter: Arc<dyn Reporter>,
}

impl<R: BackupRepository> BackupCatalog<R> {
    pub fn new(repository: R, reporter: Arc<dyn Reporter>) -> Self {
        Self { repository, reporter }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Folder holding every backup of `project_name` on `target`
    pub fn project_dir(target: &BackupTarget, project_name: &str) -> Result<PathBuf> {
        Ok(target.local_base()?.join(project_name))
    }

    /// Storage path of a backup. Pure derivation, no I/O.
    pub fn path(target: &BackupTarget, project_name: &str, id: &BackupId) -> Result<PathBuf> {
        Ok(Self::project_dir(target, project_name)?.join(id.as_str()))
    }

    /// Backups of `project_name` on `target`, newest first.
    ///
    /// Remote targets yield an empty list and a warning so that listing many
    /// projects keeps going. Entries whose names are not backup ids are
    /// ignored.
    pub fn list(&self, target: &BackupTarget, project_name: &str) -> Result<Vec<BackupRecord>> {
        let project_dir = match target {
            BackupTarget::Local { base_path, .. } => base_path.join(project_name),
            BackupTarget::Remote { name, .. } => {
                self.reporter.warn(&format!(
                    "Target '{}' is remote; listing remote backups is not supported",
                    name
                ));
                return Ok(Vec::new());
            }
        };

        let mut records: Vec<BackupRecord> = self
            .repository
            .list_entries(&project_dir)?
            .into_iter()
            .filter_map(|name| match BackupId::parse(&name) {
                Ok(id) => Some(BackupRecord {
                    storage_path: project_dir.join(id.as_str()),
                    id,
                    project_name: project_name.to_string(),
                }),
                Err(_) => {
                    self.reporter.debug(&format!(
                        "Ignoring {} (not a backup directory)",
                        project_dir.join(&name).display()
                    ));
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    /// Most recent backup, if any
    pub fn latest(&self, target: &BackupTarget, project_name: &str) -> Result<Option<BackupRecord>> {
        Ok(self.list(target, project_name)?.into_iter().next())
    }

    /// Look up one backup by id
    pub fn find(&self, target: &BackupTarget, project_name: &str, id: &BackupId) -> Result<Option<BackupRecord>> {
        let storage_path = Self::path(target, project_name, id)?;
        if !self.repository.exists(&storage_path) {
            return Ok(None);
        }
        Ok(Some(BackupRecord {
            id: id.clone(),
            storage_path,
            project_name: project_name.to_string(),
        }))
    }

    pub fn exists(&self, storage_path: &Path) -> bool {
        self.repository.exists(storage_path)
    }

    pub fn prepare(&self, storage_path: &Path) -> Result<()> {
        self.repository.prepare(storage_path)
    }

    pub fn remove(&self, record: &BackupRecord) -> Result<()> {
        self.repository.remove(&record.storage_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MemoryReporter, NullReporter, Severity};
    use crate::utils::errors::BackupError;
    use std::collections::BTreeMap;

    fn local(base: &str) -> BackupTarget {
        BackupTarget::Local {
            name: "local".to_string(),
            base_path: PathBuf::from(base),
        }
    }

    fn remote() -> BackupTarget {
        BackupTarget::Remote {
            name: "nas".to_string(),
            base_path: "/volume1".to_string(),
            connection_info: BTreeMap::new(),
        }
    }

    fn id(s: &str) -> BackupId {
        BackupId::parse(s).unwrap()
    }

    #[test]
    fn test_path_derivation() {
        let path = BackupCatalog::<InMemoryRepository>::path(&local("/backups"), "site", &id("2024-01-02T03-04-05Z"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/backups/site/2024-01-02T03-04-05Z"));
    }

    #[test]
    fn test_path_rejects_remote() {
        let result = BackupCatalog::<InMemoryRepository>::path(&remote(), "site", &id("2024-01-02T03-04-05Z"));
        assert!(matches!(result, Err(BackupError::UnsupportedTarget(_))));
    }

    #[test]
    fn test_list_without_backups_is_empty() -> Result<()> {
        let catalog = BackupCatalog::new(InMemoryRepository::new(), Arc::new(NullReporter));
        assert!(catalog.list(&local("/backups"), "site")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_list_is_newest_first() -> Result<()> {
        let repo = InMemoryRepository::new();
        for name in ["2024-01-01T00-00-12Z", "2023-12-31T23-59-59Z", "2024-01-01T00-00-14Z", "2024-01-01T00-00-10Z"] {
            repo.insert(Path::new("/backups/site"), name);
        }
        let catalog = BackupCatalog::new(repo, Arc::new(NullReporter));

        let ids: Vec<String> = catalog
            .list(&local("/backups"), "site")?
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();

        assert_eq!(
            ids,
            vec!["2024-01-01T00-00-14Z", "2024-01-01T00-00-12Z", "2024-01-01T00-00-10Z", "2023-12-31T23-59-59Z"]
        );
        Ok(())
    }

    #[test]
    fn test_list_ignores_foreign_directories() -> Result<()> {
        let repo = InMemoryRepository::new();
        repo.insert(Path::new("/backups/site"), "2024-01-01T00-00-10Z");
        repo.insert(Path::new("/backups/site"), "notes");
        let reporter = MemoryReporter::new();
        let catalog = BackupCatalog::new(repo, Arc::new(reporter.clone()));

        let records = catalog.list(&local("/backups"), "site")?;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].storage_path, PathBuf::from("/backups/site/2024-01-01T00-00-10Z"));
        assert_eq!(records[0].project_name, "site");
        assert_eq!(reporter.messages(Severity::Debug).len(), 1);
        Ok(())
    }

    #[test]
    fn test_list_remote_is_empty_with_warning() -> Result<()> {
        let reporter = MemoryReporter::new();
        let catalog = BackupCatalog::new(InMemoryRepository::new(), Arc::new(reporter.clone()));

        assert!(catalog.list(&remote(), "site")?.is_empty());
        assert_eq!(reporter.messages(Severity::Warn).len(), 1);
        Ok(())
    }

    #[test]
    fn test_latest_and_find() -> Result<()> {
        let repo = InMemoryRepository::new();
        repo.insert(Path::new("/backups/site"), "2024-01-01T00-00-10Z");
        repo.insert(Path::new("/backups/site"), "2024-01-01T00-00-11Z");
        let catalog = BackupCatalog::new(repo, Arc::new(NullReporter));
        let target = local("/backups");

        let latest = catalog.latest(&target, "site")?.unwrap();
        assert_eq!(latest.id.as_str(), "2024-01-01T00-00-11Z");

        assert!(catalog.find(&target, "site", &id("2024-01-01T00-00-10Z"))?.is_some());
        assert!(catalog.find(&target, "site", &id("2024-01-01T00-00-09Z"))?.is_none());
        assert!(catalog.latest(&target, "other")?.is_none());
        Ok(())
    }
}
