//! Backup orchestrator - the public face of the engine.
//!
//! Ties together the tree copier, the catalog and retention:
//! - `create_backup` copies a project root into a new timestamped directory
//! - `list_backups` / `get_backup_path` query the catalog
//! - `apply_retention` prunes old backups (a separate step from creating)
//! - `restore_backup` replays a backup into a fresh destination
//!
//! Calls are sequential and synchronous. Concurrent backups of the same
//! project to the same target race on directory creation; callers must
//! serialize them.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{BackupCatalog, BackupRepository, LocalRepository};
use crate::fs::copier::TreeCopier;
use crate::model::{BackupId, BackupRecord, BackupTarget, CopyStats, ProjectSpec};
use crate::report::Reporter;
use crate::retention::RetentionPolicy;
use crate::utils::errors::{BackupError, Result};

/// Result of `create_backup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupOutcome {
    pub id: BackupId,
    pub storage_path: PathBuf,
    pub stats: CopyStats,
    pub simulated: bool,
}

pub struct BackupOrchestrator<R = LocalRepository> {
    catalog: BackupCatalog<R>,
    copier: TreeCopier,
    reporter: Arc<dyn Reporter>,
}

impl BackupOrchestrator<LocalRepository> {
    /// Orchestrator over the local filesystem
    pub fn local(reporter: Arc<dyn Reporter>) -> Self {
        Self::new(LocalRepository::new(), reporter)
    }
}

impl<R: BackupRepository> BackupOrchestrator<R> {
    pub fn new(repository: R, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            catalog: BackupCatalog::new(repository, Arc::clone(&reporter)),
            copier: TreeCopier::new(Arc::clone(&reporter)),
            reporter,
        }
    }

    pub fn catalog(&self) -> &BackupCatalog<R> {
        &self.catalog
    }

    /// New id from the current wall-clock time
    pub fn generate_backup_id(&self) -> BackupId {
        BackupId::generate()
    }

    pub fn get_backup_path(&self, target: &BackupTarget, project_name: &str, id: &BackupId) -> Result<PathBuf> {
        BackupCatalog::<R>::path(target, project_name, id)
    }

    /// Copy the project tree into `<base>/<project>/<id>`.
    ///
    /// Does not prune; call [`apply_retention`](Self::apply_retention)
    /// afterwards when wanted.
    pub fn create_backup(
        &self,
        project: &ProjectSpec,
        target: &BackupTarget,
        id: &BackupId,
        simulate: bool,
    ) -> Result<BackupOutcome> {
        let storage_path = BackupCatalog::<R>::path(target, &project.name, id)?;

        if self.catalog.exists(&storage_path) {
            self.reporter.warn(&format!(
                "Backup {} of '{}' already exists; merging into {}",
                id,
                project.name,
                storage_path.display()
            ));
        }

        self.reporter.info(&format!(
            "{} '{}' to target '{}' ({})",
            if simulate { "Simulating backup of" } else { "Backing up" },
            project.name,
            target.name(),
            storage_path.display()
        ));

        self.copier.check(&project.root_path, &storage_path)?;
        if !simulate {
            self.catalog.prepare(&storage_path)?;
        }

        let stats = self
            .copier
            .copy(&project.root_path, &storage_path, &project.exclude_patterns, simulate)?;

        self.reporter.success(&format!(
            "{} '{}': {} files, {} directories, {} bytes, {} excluded",
            if simulate { "Would back up" } else { "Backed up" },
            project.name,
            stats.files_copied,
            stats.directories_created,
            stats.bytes_copied,
            stats.skipped_paths.len()
        ));

        Ok(BackupOutcome {
            id: id.clone(),
            storage_path,
            stats,
            simulated: simulate,
        })
    }

    /// Backups of a project on a target, newest first
    pub fn list_backups(&self, target: &BackupTarget, project_name: &str) -> Result<Vec<BackupRecord>> {
        self.catalog.list(target, project_name)
    }

    /// Prune backups beyond the newest `max_count`. `max_count` must be >= 1.
    pub fn apply_retention(
        &self,
        target: &BackupTarget,
        project_name: &str,
        max_count: usize,
        simulate: bool,
    ) -> Result<Vec<BackupRecord>> {
        let removed = RetentionPolicy::new(max_count).apply(&self.catalog, target, project_name, simulate)?;

        for record in &removed {
            self.reporter.info(&format!(
                "{} old backup {} of '{}'",
                if simulate { "Would remove" } else { "Removed" },
                record.id,
                project_name
            ));
        }

        Ok(removed)
    }

    /// Replay a backup into `destination`, which must not exist yet.
    ///
    /// The destination check runs first, also when simulating, and fails with
    /// [`BackupError::DestinationExists`] before anything is written. A copy
    /// that fails midway leaves a partially restored destination behind and
    /// returns the I/O error. A destination that exists as something other
    /// than a directory, or that lies inside the backup, fails with
    /// [`BackupError::Io`] in both modes.
    pub fn restore_backup(&self, storage_path: &Path, destination: &Path, simulate: bool) -> Result<CopyStats> {
        if destination.is_dir() {
            return Err(BackupError::DestinationExists(destination.to_path_buf()));
        }
        if destination.exists() {
            return Err(BackupError::Io {
                op: "restoring into",
                path: destination.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "destination is not a directory"),
            });
        }
        self.copier.check(storage_path, destination)?;

        self.reporter.info(&format!(
            "{} {} into {}",
            if simulate { "Simulating restore of" } else { "Restoring" },
            storage_path.display(),
            destination.display()
        ));

        if !simulate {
            std::fs::create_dir_all(destination).map_err(BackupError::io("creating", destination))?;
        }

        let none: [&str; 0] = [];
        let stats = self.copier.copy(storage_path, destination, &none, simulate)?;

        self.reporter.success(&format!(
            "{} {} files ({} bytes) into {}",
            if simulate { "Would restore" } else { "Restored" },
            stats.files_copied,
            stats.bytes_copied,
            destination.display()
        ));

        Ok(stats)
    }
}
