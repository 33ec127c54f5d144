//! Retention: keep at most `max_count` backups per project and target.

use crate::catalog::{BackupCatalog, BackupRepository};
use crate::model::{BackupRecord, BackupTarget};
use crate::utils::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_count: usize,
}

impl RetentionPolicy {
    /// `max_count` must be at least 1; callers validate it beforehand.
    pub fn new(max_count: usize) -> Self {
        Self { max_count }
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Records beyond the newest `max_count` of a newest-first list
    pub fn excess<'a>(&self, newest_first: &'a [BackupRecord]) -> &'a [BackupRecord] {
        newest_first.get(self.max_count..).unwrap_or(&[])
    }

    /// Remove the backups in excess of `max_count`, oldest first.
    ///
    /// Returns every excess record, removed or (when simulating) only
    /// reported. Stops at the first removal that fails.
    pub fn apply<R: BackupRepository>(
        &self,
        catalog: &BackupCatalog<R>,
        target: &BackupTarget,
        project_name: &str,
        simulate: bool,
    ) -> Result<Vec<BackupRecord>> {
        let records = catalog.list(target, project_name)?;
        let excess = self.excess(&records);

        let mut removed = Vec::with_capacity(excess.len());
        for record in excess.iter().rev() {
            if !simulate {
                catalog.remove(record)?;
            }
            tracing::debug!(
                project = %project_name,
                backup_id = %record.id,
                simulate,
                "Pruned backup"
            );
            removed.push(record.clone());
        }

        Ok(removed)
    }
}
