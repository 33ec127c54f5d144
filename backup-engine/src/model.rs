//! Data model shared by the catalog, copier and orchestrator.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::utils::errors::{BackupError, Result};

/// `strftime` layout of a backup id. Colons are replaced by hyphens so the id
/// is a valid directory name everywhere.
pub const BACKUP_ID_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// A project whose root directory gets backed up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Unique, non-empty project name (also the per-project folder on a target)
    pub name: String,

    /// Absolute path of the directory tree to copy
    pub root_path: PathBuf,

    /// Exclusion patterns, evaluated against paths relative to `root_path`
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Where backups are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackupTarget {
    Local {
        name: String,
        base_path: PathBuf,
    },
    /// Recognised but not implemented: every operation reports it unsupported.
    Remote {
        name: String,
        base_path: String,
        #[serde(default)]
        connection_info: BTreeMap<String, String>,
    },
}

impl BackupTarget {
    pub fn name(&self) -> &str {
        match self {
            BackupTarget::Local { name, .. } | BackupTarget::Remote { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BackupTarget::Local { .. } => "local",
            BackupTarget::Remote { .. } => "remote",
        }
    }

    /// Base directory of a local target, or `UnsupportedTarget` for anything else.
    pub fn local_base(&self) -> Result<&PathBuf> {
        match self {
            BackupTarget::Local { base_path, .. } => Ok(base_path),
            BackupTarget::Remote { name, .. } => Err(BackupError::UnsupportedTarget(name.clone())),
        }
    }
}

/// Identifier of one backup generation, e.g. `2024-03-01T09-15-42Z`.
///
/// Ids sort lexicographically in chronological order. Two ids generated in
/// the same second are equal; a second backup within that second merges into
/// the first one's directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupId(String);

impl BackupId {
    /// Id for the current wall-clock time
    pub fn generate() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Id for a given instant; subsecond precision is discarded
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(BACKUP_ID_FORMAT).to_string())
    }

    /// Validate a directory name or user input as a backup id
    pub fn parse(value: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(value, BACKUP_ID_FORMAT)
            .map_err(|_| BackupError::InvalidBackupId(value.to_string()))?;
        // chrono accepts unpadded fields; only the canonical form sorts correctly
        if value.len() != "YYYY-MM-DDTHH-mm-ssZ".len() {
            return Err(BackupError::InvalidBackupId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Instant this id was generated at
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, BACKUP_ID_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BackupId {
    type Error = BackupError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<BackupId> for String {
    fn from(id: BackupId) -> Self {
        id.0
    }
}

/// A backup discovered on a target. The directory is the record; nothing
/// else is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: BackupId,
    pub storage_path: PathBuf,
    pub project_name: String,
}

/// Outcome of a tree copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyStats {
    pub files_copied: u64,
    pub directories_created: u64,
    pub bytes_copied: u64,

    /// Excluded entries, relative to the copy root, `/`-separated
    pub skipped_paths: Vec<String>,
}
