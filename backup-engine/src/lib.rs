//! Backup Engine Library
//!
//! Point-in-time copies of project directory trees into timestamped backup
//! directories, with exclusion patterns, retention and guarded restore.
//!
//! The engine is synchronous: every copy, listing and removal completes
//! before control returns to the caller. Running two backups of the same
//! project against the same target concurrently is outside its contract;
//! callers serialize backups per project.

pub mod catalog;
pub mod fs;
pub mod model;
pub mod orchestrator;
pub mod report;
pub mod retention;
pub mod utils;

// Re-export commonly used types
pub use catalog::{BackupCatalog, BackupRepository};
pub use model::{BackupId, BackupRecord, BackupTarget, CopyStats, ProjectSpec};
pub use orchestrator::{BackupOrchestrator, BackupOutcome};
pub use report::{Reporter, Severity};
pub use retention::RetentionPolicy;
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
