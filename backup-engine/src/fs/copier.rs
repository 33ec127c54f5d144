//! Recursive, exclusion-aware directory copy.
//!
//! Walks the source depth-first (entries sorted by name), consults the
//! [`PathMatcher`] for every entry and mirrors the kept entries under the
//! destination. An excluded directory is pruned as a whole: it shows up once
//! in `skipped_paths` and nothing beneath it is visited.
//!
//! Symbolic links are never followed. Links and special files (sockets,
//! FIFOs, devices) are skipped with a warning and not counted. Read errors,
//! permission errors included, abort the copy. A destination inside the
//! source tree is rejected before anything is written.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

use crate::fs::matcher::PathMatcher;
use crate::model::CopyStats;
use crate::report::Reporter;
use crate::utils::errors::{BackupError, Result};

pub struct TreeCopier {
    reporter: Arc<dyn Reporter>,
}

impl TreeCopier {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { reporter }
    }

    /// Copy `source` into `destination`, skipping excluded entries.
    ///
    /// With `simulate` set nothing is written, but the returned counters are
    /// the ones a real copy would produce.
    ///
    /// # Returns
    /// * `Ok(CopyStats)` - Counters for the copied tree
    /// * `Err(BackupError::Io)` - Source missing or unreadable, or a write failed
    pub fn copy<S: AsRef<str>>(
        &self,
        source: &Path,
        destination: &Path,
        exclude_patterns: &[S],
        simulate: bool,
    ) -> Result<CopyStats> {
        self.check(source, destination)?;

        if !simulate {
            fs::create_dir_all(destination).map_err(BackupError::io("creating", destination))?;
        }

        let matcher = PathMatcher::new(exclude_patterns);
        let mut stats = CopyStats::default();
        let mut skipped = Vec::new();

        let walker = WalkDir::new(source)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = relative_path(entry, source);
                if matcher.is_excluded(&relative) {
                    skipped.push(relative);
                    false
                } else {
                    true
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| BackupError::from_walk("reading", source, e))?;
            let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let target = destination.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if !simulate {
                    fs::create_dir_all(&target).map_err(BackupError::io("creating", &target))?;
                }
                stats.directories_created += 1;
            } else if file_type.is_file() {
                let size = if simulate {
                    entry
                        .metadata()
                        .map_err(|e| BackupError::from_walk("reading", entry.path(), e))?
                        .len()
                } else {
                    fs::copy(entry.path(), &target).map_err(BackupError::io("copying", entry.path()))?
                };
                stats.files_copied += 1;
                stats.bytes_copied += size;
            } else {
                self.reporter.warn(&format!(
                    "Skipping {} (symbolic link or special file)",
                    entry.path().display()
                ));
            }
        }

        stats.skipped_paths = skipped;

        self.reporter.debug(&format!(
            "{} {} -> {}: {} files, {} directories, {} bytes, {} skipped",
            if simulate { "Simulated copy" } else { "Copied" },
            source.display(),
            destination.display(),
            stats.files_copied,
            stats.directories_created,
            stats.bytes_copied,
            stats.skipped_paths.len(),
        ));

        Ok(stats)
    }

    /// Fail unless `source` is a directory and `destination` lies outside it.
    pub fn check(&self, source: &Path, destination: &Path) -> Result<()> {
        let root_meta = fs::metadata(source).map_err(BackupError::io("reading", source))?;
        if !root_meta.is_dir() {
            return Err(BackupError::Io {
                op: "reading",
                path: source.to_path_buf(),
                source: std::io::Error::other("source is not a directory"),
            });
        }

        let source_root = fs::canonicalize(source).map_err(BackupError::io("reading", source))?;
        if resolve(destination).starts_with(&source_root) {
            return Err(BackupError::Io {
                op: "copying into",
                path: destination.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("destination lies inside the source {}", source.display()),
                ),
            });
        }

        Ok(())
    }
}

/// Absolute form of a path that may not exist yet: the nearest existing
/// ancestor canonicalized, with the missing tail appended.
fn resolve(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        let probe = if existing.as_os_str().is_empty() { Path::new(".") } else { existing };
        if let Ok(canonical) = fs::canonicalize(probe) {
            return missing.iter().rev().fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Path of an entry relative to the walk root, with `/` separators
fn relative_path(entry: &DirEntry, root: &Path) -> String {
    let path = entry.path();
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
