//! Command implementations.
//!
//! Engine calls are blocking; each one runs on the blocking pool and is
//! awaited before the next starts, so a run stays strictly sequential.

use anyhow::{anyhow, bail};
use backup_engine::{BackupError, BackupId, BackupOrchestrator, BackupRecord, BackupTarget};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::{BackupArgs, InitArgs, ListArgs, PruneArgs, RestoreArgs};
use crate::config::{ProjectSettings, Settings, TargetSettings, STARTER_CONFIG};
use crate::format::{format_bytes, format_duration};

/// Validated settings plus the engine they drive
pub struct Context {
    pub settings: Settings,
    pub orchestrator: Arc<BackupOrchestrator>,
}

/// One row of `list --json`
#[derive(Debug, Serialize)]
pub struct ListedBackup {
    pub project: String,
    pub target: String,
    pub id: BackupId,
    pub created_at: Option<String>,
    pub path: PathBuf,
}

/// Run engine work on the blocking pool
async fn blocking<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> backup_engine::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| anyhow!(e))??;
    Ok(value)
}

fn is_unsupported_target(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<BackupError>(), Some(BackupError::UnsupportedTarget(_)))
}

fn dry_run_tag(dry_run: bool) -> &'static str {
    if dry_run {
        "[dry-run] "
    } else {
        ""
    }
}

/// Back up the selected projects. Returns `false` when any of them failed.
pub async fn backup(ctx: &Context, args: BackupArgs) -> anyhow::Result<bool> {
    let projects = ctx.settings.select_projects(args.project.as_deref())?;
    let id = ctx.orchestrator.generate_backup_id();
    let started = Instant::now();
    let mut succeeded = 0usize;
    let mut failed = 0usize;

    tracing::info!(backup_id = %id, projects = projects.len(), dry_run = args.dry_run, "Starting backup run");

    for project in projects {
        let targets = match ctx.settings.targets_for(project, args.target.as_deref()) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(project = %project.spec.name, "{}", e);
                failed += 1;
                continue;
            }
        };

        let mut project_failed = false;
        for target in targets {
            match backup_one(ctx, project, target, &id, &args).await {
                Ok(()) => {}
                Err(e) if is_unsupported_target(&e) => {
                    tracing::warn!(project = %project.spec.name, target = %target.target.name(), "Skipped: {}", e);
                }
                Err(e) => {
                    tracing::error!(project = %project.spec.name, target = %target.target.name(), "Backup failed: {:#}", e);
                    project_failed = true;
                }
            }
        }

        if project_failed {
            failed += 1;
        } else {
            succeeded += 1;
        }
    }

    println!(
        "{}Backup {} finished in {}: {} succeeded, {} failed",
        dry_run_tag(args.dry_run),
        id,
        format_duration(started.elapsed()),
        succeeded,
        failed
    );

    Ok(failed == 0)
}

async fn backup_one(
    ctx: &Context,
    project: &ProjectSettings,
    target: &TargetSettings,
    id: &BackupId,
    args: &BackupArgs,
) -> anyhow::Result<()> {
    let orchestrator = Arc::clone(&ctx.orchestrator);
    let spec = project.spec.clone();
    let backup_target = target.target.clone();
    let backup_id = id.clone();
    let max_backups = target.max_backups;
    let dry_run = args.dry_run;
    let prune = !args.no_prune;

    let (outcome, removed) = blocking(move || {
        let existed = match orchestrator.get_backup_path(&backup_target, &spec.name, &backup_id) {
            Ok(path) => orchestrator.catalog().exists(&path),
            Err(_) => false,
        };
        let outcome = orchestrator.create_backup(&spec, &backup_target, &backup_id, dry_run)?;

        let removed = if prune {
            // A simulated backup is not on disk yet; keep room for it
            let keep = if dry_run && !existed { max_backups - 1 } else { max_backups };
            orchestrator.apply_retention(&backup_target, &spec.name, keep, dry_run)?
        } else {
            Vec::new()
        };

        Ok((outcome, removed))
    })
    .await?;

    let stats = &outcome.stats;
    println!(
        "{}{} -> {}: {} files, {} directories, {}, {} excluded ({})",
        dry_run_tag(dry_run),
        project.spec.name,
        target.target.name(),
        stats.files_copied,
        stats.directories_created,
        format_bytes(stats.bytes_copied),
        stats.skipped_paths.len(),
        outcome.storage_path.display()
    );
    print_removed(&removed, dry_run);

    Ok(())
}

fn print_removed(removed: &[BackupRecord], dry_run: bool) {
    if removed.is_empty() {
        return;
    }
    let ids: Vec<String> = removed.iter().map(|r| r.id.to_string()).collect();
    println!(
        "  {} {} old backup(s): {}",
        if dry_run { "would remove" } else { "removed" },
        removed.len(),
        ids.join(", ")
    );
}

/// Collect backups per project and target, newest first
pub async fn collect(
    ctx: &Context,
    only_project: Option<&str>,
    only_target: Option<&str>,
) -> anyhow::Result<Vec<ListedBackup>> {
    let mut listed = Vec::new();

    for project in ctx.settings.select_projects(only_project)? {
        for target in ctx.settings.targets_for(project, only_target)? {
            let orchestrator = Arc::clone(&ctx.orchestrator);
            let backup_target = target.target.clone();
            let name = project.spec.name.clone();
            let records = blocking(move || orchestrator.list_backups(&backup_target, &name)).await?;

            listed.extend(records.into_iter().map(|record| ListedBackup {
                project: project.spec.name.clone(),
                target: target.target.name().to_string(),
                created_at: record.id.timestamp().map(|t| t.to_rfc3339()),
                id: record.id,
                path: record.storage_path,
            }));
        }
    }

    Ok(listed)
}

pub async fn list(ctx: &Context, args: ListArgs) -> anyhow::Result<bool> {
    let listed = collect(ctx, args.project.as_deref(), args.target.as_deref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(true);
    }

    if listed.is_empty() {
        println!("No backups found");
        return Ok(true);
    }

    let mut current: Option<(&str, &str)> = None;
    for entry in &listed {
        let group = (entry.project.as_str(), entry.target.as_str());
        if current != Some(group) {
            println!("{} @ {}", entry.project, entry.target);
            current = Some(group);
        }
        println!("  {}  {}", entry.id, entry.path.display());
    }

    Ok(true)
}

/// Target a restore reads from: the named one, or the project's first local target
fn restore_target<'a>(
    settings: &'a Settings,
    project: &ProjectSettings,
    name: Option<&str>,
) -> anyhow::Result<&'a TargetSettings> {
    if let Some(name) = name {
        let targets = settings.targets_for(project, Some(name))?;
        return targets
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("unknown target '{}'", name));
    }

    settings
        .targets_for(project, None)?
        .into_iter()
        .find(|t| matches!(t.target, BackupTarget::Local { .. }))
        .ok_or_else(|| anyhow!("project '{}' has no local target to restore from", project.spec.name))
}

pub async fn restore(ctx: &Context, args: RestoreArgs) -> anyhow::Result<bool> {
    let project = ctx.settings.project(&args.project)?;
    let target = restore_target(&ctx.settings, project, args.target.as_deref())?;

    let orchestrator = Arc::clone(&ctx.orchestrator);
    let backup_target = target.target.clone();
    let name = project.spec.name.clone();
    let requested = args.backup.clone();
    let record = blocking(move || {
        if requested == "latest" {
            orchestrator.catalog().latest(&backup_target, &name)
        } else {
            let id = BackupId::parse(&requested)?;
            orchestrator.catalog().find(&backup_target, &name, &id)
        }
    })
    .await?;

    let Some(record) = record else {
        bail!(
            "backup '{}' of project '{}' not found on target '{}'",
            args.backup,
            project.spec.name,
            target.target.name()
        );
    };

    let destination = absolute(&args.destination)?;
    let orchestrator = Arc::clone(&ctx.orchestrator);
    let source = record.storage_path.clone();
    let dest = destination.clone();
    let dry_run = args.dry_run;
    let stats = blocking(move || orchestrator.restore_backup(&source, &dest, dry_run)).await?;

    println!(
        "{}Restored {} of '{}' into {}: {} files, {}",
        dry_run_tag(dry_run),
        record.id,
        project.spec.name,
        destination.display(),
        stats.files_copied,
        format_bytes(stats.bytes_copied)
    );

    Ok(true)
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

pub async fn prune(ctx: &Context, args: PruneArgs) -> anyhow::Result<bool> {
    let mut failed = 0usize;

    for project in ctx.settings.select_projects(args.project.as_deref())? {
        for target in ctx.settings.targets_for(project, args.target.as_deref())? {
            let keep = args.keep.map(|k| k as usize).unwrap_or(target.max_backups);
            let orchestrator = Arc::clone(&ctx.orchestrator);
            let backup_target = target.target.clone();
            let name = project.spec.name.clone();
            let dry_run = args.dry_run;

            match blocking(move || orchestrator.apply_retention(&backup_target, &name, keep, dry_run)).await {
                Ok(removed) => {
                    println!(
                        "{}{} @ {}: keeping {}, {} to remove",
                        dry_run_tag(dry_run),
                        project.spec.name,
                        target.target.name(),
                        keep,
                        removed.len()
                    );
                    print_removed(&removed, dry_run);
                }
                Err(e) => {
                    tracing::error!(project = %project.spec.name, target = %target.target.name(), "Prune failed: {:#}", e);
                    failed += 1;
                }
            }
        }
    }

    Ok(failed == 0)
}

pub fn init(args: &InitArgs) -> anyhow::Result<bool> {
    if args.path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            args.path.display()
        );
    }
    std::fs::write(&args.path, STARTER_CONFIG)?;
    println!("Wrote starter configuration to {}", args.path.display());
    Ok(true)
}

pub fn validate(config_path: &Path, settings: &Settings) -> anyhow::Result<bool> {
    println!("Configuration {} is valid", config_path.display());
    for target in &settings.targets {
        println!(
            "  target {} ({}), keeps {} backups",
            target.target.name(),
            target.target.kind(),
            target.max_backups
        );
    }
    for project in &settings.projects {
        println!(
            "  project {} -> {} [{}], {} exclude pattern(s)",
            project.spec.name,
            project.spec.root_path.display(),
            project.targets.join(", "),
            project.spec.exclude_patterns.len()
        );
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use backup_engine::report::NullReporter;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        ctx: Context,
    }

    fn fixture() -> Fixture {
        let root = TempDir::new().unwrap();
        let project_dir = root.path().join("site");
        fs::create_dir_all(project_dir.join("node_modules")).unwrap();
        fs::write(project_dir.join("index.html"), b"<html></html>").unwrap();
        fs::write(project_dir.join("node_modules/dep.js"), b"//").unwrap();

        let config: Config = toml::from_str(&format!(
            r#"
            [defaults]
            max_backups = 2
            exclude = ["node_modules"]

            [[targets]]
            name = "local"
            path = "{backups}"

            [[targets]]
            name = "nas"
            kind = "remote"
            path = "/volume1"

            [[projects]]
            name = "site"
            path = "{project}"
            "#,
            backups = root.path().join("backups").display(),
            project = project_dir.display(),
        ))
        .unwrap();

        Fixture {
            ctx: Context {
                settings: config.validate().unwrap(),
                orchestrator: Arc::new(BackupOrchestrator::local(Arc::new(NullReporter))),
            },
            root,
        }
    }

    fn backup_args() -> BackupArgs {
        BackupArgs {
            project: Some("site".to_string()),
            all: false,
            target: None,
            dry_run: false,
            no_prune: false,
        }
    }

    #[tokio::test]
    async fn test_backup_skips_remote_and_succeeds() -> anyhow::Result<()> {
        let fx = fixture();

        assert!(backup(&fx.ctx, backup_args()).await?);

        let listed = collect(&fx.ctx, Some("site"), Some("local")).await?;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].path.join("index.html").is_file());
        assert!(!listed[0].path.join("node_modules").exists());
        assert!(listed[0].created_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_dry_run_backup_writes_nothing() -> anyhow::Result<()> {
        let fx = fixture();
        let args = BackupArgs {
            dry_run: true,
            ..backup_args()
        };

        assert!(backup(&fx.ctx, args).await?);
        assert!(!fx.root.path().join("backups").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_prune_and_restore() -> anyhow::Result<()> {
        let fx = fixture();
        let project_root = fx.root.path().join("backups/site");
        for id in ["2024-01-01T00-00-01Z", "2024-01-01T00-00-02Z", "2024-01-01T00-00-03Z"] {
            fs::create_dir_all(project_root.join(id)).unwrap();
            fs::write(project_root.join(id).join("marker.txt"), id).unwrap();
        }

        let pruned = prune(
            &fx.ctx,
            PruneArgs {
                project: None,
                target: Some("local".to_string()),
                keep: Some(1),
                dry_run: false,
            },
        )
        .await?;
        assert!(pruned);
        let remaining = collect(&fx.ctx, None, Some("local")).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id.as_str(), "2024-01-01T00-00-03Z");

        let destination = fx.root.path().join("restored");
        restore(
            &fx.ctx,
            RestoreArgs {
                project: "site".to_string(),
                backup: "latest".to_string(),
                destination: destination.clone(),
                target: None,
                dry_run: false,
            },
        )
        .await?;
        assert_eq!(fs::read_to_string(destination.join("marker.txt")).unwrap(), "2024-01-01T00-00-03Z");

        let again = restore(
            &fx.ctx,
            RestoreArgs {
                project: "site".to_string(),
                backup: "2024-01-01T00-00-03Z".to_string(),
                destination,
                target: None,
                dry_run: true,
            },
        )
        .await;
        let err = again.unwrap_err();
        assert!(matches!(err.downcast_ref::<BackupError>(), Some(BackupError::DestinationExists(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_unknown_backup_fails() {
        let fx = fixture();
        let args = |backup: &str| RestoreArgs {
            project: "site".to_string(),
            backup: backup.to_string(),
            destination: fx.root.path().join("out"),
            target: None,
            dry_run: false,
        };

        assert!(restore(&fx.ctx, args("2024-01-01T00-00-00Z")).await.is_err());
        assert!(restore(&fx.ctx, args("latest")).await.is_err());
        let invalid = restore(&fx.ctx, args("yesterday")).await.unwrap_err();
        assert!(matches!(invalid.downcast_ref::<BackupError>(), Some(BackupError::InvalidBackupId(_))));
        assert!(!fx.root.path().join("out").exists());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("project-backup.toml");
        let args = InitArgs {
            path: path.clone(),
            force: false,
        };

        assert!(init(&args).unwrap());
        assert!(init(&args).is_err());
        assert!(init(&InitArgs { path: path.clone(), force: true }).unwrap());
        assert_eq!(fs::read_to_string(path).unwrap(), STARTER_CONFIG);
    }
}
