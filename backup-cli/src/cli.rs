//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Back up one project, or every project with --all
    Backup(BackupArgs),

    /// List existing backups, newest first
    List(ListArgs),

    /// Restore a backup into a new directory
    Restore(RestoreArgs),

    /// Remove backups beyond the retention limit
    Prune(PruneArgs),

    /// Write a starter configuration file
    Init(InitArgs),

    /// Load and check the configuration
    Validate,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Project to back up
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub project: Option<String>,

    /// Back up every configured project
    #[arg(long)]
    pub all: bool,

    /// Only back up to this target
    #[arg(short, long)]
    pub target: Option<String>,

    /// Report what would happen without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip pruning old backups afterwards
    #[arg(long)]
    pub no_prune: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Project to list (all projects when omitted)
    pub project: Option<String>,

    /// Only list this target
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Project the backup belongs to
    pub project: String,

    /// Backup id (e.g. 2024-03-01T09-15-42Z) or `latest`
    pub backup: String,

    /// Directory to restore into; must not exist yet
    pub destination: PathBuf,

    /// Target holding the backup (first local target of the project by default)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Check the restore without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Project to prune (all projects when omitted)
    pub project: Option<String>,

    /// Only prune this target
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of backups to keep, overriding the configuration
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub keep: Option<u64>,

    /// Report what would be removed without removing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the file
    #[arg(long, default_value = "project-backup.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_backup_requires_project_or_all() {
        assert!(Cli::try_parse_from(["project-backup", "backup"]).is_err());
        assert!(Cli::try_parse_from(["project-backup", "backup", "site", "--all"]).is_err());

        let cli = Cli::try_parse_from(["project-backup", "backup", "--all", "--dry-run"]).unwrap();
        match cli.command {
            Command::Backup(args) => {
                assert!(args.all);
                assert!(args.dry_run);
                assert!(args.project.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_prune_keep_must_be_positive() {
        assert!(Cli::try_parse_from(["project-backup", "prune", "--keep", "0"]).is_err());
        let cli = Cli::try_parse_from(["project-backup", "-c", "/etc/pb.toml", "prune", "site", "--keep", "2"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/pb.toml")));
        assert!(matches!(cli.command, Command::Prune(PruneArgs { keep: Some(2), .. })));
    }

    #[test]
    fn test_restore_positionals() {
        let cli = Cli::try_parse_from(["project-backup", "restore", "site", "latest", "/tmp/out", "--dry-run"]).unwrap();
        match cli.command {
            Command::Restore(args) => {
                assert_eq!(args.project, "site");
                assert_eq!(args.backup, "latest");
                assert_eq!(args.destination, PathBuf::from("/tmp/out"));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
