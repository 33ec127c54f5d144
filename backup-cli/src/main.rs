//! project-backup - Main entry point
//!
//! Timestamped backups of project directories to local targets.

mod cli;
mod commands;
mod config;
mod format;
mod logger;

use anyhow::Result;
use backup_engine::report::TracingReporter;
use backup_engine::BackupOrchestrator;
use clap::Parser;
use std::sync::Arc;

use crate::cli::{Cli, Command};
use crate::commands::Context;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // `init` runs before any configuration exists
    if let Command::Init(init) = &args.command {
        logger::init(args.log_level.as_deref().unwrap_or("info"))?;
        commands::init(init)?;
        return Ok(());
    }

    // Load configuration
    let (config_path, config) = Config::load(args.config.as_deref())?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    logger::init(log_level)?;

    tracing::debug!(
        "Starting project-backup v{} (config: {})",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    let settings = config.validate()?;
    let ctx = Context {
        settings,
        orchestrator: Arc::new(BackupOrchestrator::local(Arc::new(TracingReporter))),
    };

    let ok = match args.command {
        Command::Backup(backup) => commands::backup(&ctx, backup).await?,
        Command::List(list) => commands::list(&ctx, list).await?,
        Command::Restore(restore) => commands::restore(&ctx, restore).await?,
        Command::Prune(prune) => commands::prune(&ctx, prune).await?,
        Command::Validate => commands::validate(&config_path, &ctx.settings)?,
        Command::Init(init) => commands::init(&init)?,
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}
