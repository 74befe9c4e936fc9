//! cfgsync CLI
//!
//! Mirrors a repository of skills, agents, rules and settings into host
//! environments through symlinks.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, SyncAction};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = context::open_engine(cli.repo.as_deref(), &cli.targets)?;
    let json = cli.json;

    match cli.command {
        Commands::Install { dry_run } => commands::run_install(&engine, dry_run, json),
        Commands::Sync { action } => match action {
            SyncAction::Status => commands::run_status(&engine, json),
            SyncAction::Add {
                category,
                name,
                dry_run,
            } => commands::run_add(&engine, category, &name, dry_run, json),
            SyncAction::Remove {
                category,
                name,
                purge,
                dry_run,
            } => commands::run_remove(&engine, category, &name, purge, dry_run, json),
            SyncAction::Push { dry_run } => commands::run_push(&engine, dry_run, json),
            SyncAction::Pull { dry_run } => commands::run_pull(&engine, dry_run, json),
            SyncAction::Validate => commands::run_validate(&engine, json),
            SyncAction::Backups { prune } => commands::run_backups(&engine, prune, json),
            SyncAction::Undo { id } => commands::run_undo(&engine, id, json),
        },
    }
}

/// `-v` forces debug; otherwise `RUST_LOG`, defaulting to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}
