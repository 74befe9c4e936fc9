//! CLI argument parsing using clap derive

use std::path::PathBuf;

use cfgsync_core::{BackupId, Category, TargetSpec};
use clap::{Parser, Subcommand};

/// cfgsync - Mirror a repository of agent configuration into host environments
#[derive(Parser, Debug)]
#[command(name = "cfgsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository root (defaults to the nearest directory with .cfgsync/ or skills/)
    #[arg(long, global = true, env = "CFGSYNC_REPO", value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Target environment as NAME=PATH; replaces the configured targets
    #[arg(long = "target", global = true, value_name = "NAME=PATH")]
    pub targets: Vec<TargetSpec>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Link every repository item into every target environment
    Install {
        /// Show what would change without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect and reconcile repository and environments
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

/// `sync` subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Show the state of every item in every environment
    Status,

    /// Bring one item under management and link it everywhere
    ///
    /// Examples:
    ///   cfgsync sync add skill foo
    ///   cfgsync sync add agents reviewer --dry-run
    Add {
        /// skill, agent, rule or setting
        category: Category,
        /// Item name (extension optional)
        name: String,
        #[arg(long)]
        dry_run: bool,
    },

    /// Unlink one item from every environment
    Remove {
        category: Category,
        name: String,
        /// Also delete the repository copy
        #[arg(long)]
        purge: bool,
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy edited local copies into the repository and relink them
    Push {
        #[arg(long)]
        dry_run: bool,
    },

    /// Link missing items, repair broken links, prune stale links
    Pull {
        #[arg(long)]
        dry_run: bool,
    },

    /// Check every repository item against its category rules
    Validate,

    /// List backups
    Backups {
        /// Delete all but the newest KEEP backups
        #[arg(long, value_name = "KEEP")]
        prune: Option<usize>,
    },

    /// Restore the newest backup, or the one given
    Undo {
        /// Backup id (e.g. 3 or 000003)
        id: Option<BackupId>,
    },
}
