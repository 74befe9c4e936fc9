//! Core synchronization layer for cfgsync
//!
//! This crate mirrors a repository of configuration items (skills, agents,
//! rules, settings) into target environments through symlinks, implementing:
//!
//! - **Inventory**: Fresh classification of every (item, environment) pair
//!   as tracked, local-only, missing, or broken
//! - **Validation**: Header rules per category, all violations at once
//! - **Symlink management**: Link and unlink with ownership checks
//! - **Backups**: Append-only, sequence-numbered snapshots with undo
//! - **SyncEngine**: install, add, remove, push, pull with dry-run support
//!
//! # Architecture
//!
//! `cfgsync-core` sits above `cfgsync-fs` and below the CLI:
//!
//! ```text
//!      cfgsync-cli
//!           |
//!      cfgsync-core
//!           |
//!      cfgsync-fs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cfgsync_core::{SyncEngine, SyncOptions};
//!
//! fn example() -> cfgsync_core::Result<()> {
//!     let engine = SyncEngine::open(std::path::Path::new("/path/to/repo"))?;
//!     let report = engine.install(&SyncOptions::default())?;
//!     println!("{} links created", report.changes());
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod header;
pub mod inventory;
pub mod item;
pub mod link;
pub mod reporter;
pub mod sync;
pub mod validate;

pub use backup::{BackupId, BackupManager, BackupRecord, BackupSummary, RestoreOutcome};
pub use config::{CategorySpec, ConfigFile, RuleSet, SyncConfig, TargetEnvironment, TargetSpec};
pub use error::{Error, FailureKind, Result};
pub use inventory::{InventorySnapshot, LinkEntry, LinkState, scan};
pub use item::{Category, ConfigItem, ItemKey};
pub use link::LinkOutcome;
pub use sync::{Operation, Outcome, ReportRow, SyncEngine, SyncOptions, SyncReport};
pub use validate::{ValidationReport, Violation, validate_item};
