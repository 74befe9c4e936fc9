//! Backup and restore of path states
//!
//! Every destructive operation snapshots the paths it is about to touch
//! before touching them. Archives are stored at
//! `.cfgsync/backups/<seq>-<timestamp>/` with:
//! - backup.toml: id, creation time, label, and the captured state of each path
//! - payload/<n>: copies of captured files and directories
//!
//! Archives are immutable once published and only removed by an explicit
//! prune.

mod record;
mod store;

pub use record::{BackupId, BackupRecord, BackupSummary, CapturedEntry, CapturedState};
pub use store::{BackupManager, RestoreOutcome};
