//! Aggregate result of a sync operation

use std::path::PathBuf;

use serde::Serialize;

use super::plan::ActionKind;
use crate::backup::BackupId;
use crate::error::{Error, FailureKind};
use crate::item::ItemKey;

/// Mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Install,
    Add,
    Remove,
    Push,
    Pull,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Push => "push",
            Operation::Pull => "pull",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Dry-run: would be executed
    Planned,
    Done,
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn failed(error: &Error) -> Self {
        Outcome::Failed {
            kind: error.failure_kind(),
            message: error.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// One (item, environment, action) line of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub item: ItemKey,
    pub environment: Option<String>,
    pub action: ActionKind,
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// Report from a sync operation
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub operation: Operation,
    pub dry_run: bool,
    /// Backup taken before mutating, if any
    pub backup: Option<BackupId>,
    pub rows: Vec<ReportRow>,
    /// Entries already in the desired state
    pub unchanged: usize,
    pub notes: Vec<String>,
}

impl SyncReport {
    /// Whether every row succeeded
    pub fn success(&self) -> bool {
        !self.rows.iter().any(|row| row.outcome.is_failure())
    }

    /// Rows that changed (or would change) something
    pub fn changes(&self) -> usize {
        self.rows.iter().filter(|row| !row.outcome.is_failure()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|row| row.outcome.is_failure())
    }

    /// The (item, environment, action, path) of every row, ignoring outcome.
    /// A dry-run and the matching real run agree on this.
    pub fn actions(&self) -> Vec<(ItemKey, Option<String>, ActionKind, PathBuf)> {
        self.rows
            .iter()
            .map(|row| {
                (
                    row.item.clone(),
                    row.environment.clone(),
                    row.action,
                    row.path.clone(),
                )
            })
            .collect()
    }
}
