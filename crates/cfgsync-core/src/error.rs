//! Error types for cfgsync-core

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::item::{Category, ItemKey};
use crate::validate::Violation;

/// Result type for cfgsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cfgsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Target exists and is not the expected managed link
    #[error("Path occupied: {path} is a {occupant} the engine does not own")]
    PathOccupied { path: PathBuf, occupant: String },

    /// Attempt to remove or replace an entry the engine did not create
    #[error("Not managed: {path} is not a link into the repository")]
    NotManaged { path: PathBuf },

    /// Repository copy kept because a target link to it could not be removed
    #[error("Kept {path}: a target still links to it")]
    StillLinked { path: PathBuf },

    /// Candidate item violates its category's metadata rules
    #[error("Validation failed for {item}: {}", join_violations(.violations))]
    ValidationFailed {
        item: ItemKey,
        violations: Vec<Violation>,
    },

    /// No repository or target entry matches the requested item
    #[error("No {category} named '{name}' found")]
    ItemNotFound { category: Category, name: String },

    /// Backup archive unreadable or failing integrity checks
    #[error("Backup {id} is corrupt: {reason}")]
    BackupCorrupt { id: String, reason: String },

    /// Requested backup id does not exist
    #[error("Backup {id} not found")]
    BackupNotFound { id: String },

    /// `undo` with an empty backup store
    #[error("No backups available")]
    NoBackups,

    /// User-supplied identifier is unusable as a path component
    #[error("Invalid name: {message}")]
    InvalidName { message: String },

    /// Unknown category name
    #[error("Unknown category '{name}' (expected skill, agent, rule, or setting)")]
    UnknownCategory { name: String },

    /// Malformed `name=path` target specification
    #[error("Invalid target '{spec}': expected <name>=<path>")]
    InvalidTarget { spec: String },

    /// Repository root missing or unreadable
    #[error("Repository not found at {path}")]
    RepositoryNotFound { path: PathBuf },

    /// Filesystem error from cfgsync-fs
    #[error(transparent)]
    Fs(#[from] cfgsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Coarse classification of per-item failures, stable for scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PathOccupied,
    NotManaged,
    StillLinked,
    ValidationFailed,
    NotFound,
    Io,
}

impl Error {
    /// Classify this error for a report row.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::PathOccupied { .. } => FailureKind::PathOccupied,
            Error::NotManaged { .. } => FailureKind::NotManaged,
            Error::StillLinked { .. } => FailureKind::StillLinked,
            Error::ValidationFailed { .. } => FailureKind::ValidationFailed,
            Error::ItemNotFound { .. } => FailureKind::NotFound,
            _ => FailureKind::Io,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::PathOccupied => "path occupied",
            FailureKind::NotManaged => "not managed",
            FailureKind::StillLinked => "still linked",
            FailureKind::ValidationFailed => "validation failed",
            FailureKind::NotFound => "not found",
            FailureKind::Io => "i/o error",
        };
        f.write_str(label)
    }
}
