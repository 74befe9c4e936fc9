//! Planned mutations
//!
//! Every mutating operation is computed as a `Plan` from a fresh inventory
//! before anything is touched. Dry-run reports the plan; a real run takes a
//! backup of `backup_paths()` and executes exactly these steps.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::report::{Operation, Outcome, ReportRow};
use crate::Error;
use crate::item::ItemKey;

/// One filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create a link at `target` (nothing there yet)
    Link { source: PathBuf, target: PathBuf },
    /// Replace a foreign symlink at `target`
    Relink { source: PathBuf, target: PathBuf },
    /// Remove the managed link at `target`
    Unlink { source: PathBuf, target: PathBuf },
    /// Remove a dangling link into the repository
    Prune { target: PathBuf },
    /// Copy a real local entry into the repository and link it back
    Adopt { from: PathBuf, into: PathBuf },
    /// Delete the repository copy of an item
    Delete { path: PathBuf },
}

/// Action label used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Link,
    Relink,
    Unlink,
    Prune,
    Adopt,
    Delete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActionKind::Link => "link",
            ActionKind::Relink => "relink",
            ActionKind::Unlink => "unlink",
            ActionKind::Prune => "prune",
            ActionKind::Adopt => "adopt",
            ActionKind::Delete => "delete",
        };
        f.write_str(label)
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Link { .. } => ActionKind::Link,
            Action::Relink { .. } => ActionKind::Relink,
            Action::Unlink { .. } => ActionKind::Unlink,
            Action::Prune { .. } => ActionKind::Prune,
            Action::Adopt { .. } => ActionKind::Adopt,
            Action::Delete { .. } => ActionKind::Delete,
        }
    }

    /// Anything other than creating a link into an empty slot destroys or
    /// replaces existing state.
    pub fn is_destructive(&self) -> bool {
        !matches!(self, Action::Link { .. })
    }

    /// The path shown in reports.
    pub fn path(&self) -> &Path {
        match self {
            Action::Link { target, .. }
            | Action::Relink { target, .. }
            | Action::Unlink { target, .. }
            | Action::Prune { target } => target,
            Action::Adopt { from, .. } => from,
            Action::Delete { path } => path,
        }
    }

    /// Every path this action mutates.
    pub fn touched(&self) -> Vec<&Path> {
        match self {
            Action::Link { target, .. }
            | Action::Relink { target, .. }
            | Action::Unlink { target, .. }
            | Action::Prune { target } => vec![target],
            Action::Adopt { from, into } => vec![into, from],
            Action::Delete { path } => vec![path],
        }
    }
}

/// A planned action for one item in one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub item: ItemKey,
    /// `None` for repository-side actions
    pub environment: Option<String>,
    pub action: Action,
}

impl Step {
    /// Report row for this step with the given outcome.
    pub fn row(&self, outcome: Outcome) -> ReportRow {
        ReportRow {
            item: self.item.clone(),
            environment: self.environment.clone(),
            action: self.action.kind(),
            path: self.action.path().to_path_buf(),
            outcome,
        }
    }
}

/// Steps to execute plus the per-item failures already known at planning
/// time.
#[derive(Debug, Clone)]
pub struct Plan {
    pub operation: Operation,
    pub steps: Vec<Step>,
    pub failures: Vec<ReportRow>,
    /// Entries already in the desired state
    pub unchanged: usize,
}

impl Plan {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            steps: Vec::new(),
            failures: Vec::new(),
            unchanged: 0,
        }
    }

    pub fn push(&mut self, item: &ItemKey, environment: Option<&str>, action: Action) {
        self.steps.push(Step {
            item: item.clone(),
            environment: environment.map(str::to_string),
            action,
        });
    }

    /// Record a failure that prevents an action from being planned.
    pub fn fail(
        &mut self,
        item: &ItemKey,
        environment: Option<&str>,
        action: ActionKind,
        path: &Path,
        error: &Error,
    ) {
        self.failures.push(ReportRow {
            item: item.clone(),
            environment: environment.map(str::to_string),
            action,
            path: path.to_path_buf(),
            outcome: Outcome::failed(error),
        });
    }

    pub fn is_destructive(&self) -> bool {
        self.steps.iter().any(|step| step.action.is_destructive())
    }

    /// Paths to snapshot before executing. Empty for purely additive plans;
    /// otherwise every touched path, so an undo also removes created links.
    pub fn backup_paths(&self) -> Vec<PathBuf> {
        if !self.is_destructive() {
            return Vec::new();
        }
        let mut paths: Vec<PathBuf> = Vec::new();
        for step in &self.steps {
            for path in step.action.touched() {
                if !paths.iter().any(|p| p == path) {
                    paths.push(path.to_path_buf());
                }
            }
        }
        paths
    }
}
