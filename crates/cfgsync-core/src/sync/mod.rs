//! SyncEngine for mirroring the repository into target environments
//!
//! This module provides:
//! - **plan**: Steps computed from a fresh inventory before any mutation
//! - **report**: Per-row outcomes of an operation, shared by dry-run and real runs
//! - **engine**: install, add, remove, push, pull, validate, backups, undo

mod engine;
mod plan;
mod report;

pub use engine::{SyncEngine, SyncOptions};
pub use plan::{Action, ActionKind, Plan, Step};
pub use report::{Operation, Outcome, ReportRow, SyncReport};
