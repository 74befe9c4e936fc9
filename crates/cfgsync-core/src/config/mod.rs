//! Configuration: target environments and per-category layout/rules
//!
//! Configuration is optional. Without a file, skills/agents/rules/settings
//! use the built-in layout and the repository is mirrored into `~/.claude`
//! and `~/.codex`.

mod category;
mod manifest;
mod target;

pub use category::{CategoryOverride, CategorySpec, RuleSet};
pub use manifest::{ConfigFile, SyncConfig};
pub use target::{TargetEnvironment, TargetSpec, default_targets, expand_home};
