//! Filesystem primitives for cfgsync
//!
//! Provides normalized path handling, atomic and lock-guarded I/O, entry
//! inspection that never follows symlinks, and content checksums.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use constants::SyncPath;
pub use error::{Error, Result};
pub use io::{EntryKind, LockGuard, RobustnessConfig};
pub use path::{NormalizedPath, validate_path_identifier};
