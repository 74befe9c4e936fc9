//! Well-known paths inside a cfgsync repository.

use std::path::Path;

/// Standard cfgsync filesystem markers and paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPath {
    /// The `.cfgsync` state directory at the repository root
    StateDir,
    /// `config.toml` inside the state directory
    ConfigFile,
    /// `backups` inside the state directory
    BackupsDir,
    /// `lock` inside the state directory
    LockFile,
    /// Record file inside each backup archive
    BackupRecord,
    /// Directory holding captured content inside each backup archive
    BackupPayload,
}

impl SyncPath {
    /// Get the string representation of the path component.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDir => ".cfgsync",
            Self::ConfigFile => "config.toml",
            Self::BackupsDir => "backups",
            Self::LockFile => "lock",
            Self::BackupRecord => "backup.toml",
            Self::BackupPayload => "payload",
        }
    }
}

impl AsRef<Path> for SyncPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for SyncPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for SyncPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
