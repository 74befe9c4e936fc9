//! Backup records as stored in `backup.toml`

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Monotonic sequence id of a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(u64);

impl BackupId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for BackupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for BackupId {
    type Err = Error;

    /// Accepts `3`, `000003`, or a full archive name `000003-20250101T000000Z`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.split('-').next().unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| Error::BackupNotFound { id: s.to_string() })
    }
}

/// State of one path at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapturedState {
    /// Nothing existed; restore removes whatever is there
    Absent,
    File { payload: String, checksum: String },
    Dir { payload: String, checksum: String },
    /// Raw link target, never dereferenced
    Symlink { target: PathBuf },
}

impl CapturedState {
    /// Payload name and expected checksum, for states that carry content.
    pub fn payload(&self) -> Option<(&str, &str)> {
        match self {
            CapturedState::File { payload, checksum } | CapturedState::Dir { payload, checksum } => {
                Some((payload, checksum))
            }
            _ => None,
        }
    }
}

/// One captured path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedEntry {
    /// Absolute path the state belongs to
    pub path: PathBuf,
    pub state: CapturedState,
}

/// Immutable record of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: BackupId,
    pub created: DateTime<Utc>,
    /// Operation that triggered the snapshot
    pub label: String,
    #[serde(default)]
    pub entries: Vec<CapturedEntry>,
}

/// Listing row for one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupSummary {
    pub id: BackupId,
    pub created: DateTime<Utc>,
    pub label: String,
    pub entries: usize,
    /// Archive directory
    pub path: PathBuf,
    /// Set when `backup.toml` could not be read
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3", 3)]
    #[case("000003", 3)]
    #[case("000012-20250101T120000Z", 12)]
    #[case(" 7 ", 7)]
    fn parses_id_forms(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(input.parse::<BackupId>().unwrap(), BackupId::new(expected));
    }

    #[test]
    fn rejects_garbage_id() {
        assert!(matches!(
            "latest".parse::<BackupId>(),
            Err(Error::BackupNotFound { .. })
        ));
    }

    #[test]
    fn id_displays_zero_padded() {
        assert_eq!(BackupId::new(42).to_string(), "000042");
        assert_eq!(BackupId::new(1).next(), BackupId::new(2));
    }

    #[test]
    fn record_survives_toml() {
        let record = BackupRecord {
            id: BackupId::new(1),
            created: Utc::now(),
            label: "remove".into(),
            entries: vec![
                CapturedEntry {
                    path: "/host/skills/foo".into(),
                    state: CapturedState::Symlink {
                        target: "/repo/skills/foo".into(),
                    },
                },
                CapturedEntry {
                    path: "/repo/skills/foo".into(),
                    state: CapturedState::Dir {
                        payload: "1".into(),
                        checksum: "sha256:00".into(),
                    },
                },
                CapturedEntry {
                    path: "/host/skills/new".into(),
                    state: CapturedState::Absent,
                },
            ],
        };

        let text = toml::to_string_pretty(&record).unwrap();
        let parsed: BackupRecord = toml::from_str(&text).unwrap();
        assert_eq!(parsed, record);
    }
}
