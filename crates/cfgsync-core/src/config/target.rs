//! Target environments: live directories the repository is mirrored into

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A named root directory, one per agent host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEnvironment {
    pub name: String,
    pub root: PathBuf,
}

impl TargetEnvironment {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Whether the root exists on this machine. Absent environments are
    /// skipped, never created.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Directory within the root that mirrors a category (`""` is the root).
    pub fn category_dir(&self, target_dir: &str) -> PathBuf {
        if target_dir.is_empty() {
            self.root.clone()
        } else {
            self.root.join(target_dir)
        }
    }
}

/// Target entry as written in `config.toml` or on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub root: String,
}

impl TargetSpec {
    pub fn resolve(&self) -> TargetEnvironment {
        TargetEnvironment::new(self.name.clone(), expand_home(&self.root))
    }
}

impl FromStr for TargetSpec {
    type Err = Error;

    /// Parses `name=path`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidTarget {
            spec: s.to_string(),
        };
        let (name, root) = s.split_once('=').ok_or_else(invalid)?;
        let (name, root) = (name.trim(), root.trim());
        if name.is_empty() || root.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            root: root.to_string(),
        })
    }
}

/// Hosts mirrored when no targets are configured.
pub fn default_targets() -> Vec<TargetSpec> {
    [("claude", "~/.claude"), ("codex", "~/.codex")]
        .into_iter()
        .map(|(name, root)| TargetSpec {
            name: name.to_string(),
            root: root.to_string(),
        })
        .collect()
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => Path::new(p).to_path_buf(),
    }
}
