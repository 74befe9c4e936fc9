//! Configuration item identity

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Kind of configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Skill,
    Agent,
    Rule,
    Setting,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Skill,
        Category::Agent,
        Category::Rule,
        Category::Setting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Skill => "skill",
            Category::Agent => "agent",
            Category::Rule => "rule",
            Category::Setting => "setting",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts singular and plural spellings (`skill`, `skills`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        match singular {
            "skill" => Ok(Category::Skill),
            "agent" => Ok(Category::Agent),
            "rule" => Ok(Category::Rule),
            "setting" => Ok(Category::Setting),
            _ => Err(Error::UnknownCategory {
                name: s.to_string(),
            }),
        }
    }
}

/// Identity of a configuration item: unique per category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub category: Category,
    pub name: String,
}

impl ItemKey {
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }

    /// The name without a file extension (`reviewer.md` -> `reviewer`).
    pub fn stem(&self) -> &str {
        name_stem(&self.name)
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Strip the last extension from an entry name. Leading-dot names are
/// returned unchanged.
pub fn name_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Whether `entry` is the entry a user means by `query`: an exact name match
/// or a match on the extension-less stem.
pub fn name_matches(entry: &str, query: &str) -> bool {
    entry == query || name_stem(entry) == query
}

/// An item present in the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigItem {
    pub key: ItemKey,
    /// Absolute path of the item inside the repository
    pub path: PathBuf,
}

impl ConfigItem {
    pub fn new(key: ItemKey, path: impl Into<PathBuf>) -> Self {
        Self {
            key,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
