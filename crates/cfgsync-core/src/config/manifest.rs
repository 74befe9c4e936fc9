//! Repository configuration parsed from `.cfgsync/config.{toml,json,yaml}`
//!
//! Every field is optional. Missing targets fall back to the built-in host
//! list; category entries override the built-in layout field by field.

use std::collections::BTreeMap;
use std::path::Path;

use cfgsync_fs::{ConfigStore, NormalizedPath, SyncPath};
use serde::{Deserialize, Serialize};

use super::category::{CategoryOverride, CategorySpec};
use super::target::{TargetEnvironment, TargetSpec, default_targets};
use crate::Result;
use crate::item::Category;

/// Raw configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub targets: Option<Vec<TargetSpec>>,
    pub categories: BTreeMap<Category, CategoryOverride>,
}

/// Resolved configuration: concrete targets and one spec per category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub targets: Vec<TargetEnvironment>,
    categories: Vec<CategorySpec>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_file(&ConfigFile::default())
    }
}

impl SyncConfig {
    /// Resolve a parsed configuration file against the built-in defaults.
    pub fn from_file(file: &ConfigFile) -> Self {
        let targets = file
            .targets
            .clone()
            .unwrap_or_else(default_targets)
            .iter()
            .map(TargetSpec::resolve)
            .collect();

        let categories = Category::ALL
            .iter()
            .map(|&category| {
                let mut spec = CategorySpec::builtin(category);
                if let Some(overrides) = file.categories.get(&category) {
                    spec.apply(overrides);
                }
                spec
            })
            .collect();

        Self {
            targets,
            categories,
        }
    }

    /// Load `<root>/.cfgsync/config.*`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let state_dir = NormalizedPath::new(root).join(SyncPath::StateDir.as_str());
        let store = ConfigStore::new();

        for name in ["config.toml", "config.json", "config.yaml", "config.yml"] {
            let path = state_dir.join(name);
            if let Some(file) = store.load_optional::<ConfigFile>(&path)? {
                tracing::debug!(path = %path, "loaded configuration");
                return Ok(Self::from_file(&file));
            }
        }

        tracing::debug!("no configuration file, using defaults");
        Ok(Self::default())
    }

    /// Replace the target list (command-line overrides).
    pub fn with_targets(mut self, targets: Vec<TargetEnvironment>) -> Self {
        self.targets = targets;
        self
    }

    /// Layout and rules for `category`.
    pub fn category(&self, category: Category) -> &CategorySpec {
        // Built from Category::ALL in declaration order
        &self.categories[category as usize]
    }

    pub fn categories(&self) -> &[CategorySpec] {
        &self.categories
    }
}
