//! Per-category layout and validation rules

use serde::{Deserialize, Serialize};

use crate::item::Category;

/// Metadata rules a candidate item must satisfy before entering the
/// repository. Empty rule sets accept anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleSet {
    /// The primary document must start with a front-matter header
    pub require_header: bool,
    /// Header fields that must be present and non-blank
    pub required_fields: Vec<String>,
    /// The header's `name` must equal the item identifier
    pub name_matches_identifier: bool,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        !self.require_header && self.required_fields.is_empty() && !self.name_matches_identifier
    }
}

/// Resolved layout and rules for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub category: Category,
    /// Subdirectory of the repository holding the items
    pub repo_dir: String,
    /// Subdirectory of each target root; empty means the root itself
    pub target_dir: String,
    /// Primary document inside a directory item
    pub document: Option<String>,
    /// A file item is its own primary document
    pub file_items_are_documents: bool,
    /// Enumerate unknown target entries as LocalOnly
    pub scan_local: bool,
    pub rules: RuleSet,
}

impl CategorySpec {
    /// Built-in defaults for `category`.
    pub fn builtin(category: Category) -> Self {
        let header_rules = |match_name: bool| RuleSet {
            require_header: true,
            required_fields: vec!["name".to_string(), "description".to_string()],
            name_matches_identifier: match_name,
        };

        match category {
            Category::Skill => Self {
                category,
                repo_dir: "skills".into(),
                target_dir: "skills".into(),
                document: Some("SKILL.md".into()),
                file_items_are_documents: false,
                scan_local: true,
                rules: header_rules(true),
            },
            Category::Agent => Self {
                category,
                repo_dir: "agents".into(),
                target_dir: "agents".into(),
                document: Some("AGENT.md".into()),
                file_items_are_documents: true,
                scan_local: true,
                rules: header_rules(false),
            },
            Category::Rule => Self {
                category,
                repo_dir: "rules".into(),
                target_dir: "rules".into(),
                document: None,
                file_items_are_documents: false,
                scan_local: true,
                rules: RuleSet::default(),
            },
            Category::Setting => Self {
                category,
                repo_dir: "settings".into(),
                target_dir: String::new(),
                document: None,
                file_items_are_documents: false,
                scan_local: false,
                rules: RuleSet::default(),
            },
        }
    }

    /// Apply user overrides field by field.
    pub fn apply(&mut self, overrides: &CategoryOverride) {
        if let Some(dir) = &overrides.repo_dir {
            self.repo_dir = dir.clone();
        }
        if let Some(dir) = &overrides.target_dir {
            self.target_dir = dir.clone();
        }
        if let Some(document) = &overrides.document {
            self.document = (!document.is_empty()).then(|| document.clone());
        }
        if let Some(flag) = overrides.file_items_are_documents {
            self.file_items_are_documents = flag;
        }
        if let Some(flag) = overrides.scan_local {
            self.scan_local = flag;
        }
        if let Some(flag) = overrides.require_header {
            self.rules.require_header = flag;
        }
        if let Some(fields) = &overrides.required_fields {
            self.rules.required_fields = fields.clone();
        }
        if let Some(flag) = overrides.name_matches_identifier {
            self.rules.name_matches_identifier = flag;
        }
    }
}

/// Partial category settings as written in `config.toml`.
///
/// An empty `document` string disables the primary document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryOverride {
    pub repo_dir: Option<String>,
    pub target_dir: Option<String>,
    pub document: Option<String>,
    pub file_items_are_documents: Option<bool>,
    pub scan_local: Option<bool>,
    pub require_header: Option<bool>,
    pub required_fields: Option<Vec<String>>,
    pub name_matches_identifier: Option<bool>,
}
