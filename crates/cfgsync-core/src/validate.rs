//! Candidate item validation against per-category metadata rules
//!
//! Validation never stops at the first problem: every violated rule is
//! reported so one pass is enough to fix an item.

use std::path::{Path, PathBuf};

use cfgsync_fs::io::{EntryKind, entry_kind};
use cfgsync_fs::validate_path_identifier;
use serde::Serialize;

use crate::config::CategorySpec;
use crate::header::Header;
use crate::item::ItemKey;

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    InvalidName { message: String },
    MissingDocument { path: PathBuf },
    MissingHeader,
    MalformedHeader { message: String },
    MissingField { field: String },
    NameMismatch { expected: String, found: String },
    DuplicateName { other: String },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::InvalidName { message } => write!(f, "{message}"),
            Violation::MissingDocument { path } => {
                write!(f, "primary document {} not found", path.display())
            }
            Violation::MissingHeader => write!(f, "header block missing"),
            Violation::MalformedHeader { message } => write!(f, "malformed header: {message}"),
            Violation::MissingField { field } => write!(f, "header field '{field}' missing or empty"),
            Violation::NameMismatch { expected, found } => {
                write!(f, "header name '{found}' does not match identifier '{expected}'")
            }
            Violation::DuplicateName { other } => write!(f, "name collides with '{other}'"),
        }
    }
}

/// Every violation found for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub item: ItemKey,
    pub path: PathBuf,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Where the primary document of an item lives, if the category has one.
pub fn primary_document(path: &Path, spec: &CategorySpec) -> Option<PathBuf> {
    if path.is_file() {
        return spec.file_items_are_documents.then(|| path.to_path_buf());
    }
    spec.document.as_ref().map(|doc| path.join(doc))
}

/// Check the item at `path` (repository or candidate location) against
/// `spec.rules`.
pub fn validate_item(key: &ItemKey, path: &Path, spec: &CategorySpec) -> ValidationReport {
    let mut violations = Vec::new();

    if let Err(message) = validate_path_identifier(&key.name, "Item name") {
        violations.push(Violation::InvalidName { message });
    }

    let rules = &spec.rules;
    if !rules.is_empty() {
        check_document(key, path, spec, &mut violations);
    }

    ValidationReport {
        item: key.clone(),
        path: path.to_path_buf(),
        violations,
    }
}

fn check_document(key: &ItemKey, path: &Path, spec: &CategorySpec, violations: &mut Vec<Violation>) {
    let rules = &spec.rules;

    let Some(document) = primary_document(path, spec) else {
        violations.push(Violation::MissingDocument {
            path: path.to_path_buf(),
        });
        return;
    };

    let content = match entry_kind(&document) {
        Ok(EntryKind::File | EntryKind::Symlink) => std::fs::read_to_string(&document).ok(),
        _ => None,
    };
    let Some(content) = content else {
        violations.push(Violation::MissingDocument { path: document });
        return;
    };

    let header = Header::parse(&content);
    match &header {
        Header::Malformed(message) => {
            violations.push(Violation::MalformedHeader {
                message: message.clone(),
            });
            return;
        }
        // A missing header reports the fields it should have carried
        Header::Absent if rules.require_header && rules.required_fields.is_empty() => {
            violations.push(Violation::MissingHeader);
        }
        _ => {}
    }

    for field in &rules.required_fields {
        if header.text(field).is_none() {
            violations.push(Violation::MissingField {
                field: field.clone(),
            });
        }
    }

    if rules.name_matches_identifier
        && let Some(found) = header.text("name")
        && found != key.stem()
    {
        violations.push(Violation::NameMismatch {
            expected: key.stem().to_string(),
            found,
        });
    }
}

/// Items within one category whose stems collide (`foo` and `foo.md`).
///
/// Returns one report per colliding item.
pub fn duplicate_names<'a>(
    items: impl IntoIterator<Item = (&'a ItemKey, &'a Path)>,
) -> Vec<ValidationReport> {
    let items: Vec<_> = items.into_iter().collect();
    let mut reports = Vec::new();

    for (i, (key, path)) in items.iter().enumerate() {
        let others: Vec<_> = items
            .iter()
            .enumerate()
            .filter(|(j, (other, _))| {
                *j != i && other.category == key.category && other.stem() == key.stem()
            })
            .map(|(_, (other, _))| other.name.clone())
            .collect();

        if !others.is_empty() {
            reports.push(ValidationReport {
                item: (*key).clone(),
                path: path.to_path_buf(),
                violations: others
                    .into_iter()
                    .map(|other| Violation::DuplicateName { other })
                    .collect(),
            });
        }
    }

    reports
}
