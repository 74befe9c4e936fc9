//! Inventory scanner
//!
//! Derives the current state of every (item, environment) pair from the
//! filesystem. Scanning is read-only and recomputed on every invocation;
//! nothing is cached between runs.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use cfgsync_fs::io::{self, EntryKind};
use serde::Serialize;

use crate::Result;
use crate::config::{CategorySpec, SyncConfig, TargetEnvironment};
use crate::item::{Category, ConfigItem, ItemKey, name_matches};
use crate::link;

/// Classification of one target entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Correct symlink into the repository
    Tracked,
    /// Target entry with no repository counterpart
    LocalOnly,
    /// Repository item with nothing in the target
    Missing,
    /// Wrong occupant, or a dangling link into the repository
    Broken,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LinkState::Tracked => "tracked",
            LinkState::LocalOnly => "local-only",
            LinkState::Missing => "missing",
            LinkState::Broken => "broken",
        };
        f.write_str(label)
    }
}

/// State of one item in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub key: ItemKey,
    pub environment: String,
    /// Location inside the environment
    pub path: PathBuf,
    /// Repository copy, when the repository has one
    pub source: Option<PathBuf>,
    pub state: LinkState,
    /// What currently occupies `path`
    #[serde(skip)]
    pub occupant: EntryKind,
    pub detail: Option<String>,
}

impl LinkEntry {
    /// A real file or directory sits where the link belongs.
    pub fn is_real_copy(&self) -> bool {
        self.state != LinkState::Tracked && matches!(self.occupant, EntryKind::File | EntryKind::Dir)
    }

    /// A link into the repository whose item no longer exists.
    pub fn is_stale(&self) -> bool {
        self.state == LinkState::Broken && self.source.is_none()
    }
}

/// Entries for one target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentInventory {
    pub environment: TargetEnvironment,
    /// False when the root does not exist; such environments have no entries
    pub present: bool,
    pub entries: Vec<LinkEntry>,
}

/// Point-in-time view of the repository and every environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySnapshot {
    pub repo_root: PathBuf,
    pub items: Vec<ConfigItem>,
    pub environments: Vec<EnvironmentInventory>,
    /// Informational messages (absent environments)
    pub notes: Vec<String>,
}

impl InventorySnapshot {
    /// Repository item named `query` in `category`. An exact name wins over
    /// a stem match.
    pub fn find_item(&self, category: Category, query: &str) -> Option<&ConfigItem> {
        let mut candidates = self.items.iter().filter(|i| i.key.category == category);
        let exact = candidates.clone().find(|i| i.key.name == query);
        exact.or_else(|| candidates.find(|i| name_matches(&i.key.name, query)))
    }

    /// Every entry across all present environments.
    pub fn entries(&self) -> impl Iterator<Item = &LinkEntry> {
        self.environments.iter().flat_map(|env| env.entries.iter())
    }

    /// Entries for one item, one per present environment that knows it.
    pub fn entries_for<'a>(&'a self, key: &'a ItemKey) -> impl Iterator<Item = &'a LinkEntry> + 'a {
        self.entries().filter(move |entry| &entry.key == key)
    }

    /// LocalOnly entries in `category` matching `query`, in environment order.
    pub fn find_local(&self, category: Category, query: &str) -> Vec<&LinkEntry> {
        let matches: Vec<_> = self
            .entries()
            .filter(|e| e.key.category == category && e.state == LinkState::LocalOnly)
            .collect();
        let exact: Vec<_> = matches
            .iter()
            .copied()
            .filter(|e| e.key.name == query)
            .collect();
        if !exact.is_empty() {
            return exact;
        }
        matches
            .into_iter()
            .filter(|e| name_matches(&e.key.name, query))
            .collect()
    }

    pub fn count(&self, state: LinkState) -> usize {
        self.entries().filter(|e| e.state == state).count()
    }

    /// Present environments, in configuration order.
    pub fn present_environments(&self) -> impl Iterator<Item = &EnvironmentInventory> {
        self.environments.iter().filter(|env| env.present)
    }
}

/// Scan the repository at `repo_root` and every configured target.
///
/// # Errors
///
/// Returns an error only when an existing directory cannot be read.
pub fn scan(config: &SyncConfig, repo_root: &Path) -> Result<InventorySnapshot> {
    let mut items = Vec::new();
    for spec in config.categories() {
        let dir = repo_root.join(&spec.repo_dir);
        for name in list_names(&dir)? {
            let path = dir.join(&name);
            items.push(ConfigItem::new(ItemKey::new(spec.category, name), path));
        }
    }

    let mut environments = Vec::new();
    let mut notes = Vec::new();
    for env in &config.targets {
        if !env.exists() {
            tracing::info!(environment = %env.name, root = %env.root.display(), "environment absent, skipping");
            notes.push(format!(
                "environment '{}' absent at {}",
                env.name,
                env.root.display()
            ));
            environments.push(EnvironmentInventory {
                environment: env.clone(),
                present: false,
                entries: Vec::new(),
            });
            continue;
        }

        let mut entries = Vec::new();
        for spec in config.categories() {
            entries.extend(scan_category(repo_root, &items, env, spec)?);
        }
        environments.push(EnvironmentInventory {
            environment: env.clone(),
            present: true,
            entries,
        });
    }

    Ok(InventorySnapshot {
        repo_root: repo_root.to_path_buf(),
        items,
        environments,
        notes,
    })
}

fn scan_category(
    repo_root: &Path,
    items: &[ConfigItem],
    env: &TargetEnvironment,
    spec: &CategorySpec,
) -> Result<Vec<LinkEntry>> {
    let dir = env.category_dir(&spec.target_dir);
    let repo_items: Vec<_> = items
        .iter()
        .filter(|item| item.key.category == spec.category)
        .collect();

    let mut names: BTreeSet<String> = repo_items.iter().map(|i| i.key.name.clone()).collect();
    if spec.scan_local {
        names.extend(list_names(&dir)?);
    }

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        let source = repo_items
            .iter()
            .find(|item| item.key.name == name)
            .map(|item| item.path.clone());
        let occupant = io::entry_kind(&path)?;
        let (state, detail) = classify(repo_root, &path, source.as_deref(), occupant)?;

        entries.push(LinkEntry {
            key: ItemKey::new(spec.category, name),
            environment: env.name.clone(),
            path,
            source,
            state,
            occupant,
            detail,
        });
    }
    Ok(entries)
}

fn classify(
    repo_root: &Path,
    path: &Path,
    source: Option<&Path>,
    occupant: EntryKind,
) -> Result<(LinkState, Option<String>)> {
    let Some(source) = source else {
        // Live aliases into the repository belong to the user
        if occupant == EntryKind::Symlink
            && link::points_into(path, repo_root)?
            && link::dangles(path)?
        {
            return Ok((
                LinkState::Broken,
                Some("dangling link into the repository".to_string()),
            ));
        }
        return Ok((LinkState::LocalOnly, None));
    };

    match occupant {
        EntryKind::Missing => Ok((LinkState::Missing, None)),
        EntryKind::Symlink if link::points_to(path, source)? => Ok((LinkState::Tracked, None)),
        EntryKind::Symlink => {
            let destination = io::read_link_absolute(path)?;
            Ok((
                LinkState::Broken,
                Some(format!("links to {}", destination.display())),
            ))
        }
        // The target directory itself links into the repository
        _ if link::same_location(path, source) => Ok((
            LinkState::Tracked,
            Some("reached through a linked directory".to_string()),
        )),
        kind => Ok((
            LinkState::Broken,
            Some(format!("real {kind} collides with repository item")),
        )),
    }
}

/// Visible entry names in `dir`; a missing directory is empty.
fn list_names(dir: &Path) -> Result<BTreeSet<String>> {
    if !dir.is_dir() {
        return Ok(BTreeSet::new());
    }

    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir).map_err(|e| cfgsync_fs::Error::io(dir, e))? {
        let entry = entry.map_err(|e| cfgsync_fs::Error::io(dir, e))?;
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 entry name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        names.insert(name);
    }
    Ok(names)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf, SyncConfig) {
        let temp = TempDir::new().unwrap();
        let base = dunce::canonicalize(temp.path()).unwrap();
        let repo = base.join("repo");
        fs::create_dir_all(repo.join("skills/foo")).unwrap();
        fs::create_dir_all(base.join("host/skills")).unwrap();
        let config = SyncConfig::default()
            .with_targets(vec![TargetEnvironment::new("host", base.join("host"))]);
        (temp, repo, config)
    }

    fn state_of(snapshot: &InventorySnapshot, name: &str) -> LinkState {
        snapshot
            .entries()
            .find(|e| e.key.name == name)
            .map(|e| e.state)
            .unwrap()
    }

    #[test]
    fn classifies_all_four_states() {
        let (_temp, repo, config) = fixture();
        let host = &config.targets[0].root;
        fs::create_dir_all(repo.join("skills/linked")).unwrap();
        fs::create_dir_all(repo.join("skills/clash")).unwrap();
        symlink(repo.join("skills/linked"), host.join("skills/linked")).unwrap();
        fs::create_dir_all(host.join("skills/clash")).unwrap();
        fs::create_dir_all(host.join("skills/bar")).unwrap();

        let snapshot = scan(&config, &repo).unwrap();

        assert_eq!(state_of(&snapshot, "foo"), LinkState::Missing);
        assert_eq!(state_of(&snapshot, "linked"), LinkState::Tracked);
        assert_eq!(state_of(&snapshot, "clash"), LinkState::Broken);
        assert_eq!(state_of(&snapshot, "bar"), LinkState::LocalOnly);
    }

    #[test]
    fn dangling_link_into_repo_is_broken() {
        let (_temp, repo, config) = fixture();
        let host = &config.targets[0].root;
        symlink(repo.join("skills/deleted"), host.join("skills/deleted")).unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        let entry = snapshot.entries().find(|e| e.key.name == "deleted").unwrap();
        assert_eq!(entry.state, LinkState::Broken);
        assert!(entry.is_stale());
    }

    #[test]
    fn live_alias_into_repo_is_local() {
        let (_temp, repo, config) = fixture();
        let host = &config.targets[0].root;
        symlink(repo.join("skills/foo"), host.join("skills/my-alias")).unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        let entry = snapshot.entries().find(|e| e.key.name == "my-alias").unwrap();
        assert_eq!(entry.state, LinkState::LocalOnly);
        assert!(!entry.is_stale());
    }

    #[test]
    fn linked_category_directory_is_tracked() {
        let (_temp, repo, config) = fixture();
        let host = &config.targets[0].root;
        fs::remove_dir(host.join("skills")).unwrap();
        symlink(repo.join("skills"), host.join("skills")).unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        let entry = snapshot.entries().find(|e| e.key.name == "foo").unwrap();
        assert_eq!(entry.state, LinkState::Tracked);
        assert!(!entry.is_real_copy());
    }

    #[test]
    fn foreign_link_without_repo_item_is_local() {
        let (_temp, repo, config) = fixture();
        let host = &config.targets[0].root;
        symlink("/opt/elsewhere", host.join("skills/other")).unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        assert_eq!(state_of(&snapshot, "other"), LinkState::LocalOnly);
    }

    #[test]
    fn absent_environment_is_noted() {
        let (_temp, repo, config) = fixture();
        let missing = repo.parent().unwrap().join("nowhere");
        let config = config.with_targets(vec![TargetEnvironment::new("gone", missing)]);

        let snapshot = scan(&config, &repo).unwrap();
        assert_eq!(snapshot.notes.len(), 1);
        assert!(!snapshot.environments[0].present);
        assert_eq!(snapshot.entries().count(), 0);
    }

    #[test]
    fn hidden_entries_are_ignored() {
        let (_temp, repo, config) = fixture();
        fs::create_dir_all(repo.join("skills/.git")).unwrap();
        fs::write(config.targets[0].root.join("skills/.DS_Store"), "").unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        assert!(snapshot.entries().all(|e| !e.key.name.starts_with('.')));
    }

    #[test]
    fn settings_root_is_not_enumerated() {
        let (_temp, repo, config) = fixture();
        fs::create_dir_all(repo.join("settings")).unwrap();
        fs::write(repo.join("settings/settings.json"), "{}").unwrap();
        fs::write(config.targets[0].root.join("history.jsonl"), "").unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        let settings: Vec<_> = snapshot
            .entries()
            .filter(|e| e.key.category == Category::Setting)
            .map(|e| e.key.name.as_str())
            .collect();
        assert_eq!(settings, vec!["settings.json"]);
    }

    #[test]
    fn lookup_accepts_stems() {
        let (_temp, repo, config) = fixture();
        fs::create_dir_all(repo.join("agents")).unwrap();
        fs::write(repo.join("agents/reviewer.md"), "").unwrap();

        let snapshot = scan(&config, &repo).unwrap();
        let item = snapshot.find_item(Category::Agent, "reviewer").unwrap();
        assert_eq!(item.key.name, "reviewer.md");
    }
}
