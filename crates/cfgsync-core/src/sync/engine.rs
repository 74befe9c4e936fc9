//! SyncEngine implementation
//!
//! The SyncEngine mirrors the repository into every target environment. Each
//! mutating operation scans, plans, snapshots what the plan will touch, and
//! then executes the plan step by step.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use cfgsync_fs::io::{self, EntryKind};
use cfgsync_fs::{LockGuard, NormalizedPath, RobustnessConfig, SyncPath, validate_path_identifier};

use super::plan::{Action, ActionKind, Plan, Step};
use super::report::{Operation, Outcome, ReportRow, SyncReport};
use crate::backup::{BackupId, BackupManager, BackupSummary, RestoreOutcome};
use crate::config::{SyncConfig, TargetEnvironment};
use crate::inventory::{self, InventorySnapshot, LinkEntry, LinkState};
use crate::item::{Category, ItemKey};
use crate::link;
use crate::validate::{self, ValidationReport};
use crate::{Error, Result};

/// Options for mutating operations
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Report the plan without touching the filesystem, taking a backup,
    /// or acquiring the lock.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Engine for synchronizing a repository with its target environments
///
/// Read-only operations (`status`, `validate`, `backups`) never lock.
/// Mutating operations hold `.cfgsync/lock` for their whole run.
#[derive(Debug)]
pub struct SyncEngine {
    /// Canonical repository root
    root: PathBuf,
    config: SyncConfig,
    backups: BackupManager,
    robustness: RobustnessConfig,
}

impl SyncEngine {
    /// Create an engine for the repository at `root`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryNotFound` if `root` is not a directory.
    pub fn new(root: &Path, config: SyncConfig) -> Result<Self> {
        let root = dunce::canonicalize(root)
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| Error::RepositoryNotFound {
                path: root.to_path_buf(),
            })?;

        Ok(Self {
            backups: BackupManager::new(&root),
            root,
            config,
            robustness: RobustnessConfig::default(),
        })
    }

    /// Create an engine using the repository's own configuration file.
    pub fn open(root: &Path) -> Result<Self> {
        let config = SyncConfig::load(root)?;
        Self::new(root, config)
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn lock(&self) -> Result<LockGuard> {
        let path = NormalizedPath::new(&self.root)
            .join(SyncPath::StateDir.as_str())
            .join(SyncPath::LockFile.as_str());
        Ok(cfgsync_fs::io::acquire_lock(&path, self.robustness)?)
    }

    /// Fresh inventory of the repository and all targets.
    pub fn status(&self) -> Result<InventorySnapshot> {
        inventory::scan(&self.config, &self.root)
    }

    /// Link every repository item that is missing from a target.
    pub fn install(&self, options: &SyncOptions) -> Result<SyncReport> {
        self.run(Operation::Install, options, |snapshot| {
            Ok(self.plan_install(snapshot))
        })
    }

    /// Bring one item under management and link it everywhere.
    pub fn add(&self, category: Category, name: &str, options: &SyncOptions) -> Result<SyncReport> {
        check_name(name)?;
        self.run(Operation::Add, options, |snapshot| {
            self.plan_add(snapshot, category, name)
        })
    }

    /// Unlink one item from every target, optionally deleting the
    /// repository copy.
    pub fn remove(
        &self,
        category: Category,
        name: &str,
        purge: bool,
        options: &SyncOptions,
    ) -> Result<SyncReport> {
        check_name(name)?;
        self.run(Operation::Remove, options, |snapshot| {
            Ok(self.plan_remove(snapshot, category, name, purge))
        })
    }

    /// Copy local edits of managed items back into the repository.
    pub fn push(&self, options: &SyncOptions) -> Result<SyncReport> {
        self.run(Operation::Push, options, |snapshot| Ok(self.plan_push(snapshot)))
    }

    /// Make every target match the repository: link missing items, repair
    /// foreign links, prune stale ones.
    pub fn pull(&self, options: &SyncOptions) -> Result<SyncReport> {
        self.run(Operation::Pull, options, |snapshot| Ok(self.plan_pull(snapshot)))
    }

    /// Validate every repository item. Returns one report per item.
    pub fn validate(&self) -> Result<Vec<ValidationReport>> {
        let snapshot = self.status()?;
        let mut reports: Vec<ValidationReport> = snapshot
            .items
            .iter()
            .map(|item| {
                validate::validate_item(
                    &item.key,
                    &item.path,
                    self.config.category(item.key.category),
                )
            })
            .collect();

        let duplicates =
            validate::duplicate_names(snapshot.items.iter().map(|i| (&i.key, i.path.as_path())));
        for duplicate in duplicates {
            if let Some(report) = reports.iter_mut().find(|r| r.item == duplicate.item) {
                report.violations.extend(duplicate.violations);
            }
        }

        Ok(reports)
    }

    /// Every backup, oldest first.
    pub fn backups(&self) -> Result<Vec<BackupSummary>> {
        self.backups.list()
    }

    /// Delete all but the newest `keep` backups.
    pub fn prune_backups(&self, keep: usize) -> Result<Vec<BackupId>> {
        let _lock = self.lock()?;
        self.backups.prune(keep)
    }

    /// Restore backup `id`, or the newest one.
    ///
    /// The backup is kept, so undo can be repeated.
    pub fn undo(&self, id: Option<BackupId>) -> Result<RestoreOutcome> {
        let _lock = self.lock()?;
        let id = match id {
            Some(id) => id,
            None => self.backups.latest()?.ok_or(Error::NoBackups)?,
        };
        self.backups.restore(id)
    }

    fn run<F>(&self, operation: Operation, options: &SyncOptions, planner: F) -> Result<SyncReport>
    where
        F: FnOnce(&InventorySnapshot) -> Result<Plan>,
    {
        let _lock = if options.dry_run {
            None
        } else {
            Some(self.lock()?)
        };

        let snapshot = self.status()?;
        let plan = planner(&snapshot)?;
        tracing::debug!(
            operation = %operation,
            steps = plan.steps.len(),
            failures = plan.failures.len(),
            "plan computed"
        );

        let mut report = SyncReport {
            operation,
            dry_run: options.dry_run,
            backup: None,
            rows: Vec::with_capacity(plan.steps.len() + plan.failures.len()),
            unchanged: plan.unchanged,
            notes: snapshot.notes.clone(),
        };

        if options.dry_run {
            report
                .rows
                .extend(plan.steps.iter().map(|step| step.row(Outcome::Planned)));
            report.rows.extend(plan.failures);
            return Ok(report);
        }

        let backup_paths = plan.backup_paths();
        if !backup_paths.is_empty() {
            report.backup = Some(self.backups.snapshot(&backup_paths, operation.as_str())?);
        }

        // Items with a link that could not be removed keep their repository copy
        let mut still_linked: BTreeSet<ItemKey> = BTreeSet::new();
        for step in &plan.steps {
            let row = match &step.action {
                Action::Delete { path } if still_linked.contains(&step.item) => {
                    let error = Error::StillLinked { path: path.clone() };
                    tracing::warn!(item = %step.item, error = %error, "step skipped");
                    step.row(Outcome::failed(&error))
                }
                _ => self.execute(step),
            };
            if row.action == ActionKind::Unlink && row.outcome.is_failure() {
                still_linked.insert(step.item.clone());
            }
            report.rows.push(row);
        }
        report.rows.extend(plan.failures);
        Ok(report)
    }

    /// Execute one step, turning its error into a failed row.
    fn execute(&self, step: &Step) -> ReportRow {
        let result = match &step.action {
            Action::Link { source, target } => link::link(source, target),
            Action::Relink { source, target } => link::relink(source, target),
            Action::Unlink { source, target } => link::unlink(source, target),
            Action::Prune { target } => link::prune(&self.root, target),
            Action::Adopt { from, into } => link::adopt(from, into),
            Action::Delete { path } => io::remove_entry(path)
                .map(|_| link::LinkOutcome::Removed)
                .map_err(Error::from),
        };

        match result {
            Ok(outcome) => {
                tracing::debug!(item = %step.item, action = %step.action.kind(), ?outcome, "step done");
                step.row(Outcome::Done)
            }
            Err(e) => {
                tracing::warn!(item = %step.item, error = %e, "step failed");
                step.row(Outcome::failed(&e))
            }
        }
    }

    fn source_path(&self, key: &ItemKey) -> PathBuf {
        self.root
            .join(&self.config.category(key.category).repo_dir)
            .join(&key.name)
    }

    fn target_path(&self, env: &TargetEnvironment, key: &ItemKey) -> PathBuf {
        env.category_dir(&self.config.category(key.category).target_dir)
            .join(&key.name)
    }

    fn plan_install(&self, snapshot: &InventorySnapshot) -> Plan {
        let mut plan = Plan::new(Operation::Install);
        for entry in snapshot.entries() {
            let Some(source) = &entry.source else {
                continue;
            };
            match entry.state {
                LinkState::Missing => plan.push(
                    &entry.key,
                    Some(&entry.environment),
                    Action::Link {
                        source: source.clone(),
                        target: entry.path.clone(),
                    },
                ),
                LinkState::Tracked => plan.unchanged += 1,
                LinkState::Broken => fail_occupied(&mut plan, entry, ActionKind::Link),
                LinkState::LocalOnly => {}
            }
        }
        plan
    }

    fn plan_add(&self, snapshot: &InventorySnapshot, category: Category, name: &str) -> Result<Plan> {
        let mut plan = Plan::new(Operation::Add);

        if let Some(item) = snapshot.find_item(category, name) {
            let key = item.key.clone();
            let mut adopted = false;
            for entry in snapshot.entries_for(&key) {
                match entry.state {
                    LinkState::Missing => plan.push(
                        &key,
                        Some(&entry.environment),
                        Action::Link {
                            source: item.path.clone(),
                            target: entry.path.clone(),
                        },
                    ),
                    LinkState::Tracked => plan.unchanged += 1,
                    // The first real local copy overwrites the repository
                    LinkState::Broken if entry.is_real_copy() && !adopted => {
                        if self.plan_adopt(&mut plan, &key, entry, &item.path) {
                            adopted = true;
                        }
                    }
                    _ => fail_occupied(&mut plan, entry, ActionKind::Link),
                }
            }
            return Ok(plan);
        }

        let candidates = self.local_candidates(snapshot, category, name)?;
        let Some((key, chosen_env, from)) = candidates.first().cloned() else {
            let key = ItemKey::new(category, name);
            let error = Error::ItemNotFound {
                category,
                name: name.to_string(),
            };
            plan.fail(&key, None, ActionKind::Adopt, &self.source_path(&key), &error);
            return Ok(plan);
        };

        let into = self.source_path(&key);
        let report = validate::validate_item(&key, &from, self.config.category(category));
        if !report.is_valid() {
            let error = Error::ValidationFailed {
                item: key.clone(),
                violations: report.violations,
            };
            plan.fail(&key, Some(&chosen_env), ActionKind::Adopt, &from, &error);
            return Ok(plan);
        }

        for env in snapshot.present_environments() {
            let env_name = env.environment.name.as_str();
            let target = self.target_path(&env.environment, &key);
            if env_name == chosen_env {
                plan.push(
                    &key,
                    Some(env_name),
                    Action::Adopt {
                        from: from.clone(),
                        into: into.clone(),
                    },
                );
                continue;
            }
            match io::entry_kind(&target)? {
                EntryKind::Missing => plan.push(
                    &key,
                    Some(env_name),
                    Action::Link {
                        source: into.clone(),
                        target,
                    },
                ),
                kind => {
                    let error = Error::PathOccupied {
                        path: target.clone(),
                        occupant: kind.to_string(),
                    };
                    plan.fail(&key, Some(env_name), ActionKind::Link, &target, &error);
                }
            }
        }
        Ok(plan)
    }

    /// Real local copies of an unmanaged item, as (key, environment, path).
    ///
    /// Enumerated entries are matched by name or stem; categories that do
    /// not enumerate local entries are checked by exact name.
    fn local_candidates(
        &self,
        snapshot: &InventorySnapshot,
        category: Category,
        name: &str,
    ) -> Result<Vec<(ItemKey, String, PathBuf)>> {
        let enumerated: Vec<_> = snapshot
            .find_local(category, name)
            .into_iter()
            .filter(|entry| entry.is_real_copy())
            .map(|entry| (entry.key.clone(), entry.environment.clone(), entry.path.clone()))
            .collect();
        if !enumerated.is_empty() {
            return Ok(enumerated);
        }

        let key = ItemKey::new(category, name);
        let mut direct = Vec::new();
        for env in snapshot.present_environments() {
            let path = self.target_path(&env.environment, &key);
            if matches!(io::entry_kind(&path)?, EntryKind::File | EntryKind::Dir) {
                direct.push((key.clone(), env.environment.name.clone(), path));
            }
        }
        Ok(direct)
    }

    /// Plan adoption of `entry` over the repository copy. Returns false when
    /// the candidate fails validation.
    fn plan_adopt(&self, plan: &mut Plan, key: &ItemKey, entry: &LinkEntry, into: &Path) -> bool {
        let report = validate::validate_item(key, &entry.path, self.config.category(key.category));
        if !report.is_valid() {
            let error = Error::ValidationFailed {
                item: key.clone(),
                violations: report.violations,
            };
            plan.fail(key, Some(&entry.environment), ActionKind::Adopt, &entry.path, &error);
            return false;
        }
        plan.push(
            key,
            Some(&entry.environment),
            Action::Adopt {
                from: entry.path.clone(),
                into: into.to_path_buf(),
            },
        );
        true
    }

    fn plan_remove(
        &self,
        snapshot: &InventorySnapshot,
        category: Category,
        name: &str,
        purge: bool,
    ) -> Plan {
        let mut plan = Plan::new(Operation::Remove);

        let Some(item) = snapshot.find_item(category, name) else {
            let local = snapshot.find_local(category, name);
            if local.is_empty() {
                let key = ItemKey::new(category, name);
                let error = Error::ItemNotFound {
                    category,
                    name: name.to_string(),
                };
                plan.fail(&key, None, ActionKind::Unlink, &self.source_path(&key), &error);
            }
            for entry in local {
                let error = Error::NotManaged {
                    path: entry.path.clone(),
                };
                plan.fail(&entry.key, Some(&entry.environment), ActionKind::Unlink, &entry.path, &error);
            }
            return plan;
        };

        for entry in snapshot.entries_for(&item.key) {
            match entry.state {
                LinkState::Tracked => plan.push(
                    &item.key,
                    Some(&entry.environment),
                    Action::Unlink {
                        source: item.path.clone(),
                        target: entry.path.clone(),
                    },
                ),
                LinkState::Missing => plan.unchanged += 1,
                _ => {
                    let error = Error::NotManaged {
                        path: entry.path.clone(),
                    };
                    plan.fail(&item.key, Some(&entry.environment), ActionKind::Unlink, &entry.path, &error);
                }
            }
        }

        if purge {
            plan.push(
                &item.key,
                None,
                Action::Delete {
                    path: item.path.clone(),
                },
            );
        }
        plan
    }

    fn plan_push(&self, snapshot: &InventorySnapshot) -> Plan {
        let mut plan = Plan::new(Operation::Push);
        for entry in snapshot.entries() {
            let Some(source) = &entry.source else {
                continue;
            };
            match entry.state {
                LinkState::Missing => plan.push(
                    &entry.key,
                    Some(&entry.environment),
                    Action::Link {
                        source: source.clone(),
                        target: entry.path.clone(),
                    },
                ),
                LinkState::Tracked => plan.unchanged += 1,
                // Copies are adopted in environment order; the last one wins
                LinkState::Broken if entry.is_real_copy() => {
                    self.plan_adopt(&mut plan, &entry.key, entry, source);
                }
                LinkState::Broken => fail_occupied(&mut plan, entry, ActionKind::Adopt),
                LinkState::LocalOnly => {}
            }
        }
        plan
    }

    fn plan_pull(&self, snapshot: &InventorySnapshot) -> Plan {
        let mut plan = Plan::new(Operation::Pull);
        for entry in snapshot.entries() {
            let env = Some(entry.environment.as_str());
            match (&entry.source, entry.state) {
                (Some(source), LinkState::Missing) => plan.push(
                    &entry.key,
                    env,
                    Action::Link {
                        source: source.clone(),
                        target: entry.path.clone(),
                    },
                ),
                (Some(_), LinkState::Tracked) => plan.unchanged += 1,
                (Some(source), LinkState::Broken) if entry.occupant == EntryKind::Symlink => plan.push(
                    &entry.key,
                    env,
                    Action::Relink {
                        source: source.clone(),
                        target: entry.path.clone(),
                    },
                ),
                (Some(_), LinkState::Broken) => fail_occupied(&mut plan, entry, ActionKind::Relink),
                (None, LinkState::Broken) => plan.push(
                    &entry.key,
                    env,
                    Action::Prune {
                        target: entry.path.clone(),
                    },
                ),
                _ => {}
            }
        }
        plan
    }
}

fn check_name(name: &str) -> Result<()> {
    validate_path_identifier(name, "Item name").map_err(|message| Error::InvalidName { message })
}

fn fail_occupied(plan: &mut Plan, entry: &LinkEntry, action: ActionKind) {
    let error = Error::PathOccupied {
        path: entry.path.clone(),
        occupant: entry.occupant.to_string(),
    };
    plan.fail(&entry.key, Some(&entry.environment), action, &entry.path, &error);
}
