//! Backup store: snapshot, list, restore, prune

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use cfgsync_fs::checksum::compute_tree_checksum;
use cfgsync_fs::io::{self, EntryKind};
use cfgsync_fs::{ConfigStore, NormalizedPath, SyncPath};
use regex::Regex;
use serde::Serialize;

use super::record::{BackupId, BackupRecord, BackupSummary, CapturedEntry, CapturedState};
use crate::{Error, Result};

/// Archive directory names: `<seq>-<YYYYMMDDTHHMMSSZ>`.
static ARCHIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{6,})-(\d{8}T\d{6}Z)$").expect("archive name pattern is a valid regex")
});

const STAGING_PREFIX: &str = ".staging-";

/// Result of restoring a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub id: BackupId,
    /// Paths recreated from the archive
    pub restored: Vec<PathBuf>,
    /// Paths removed because they did not exist at snapshot time
    pub removed: Vec<PathBuf>,
}

/// Manages the append-only backup log under `<repo>/.cfgsync/backups`.
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Path to backups directory (.cfgsync/backups)
    backups_dir: PathBuf,
    store: ConfigStore,
}

impl BackupManager {
    /// Create a new BackupManager for the given repository root
    pub fn new(repo_root: &Path) -> Self {
        Self {
            backups_dir: repo_root
                .join(SyncPath::StateDir.as_str())
                .join(SyncPath::BackupsDir.as_str()),
            store: ConfigStore::new(),
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    fn record_path(archive: &Path) -> NormalizedPath {
        NormalizedPath::new(archive.join(SyncPath::BackupRecord.as_str()))
    }

    /// Capture the current state of `paths` as a new archive.
    ///
    /// Duplicate paths are captured once. The archive only becomes visible
    /// once fully written; any failure leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if any path cannot be read or the archive cannot be
    /// written. Callers must not mutate anything in that case.
    pub fn snapshot(&self, paths: &[PathBuf], label: &str) -> Result<BackupId> {
        fs::create_dir_all(&self.backups_dir)
            .map_err(|e| cfgsync_fs::Error::io(&self.backups_dir, e))?;
        self.clean_staging();

        let id = self.next_id()?;
        let staging = self
            .backups_dir
            .join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4()));

        match self.write_archive(&staging, id, paths, label) {
            Ok(record) => {
                let name = format!("{}-{}", id, record.created.format("%Y%m%dT%H%M%SZ"));
                let archive = self.backups_dir.join(name);
                if let Err(e) = fs::rename(&staging, &archive) {
                    let _ = io::remove_entry(&staging);
                    return Err(cfgsync_fs::Error::io(&archive, e).into());
                }
                tracing::info!(id = %id, entries = record.entries.len(), label, "backup created");
                Ok(id)
            }
            Err(e) => {
                let _ = io::remove_entry(&staging);
                Err(e)
            }
        }
    }

    fn write_archive(
        &self,
        staging: &Path,
        id: BackupId,
        paths: &[PathBuf],
        label: &str,
    ) -> Result<BackupRecord> {
        let payload_dir = staging.join(SyncPath::BackupPayload.as_str());
        fs::create_dir_all(&payload_dir).map_err(|e| cfgsync_fs::Error::io(&payload_dir, e))?;

        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for path in paths {
            if !seen.insert(path.clone()) {
                continue;
            }
            let state = match io::entry_kind(path)? {
                EntryKind::Missing => CapturedState::Absent,
                EntryKind::Symlink => CapturedState::Symlink {
                    target: fs::read_link(path).map_err(|e| cfgsync_fs::Error::io(path, e))?,
                },
                kind @ (EntryKind::File | EntryKind::Dir) => {
                    let payload = entries.len().to_string();
                    let copy = payload_dir.join(&payload);
                    io::copy_tree(path, &copy)?;
                    let checksum = compute_tree_checksum(&copy)?;
                    if kind == EntryKind::File {
                        CapturedState::File { payload, checksum }
                    } else {
                        CapturedState::Dir { payload, checksum }
                    }
                }
                EntryKind::Other => {
                    return Err(cfgsync_fs::Error::UnsupportedEntry { path: path.clone() }.into());
                }
            };
            entries.push(CapturedEntry {
                path: path.clone(),
                state,
            });
        }

        let record = BackupRecord {
            id,
            created: Utc::now(),
            label: label.to_string(),
            entries,
        };
        self.store.save(&Self::record_path(staging), &record)?;
        Ok(record)
    }

    fn next_id(&self) -> Result<BackupId> {
        Ok(self
            .archives()?
            .last()
            .map(|(id, _)| id.next())
            .unwrap_or(BackupId::new(1)))
    }

    /// Remove staging directories left by interrupted snapshots.
    fn clean_staging(&self) {
        let Ok(entries) = fs::read_dir(&self.backups_dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                tracing::debug!(path = %entry.path().display(), "removing stale staging directory");
                let _ = io::remove_entry(&entry.path());
            }
        }
    }

    /// Published archives sorted by id.
    fn archives(&self) -> Result<Vec<(BackupId, PathBuf)>> {
        if !self.backups_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut archives = Vec::new();
        let entries =
            fs::read_dir(&self.backups_dir).map_err(|e| cfgsync_fs::Error::io(&self.backups_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| cfgsync_fs::Error::io(&self.backups_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(caps) = ARCHIVE_NAME.captures(&name) else {
                continue;
            };
            if let Ok(seq) = caps[1].parse::<u64>() {
                archives.push((BackupId::new(seq), entry.path()));
            }
        }
        archives.sort();
        Ok(archives)
    }

    fn find(&self, id: BackupId) -> Result<PathBuf> {
        self.archives()?
            .into_iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, path)| path)
            .ok_or_else(|| Error::BackupNotFound { id: id.to_string() })
    }

    fn load_record(&self, id: BackupId, archive: &Path) -> Result<BackupRecord> {
        let record: BackupRecord =
            self.store
                .load(&Self::record_path(archive))
                .map_err(|e| Error::BackupCorrupt {
                    id: id.to_string(),
                    reason: e.to_string(),
                })?;
        if record.id != id {
            return Err(Error::BackupCorrupt {
                id: id.to_string(),
                reason: format!("record claims id {}", record.id),
            });
        }
        Ok(record)
    }

    /// Every archive, oldest first. Unreadable records are listed with
    /// `error` set rather than failing the listing.
    pub fn list(&self) -> Result<Vec<BackupSummary>> {
        let mut summaries = Vec::new();
        for (id, path) in self.archives()? {
            let summary = match self.load_record(id, &path) {
                Ok(record) => BackupSummary {
                    id,
                    created: record.created,
                    label: record.label,
                    entries: record.entries.len(),
                    path,
                    error: None,
                },
                Err(e) => BackupSummary {
                    id,
                    created: Default::default(),
                    label: String::new(),
                    entries: 0,
                    path,
                    error: Some(e.to_string()),
                },
            };
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// The newest archive id, if any.
    pub fn latest(&self) -> Result<Option<BackupId>> {
        Ok(self.archives()?.last().map(|(id, _)| *id))
    }

    /// Restore every path captured by backup `id`.
    ///
    /// Integrity is verified before anything is touched: an unreadable
    /// record or a payload whose checksum does not match is
    /// `BackupCorrupt` and the filesystem is left as it was.
    pub fn restore(&self, id: BackupId) -> Result<RestoreOutcome> {
        let archive = self.find(id)?;
        let record = self.load_record(id, &archive)?;
        let payload_dir = archive.join(SyncPath::BackupPayload.as_str());

        for entry in &record.entries {
            if let Some((payload, expected)) = entry.state.payload() {
                let copy = payload_dir.join(payload);
                let actual = compute_tree_checksum(&copy).map_err(|e| Error::BackupCorrupt {
                    id: id.to_string(),
                    reason: e.to_string(),
                })?;
                if actual != expected {
                    return Err(Error::BackupCorrupt {
                        id: id.to_string(),
                        reason: format!("payload for {} fails checksum", entry.path.display()),
                    });
                }
            }
        }

        let mut outcome = RestoreOutcome {
            id,
            restored: Vec::new(),
            removed: Vec::new(),
        };

        for entry in record.entries.iter().rev() {
            let existed = io::remove_entry(&entry.path)?;
            match &entry.state {
                CapturedState::Absent => {
                    if existed {
                        outcome.removed.push(entry.path.clone());
                    }
                    continue;
                }
                CapturedState::Symlink { target } => {
                    ensure_parent(&entry.path)?;
                    io::symlink(target, &entry.path)?;
                }
                CapturedState::File { payload, .. } | CapturedState::Dir { payload, .. } => {
                    io::copy_tree(&payload_dir.join(payload), &entry.path)?;
                }
            }
            outcome.restored.push(entry.path.clone());
        }

        tracing::info!(
            id = %id,
            restored = outcome.restored.len(),
            removed = outcome.removed.len(),
            "backup restored"
        );
        Ok(outcome)
    }

    /// Delete all but the newest `keep` archives. Returns the removed ids.
    pub fn prune(&self, keep: usize) -> Result<Vec<BackupId>> {
        let archives = self.archives()?;
        let excess = archives.len().saturating_sub(keep);

        let mut removed = Vec::with_capacity(excess);
        for (id, path) in archives.into_iter().take(excess) {
            io::remove_entry(&path)?;
            tracing::debug!(id = %id, "pruned backup");
            removed.push(id);
        }
        Ok(removed)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| cfgsync_fs::Error::io(parent, e))?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn archive_name_pattern_matches_sequence_and_timestamp() {
        let caps = ARCHIVE_NAME.captures("000042-20250101T120000Z").unwrap();
        assert_eq!(&caps[1], "000042");
        assert_eq!(&caps[2], "20250101T120000Z");
        assert!(ARCHIVE_NAME.captures(".staging-1234").is_none());
        assert!(ARCHIVE_NAME.captures("42-20250101T120000Z").is_none());
    }

    fn setup() -> (TempDir, BackupManager, PathBuf) {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        let work = temp.path().join("work");
        fs::create_dir_all(&repo).unwrap();
        fs::create_dir_all(&work).unwrap();
        (temp, BackupManager::new(&repo), work)
    }

    #[test]
    fn round_trips_file_dir_link_and_absent() {
        let (_temp, backups, work) = setup();
        let file = work.join("settings.json");
        let dir = work.join("skill");
        let link = work.join("link");
        let absent = work.join("later");
        fs::write(&file, "{\"a\":1}").unwrap();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/SKILL.md"), "body").unwrap();
        std::os::unix::fs::symlink("/opt/target", &link).unwrap();

        let id = backups
            .snapshot(&[file.clone(), dir.clone(), link.clone(), absent.clone()], "test")
            .unwrap();

        fs::write(&file, "changed").unwrap();
        fs::remove_dir_all(&dir).unwrap();
        fs::remove_file(&link).unwrap();
        fs::write(&link, "now a file").unwrap();
        fs::write(&absent, "created later").unwrap();

        let outcome = backups.restore(id).unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "{\"a\":1}");
        assert_eq!(fs::read_to_string(dir.join("nested/SKILL.md")).unwrap(), "body");
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("/opt/target"));
        assert!(!absent.exists());
        assert_eq!(outcome.removed, vec![absent]);
    }

    #[test]
    fn ids_increase_within_the_same_second() {
        let (_temp, backups, work) = setup();
        let a = backups.snapshot(&[work.join("x")], "one").unwrap();
        let b = backups.snapshot(&[work.join("x")], "two").unwrap();
        let c = backups.snapshot(&[work.join("x")], "three").unwrap();

        assert!(a < b && b < c);
        let ids: Vec<_> = backups.list().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn tampered_payload_is_corrupt_and_nothing_applied() {
        let (_temp, backups, work) = setup();
        let file = work.join("a.txt");
        let other = work.join("b.txt");
        fs::write(&file, "original").unwrap();
        let id = backups.snapshot(&[other.clone(), file.clone()], "test").unwrap();

        fs::write(&file, "edited").unwrap();
        fs::write(&other, "new").unwrap();
        let archive = backups.find(id).unwrap();
        fs::write(archive.join("payload/1"), "tampered").unwrap();

        let err = backups.restore(id).unwrap_err();
        assert!(matches!(err, Error::BackupCorrupt { .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), "edited");
        assert_eq!(fs::read_to_string(&other).unwrap(), "new");
    }

    #[test]
    fn unreadable_record_is_corrupt_but_still_listed() {
        let (_temp, backups, work) = setup();
        let id = backups.snapshot(&[work.join("x")], "test").unwrap();
        let archive = backups.find(id).unwrap();
        fs::write(archive.join("backup.toml"), "not = [valid").unwrap();

        assert!(matches!(backups.restore(id), Err(Error::BackupCorrupt { .. })));
        let listed = backups.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].error.is_some());
    }

    #[test]
    fn prune_keeps_the_newest() {
        let (_temp, backups, work) = setup();
        let ids: Vec<_> = (0..4)
            .map(|_| backups.snapshot(&[work.join("x")], "test").unwrap())
            .collect();

        let removed = backups.prune(2).unwrap();
        assert_eq!(removed, ids[..2].to_vec());
        let remaining: Vec<_> = backups.list().unwrap().iter().map(|s| s.id).collect();
        assert_eq!(remaining, ids[2..].to_vec());
        assert_eq!(backups.latest().unwrap(), Some(ids[3]));
    }

    #[test]
    fn staging_leftovers_are_ignored_and_cleaned() {
        let (_temp, backups, work) = setup();
        let leftover = backups.backups_dir().join(".staging-abandoned");
        fs::create_dir_all(&leftover).unwrap();
        assert!(backups.list().unwrap().is_empty());

        backups.snapshot(&[work.join("x")], "test").unwrap();
        assert!(!leftover.exists());
    }

    #[test]
    fn missing_backup_is_not_found() {
        let (_temp, backups, _work) = setup();
        assert!(matches!(
            backups.restore(BackupId::new(9)),
            Err(Error::BackupNotFound { .. })
        ));
    }
}
