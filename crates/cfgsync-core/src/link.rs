//! Symlink manager
//!
//! Every mutating call checks ownership first: a target is only replaced or
//! removed when it is a symlink the engine could have created. Real files
//! and directories are never overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use cfgsync_fs::NormalizedPath;
use cfgsync_fs::io::{self, EntryKind};
use serde::Serialize;

use crate::{Error, Result};

/// What a link operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Created,
    /// Already correct; nothing done
    Unchanged,
    Replaced,
    Removed,
    /// Nothing to remove
    Absent,
}

/// Resolve `path` through its parent directory only, so a final symlink
/// component is not followed.
fn resolve_parent(path: &Path) -> NormalizedPath {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match dunce::canonicalize(parent) {
            Ok(parent) => NormalizedPath::new(parent.join(name)),
            Err(_) => NormalizedPath::new(path),
        },
        _ => NormalizedPath::new(path),
    }
}

/// Whether `a` and `b` name the same location without following a final
/// symlink in either.
pub fn same_location(a: &Path, b: &Path) -> bool {
    NormalizedPath::new(a) == NormalizedPath::new(b) || resolve_parent(a) == resolve_parent(b)
}

/// Whether the symlink at `target` points, after exactly one hop, at
/// `source`. Non-links return `false`.
pub fn points_to(target: &Path, source: &Path) -> Result<bool> {
    if io::entry_kind(target)? != EntryKind::Symlink {
        return Ok(false);
    }
    let destination = io::read_link_absolute(target)?;
    Ok(same_location(&destination, source))
}

/// Whether the symlink at `target` points somewhere inside `root`.
pub fn points_into(target: &Path, root: &Path) -> Result<bool> {
    if io::entry_kind(target)? != EntryKind::Symlink {
        return Ok(false);
    }
    let destination = io::read_link_absolute(target)?;
    let root_normalized = NormalizedPath::new(root);
    Ok(NormalizedPath::new(&destination).starts_with(&root_normalized)
        || resolve_parent(&destination).starts_with(&resolve_parent(root)))
}

/// Whether the symlink at `target` points at nothing. Non-links return
/// `false`.
pub fn dangles(target: &Path) -> Result<bool> {
    if io::entry_kind(target)? != EntryKind::Symlink {
        return Ok(false);
    }
    let destination = io::read_link_absolute(target)?;
    Ok(io::entry_kind(&destination)? == EntryKind::Missing)
}

fn occupied(target: &Path, kind: EntryKind) -> Error {
    Error::PathOccupied {
        path: target.to_path_buf(),
        occupant: kind.to_string(),
    }
}

fn ensure_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| cfgsync_fs::Error::io(parent, e))?;
    }
    Ok(())
}

/// Create `target` as a symlink to `source`.
///
/// A correct existing link is left alone. Anything else at `target`,
/// including a symlink pointing elsewhere, is `PathOccupied`.
pub fn link(source: &Path, target: &Path) -> Result<LinkOutcome> {
    match io::entry_kind(target)? {
        // Target directory is itself a link into the repository
        EntryKind::Missing if same_location(source, target) => Err(Error::NotManaged {
            path: target.to_path_buf(),
        }),
        EntryKind::Missing => {
            ensure_parent(target)?;
            io::symlink(source, target)?;
            tracing::debug!(source = %source.display(), target = %target.display(), "linked");
            Ok(LinkOutcome::Created)
        }
        EntryKind::Symlink if points_to(target, source)? => Ok(LinkOutcome::Unchanged),
        kind => Err(occupied(target, kind)),
    }
}

/// Remove `target` if it is a symlink to `source`.
///
/// A missing target succeeds trivially. Anything else is `NotManaged`.
pub fn unlink(source: &Path, target: &Path) -> Result<LinkOutcome> {
    match io::entry_kind(target)? {
        EntryKind::Missing => Ok(LinkOutcome::Absent),
        EntryKind::Symlink if points_to(target, source)? => {
            io::remove_entry(target)?;
            tracing::debug!(target = %target.display(), "unlinked");
            Ok(LinkOutcome::Removed)
        }
        _ => Err(Error::NotManaged {
            path: target.to_path_buf(),
        }),
    }
}

/// Point the symlink at `target` to `source`, replacing a link that points
/// elsewhere. Real files and directories are `PathOccupied`.
pub fn relink(source: &Path, target: &Path) -> Result<LinkOutcome> {
    match io::entry_kind(target)? {
        EntryKind::Symlink if points_to(target, source)? => Ok(LinkOutcome::Unchanged),
        EntryKind::Symlink => {
            io::remove_entry(target)?;
            io::symlink(source, target)?;
            tracing::debug!(source = %source.display(), target = %target.display(), "relinked");
            Ok(LinkOutcome::Replaced)
        }
        EntryKind::Missing => link(source, target),
        kind => Err(occupied(target, kind)),
    }
}

/// Remove a dangling symlink at `target` that points into `root` (a managed
/// link whose item no longer exists). Live links and anything else are
/// `NotManaged`.
pub fn prune(root: &Path, target: &Path) -> Result<LinkOutcome> {
    match io::entry_kind(target)? {
        EntryKind::Missing => Ok(LinkOutcome::Absent),
        EntryKind::Symlink if points_into(target, root)? && dangles(target)? => {
            io::remove_entry(target)?;
            tracing::debug!(target = %target.display(), "pruned stale link");
            Ok(LinkOutcome::Removed)
        }
        _ => Err(Error::NotManaged {
            path: target.to_path_buf(),
        }),
    }
}

/// Copy a real local entry into the repository (replacing any repository
/// copy), then replace the local entry with a link to it.
///
/// `from` must be a real file or directory outside the repository copy;
/// links, and a `from` that reaches `into` through a linked directory, are
/// `NotManaged`.
pub fn adopt(from: &Path, into: &Path) -> Result<LinkOutcome> {
    if same_location(from, into) {
        return Err(Error::NotManaged {
            path: from.to_path_buf(),
        });
    }
    match io::entry_kind(from)? {
        EntryKind::File | EntryKind::Dir => {}
        EntryKind::Missing => {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} no longer exists", from.display()),
            )));
        }
        _ => {
            return Err(Error::NotManaged {
                path: from.to_path_buf(),
            });
        }
    }

    // Copy next to the destination first so a failed copy leaves the
    // repository untouched.
    let staging = staging_path(into);
    io::remove_entry(&staging)?;
    io::copy_tree(from, &staging)?;
    io::remove_entry(into)?;
    fs::rename(&staging, into).map_err(|e| cfgsync_fs::Error::io(into, e))?;

    io::remove_entry(from)?;
    io::symlink(into, from)?;
    tracing::debug!(from = %from.display(), into = %into.display(), "adopted");
    Ok(LinkOutcome::Replaced)
}

fn staging_path(into: &Path) -> PathBuf {
    let name = into
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    into.with_file_name(format!(".{name}.cfgsync-adopt"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Setup {
        _temp: TempDir,
        repo: PathBuf,
        host: PathBuf,
    }

    fn setup() -> Setup {
        let temp = TempDir::new().unwrap();
        let repo = dunce::canonicalize(temp.path()).unwrap().join("repo");
        let host = dunce::canonicalize(temp.path()).unwrap().join("host");
        fs::create_dir_all(repo.join("skills/foo")).unwrap();
        fs::create_dir_all(&host).unwrap();
        Setup {
            _temp: temp,
            repo,
            host,
        }
    }

    #[test]
    fn link_is_idempotent() {
        let s = setup();
        let source = s.repo.join("skills/foo");
        let target = s.host.join("skills/foo");

        assert_eq!(link(&source, &target).unwrap(), LinkOutcome::Created);
        assert_eq!(link(&source, &target).unwrap(), LinkOutcome::Unchanged);
        assert!(points_to(&target, &source).unwrap());
    }

    #[test]
    fn link_refuses_real_directory() {
        let s = setup();
        let target = s.host.join("skills/foo");
        fs::create_dir_all(&target).unwrap();

        let err = link(&s.repo.join("skills/foo"), &target).unwrap_err();
        assert!(matches!(err, Error::PathOccupied { .. }));
        assert!(target.is_dir());
    }

    #[test]
    fn link_refuses_foreign_symlink() {
        let s = setup();
        let target = s.host.join("foo");
        std::os::unix::fs::symlink("/somewhere/else", &target).unwrap();

        let err = link(&s.repo.join("skills/foo"), &target).unwrap_err();
        assert!(matches!(err, Error::PathOccupied { .. }));
    }

    #[test]
    fn unlink_refuses_real_directory() {
        let s = setup();
        let target = s.host.join("skills/foo");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("notes"), "mine").unwrap();

        let err = unlink(&s.repo.join("skills/foo"), &target).unwrap_err();
        assert!(matches!(err, Error::NotManaged { .. }));
        assert!(target.join("notes").exists());
    }

    #[test]
    fn unlink_removes_only_the_link() {
        let s = setup();
        let source = s.repo.join("skills/foo");
        let target = s.host.join("skills/foo");
        link(&source, &target).unwrap();

        assert_eq!(unlink(&source, &target).unwrap(), LinkOutcome::Removed);
        assert_eq!(unlink(&source, &target).unwrap(), LinkOutcome::Absent);
        assert!(source.is_dir());
    }

    #[test]
    fn relative_links_are_recognised() {
        let s = setup();
        let source = s.repo.join("skills/foo");
        let target = s.host.join("foo");
        std::os::unix::fs::symlink("../repo/skills/foo", &target).unwrap();

        assert!(points_to(&target, &source).unwrap());
    }

    #[test]
    fn relink_replaces_only_symlinks() {
        let s = setup();
        let source = s.repo.join("skills/foo");
        let target = s.host.join("foo");
        std::os::unix::fs::symlink("/somewhere/else", &target).unwrap();

        assert_eq!(relink(&source, &target).unwrap(), LinkOutcome::Replaced);
        assert!(points_to(&target, &source).unwrap());

        let real = s.host.join("real");
        fs::create_dir(&real).unwrap();
        assert!(matches!(
            relink(&source, &real),
            Err(Error::PathOccupied { .. })
        ));
    }

    #[test]
    fn prune_only_removes_links_into_root() {
        let s = setup();
        let stale = s.host.join("gone");
        std::os::unix::fs::symlink(s.repo.join("skills/gone"), &stale).unwrap();
        let foreign = s.host.join("foreign");
        std::os::unix::fs::symlink("/somewhere/else", &foreign).unwrap();

        assert_eq!(prune(&s.repo, &stale).unwrap(), LinkOutcome::Removed);
        assert!(matches!(
            prune(&s.repo, &foreign),
            Err(Error::NotManaged { .. })
        ));
    }

    #[test]
    fn adopt_moves_content_and_links_back() {
        let s = setup();
        let local = s.host.join("skills/bar");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join("SKILL.md"), "content").unwrap();
        let into = s.repo.join("skills/bar");

        adopt(&local, &into).unwrap();

        assert_eq!(fs::read_to_string(into.join("SKILL.md")).unwrap(), "content");
        assert!(points_to(&local, &into).unwrap());
    }

    #[test]
    fn prune_keeps_live_link_into_root() {
        let s = setup();
        let alias = s.host.join("my-alias");
        std::os::unix::fs::symlink(s.repo.join("skills/foo"), &alias).unwrap();

        assert!(!dangles(&alias).unwrap());
        assert!(matches!(
            prune(&s.repo, &alias),
            Err(Error::NotManaged { .. })
        ));
        assert!(points_to(&alias, &s.repo.join("skills/foo")).unwrap());
    }

    #[test]
    fn adopt_refuses_entry_reached_through_linked_directory() {
        let s = setup();
        fs::write(s.repo.join("skills/foo/SKILL.md"), "repo copy").unwrap();
        std::os::unix::fs::symlink(s.repo.join("skills"), s.host.join("skills")).unwrap();
        let from = s.host.join("skills/foo");
        let into = s.repo.join("skills/foo");

        assert!(matches!(adopt(&from, &into), Err(Error::NotManaged { .. })));
        assert_eq!(io::entry_kind(&into).unwrap(), EntryKind::Dir);
        assert_eq!(fs::read_to_string(into.join("SKILL.md")).unwrap(), "repo copy");
    }

    #[test]
    fn link_refuses_target_inside_repository() {
        let s = setup();
        std::os::unix::fs::symlink(s.repo.join("skills"), s.host.join("skills")).unwrap();
        let source = s.repo.join("skills/new");

        let err = link(&source, &s.host.join("skills/new")).unwrap_err();
        assert!(matches!(err, Error::NotManaged { .. }));
        assert_eq!(io::entry_kind(&source).unwrap(), EntryKind::Missing);
    }
}
