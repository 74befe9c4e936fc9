//! SHA-256 checksum utilities
//!
//! Backup payloads are fingerprinted as `sha256:<hex>` over the whole entry
//! tree so a restore can refuse tampered or truncated archives.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::io::{EntryKind, entry_kind};
use crate::{Error, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute a checksum over a whole entry without following symlinks.
///
/// Files hash their bytes, symlinks hash their raw target, and directories
/// hash every child (sorted by name) together with its relative path, so a
/// renamed, added, or removed file changes the result.
pub fn compute_tree_checksum(path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    hash_entry(path, Path::new(""), &mut hasher)?;
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}

fn hash_entry(path: &Path, relative: &Path, hasher: &mut Sha256) -> Result<()> {
    let rel = relative.to_string_lossy().replace('\\', "/");
    match entry_kind(path)? {
        EntryKind::File => {
            let content = fs::read(path).map_err(|e| Error::io(path, e))?;
            hasher.update(b"F\0");
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(&content);
        }
        EntryKind::Symlink => {
            let target = fs::read_link(path).map_err(|e| Error::io(path, e))?;
            hasher.update(b"L\0");
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            hasher.update(target.to_string_lossy().as_bytes());
            hasher.update(b"\0");
        }
        EntryKind::Dir => {
            hasher.update(b"D\0");
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            let mut children = fs::read_dir(path)
                .map_err(|e| Error::io(path, e))?
                .map(|entry| entry.map(|e| e.file_name()))
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(|e| Error::io(path, e))?;
            children.sort();
            for name in children {
                hash_entry(&path.join(&name), &relative.join(&name), hasher)?;
            }
        }
        EntryKind::Missing | EntryKind::Other => {
            return Err(Error::UnsupportedEntry {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_checksum_has_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.md");
        std::fs::write(&path, "hello world").unwrap();

        let checksum = compute_tree_checksum(&path).unwrap();
        assert!(checksum.starts_with("sha256:"));
        assert_eq!(checksum.len(), "sha256:".len() + 64);
    }

    #[test]
    fn tree_checksum_detects_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.md");
        std::fs::write(&path, "before").unwrap();
        let before = compute_tree_checksum(&path).unwrap();

        std::fs::write(&path, "after").unwrap();
        assert_ne!(before, compute_tree_checksum(&path).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn tree_checksum_hashes_link_target_not_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one"), "same").unwrap();
        std::fs::write(dir.path().join("two"), "same").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path().join("one"), &link).unwrap();
        let first = compute_tree_checksum(&link).unwrap();

        std::fs::remove_file(&link).unwrap();
        std::os::unix::fs::symlink(dir.path().join("two"), &link).unwrap();
        assert_ne!(first, compute_tree_checksum(&link).unwrap());
    }

    #[test]
    fn tree_checksum_of_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(compute_tree_checksum(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn tree_checksum_is_independent_of_location() {
        let dir = tempfile::tempdir().unwrap();
        for root in ["a", "b"] {
            let base = dir.path().join(root);
            std::fs::create_dir_all(base.join("nested")).unwrap();
            std::fs::write(base.join("SKILL.md"), "---\nname: x\n---\n").unwrap();
            std::fs::write(base.join("nested/notes.txt"), "notes").unwrap();
        }

        let a = compute_tree_checksum(&dir.path().join("a")).unwrap();
        let b = compute_tree_checksum(&dir.path().join("b")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tree_checksum_detects_renames() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("item");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("one.txt"), "same").unwrap();
        let before = compute_tree_checksum(&base).unwrap();

        std::fs::rename(base.join("one.txt"), base.join("two.txt")).unwrap();
        let after = compute_tree_checksum(&base).unwrap();
        assert_ne!(before, after);
    }
}
