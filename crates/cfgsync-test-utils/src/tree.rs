//! Capture the state of a directory tree for before/after comparisons.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// State of one entry, never following symlinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState {
    Dir,
    File(Vec<u8>),
    Link(PathBuf),
}

/// Every entry under a root, keyed by path relative to it.
pub type TreeState = BTreeMap<PathBuf, EntryState>;

/// Capture every entry under `root`.
pub fn capture(root: &Path) -> TreeState {
    let mut state = TreeState::new();
    walk(root, Path::new(""), &mut state);
    state
}

fn walk(dir: &Path, relative: &Path, state: &mut TreeState) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let entry = entry.unwrap();
        let path = entry.path();
        let rel = relative.join(entry.file_name());
        let file_type = entry.file_type().unwrap();
        if file_type.is_symlink() {
            state.insert(rel, EntryState::Link(fs::read_link(&path).unwrap()));
        } else if file_type.is_dir() {
            state.insert(rel.clone(), EntryState::Dir);
            walk(&path, &rel, state);
        } else {
            state.insert(rel, EntryState::File(fs::read(&path).unwrap()));
        }
    }
}
