//! Repository context detection
//!
//! Finds the repository root from any directory below it, git-style, and
//! builds the engine with command-line target overrides applied.

use std::path::{Path, PathBuf};

use cfgsync_core::{SyncConfig, SyncEngine, TargetSpec};
use cfgsync_fs::SyncPath;

use crate::error::Result;

/// Walk up from `cwd` to the first directory holding `.cfgsync/` or
/// `skills/`. Falls back to `cwd` itself.
pub fn discover_root(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .find(|dir| is_repo_root(dir))
        .unwrap_or(cwd)
        .to_path_buf()
}

fn is_repo_root(dir: &Path) -> bool {
    dir.join(SyncPath::StateDir.as_str()).is_dir() || dir.join("skills").is_dir()
}

/// Open the engine for `repo` (or the discovered root), replacing the
/// configured targets when any were given on the command line.
pub fn open_engine(repo: Option<&Path>, targets: &[TargetSpec]) -> Result<SyncEngine> {
    let root = match repo {
        Some(path) => path.to_path_buf(),
        None => discover_root(&std::env::current_dir()?),
    };
    tracing::debug!(root = %root.display(), "using repository");

    let mut config = SyncConfig::load(&root)?;
    if !targets.is_empty() {
        config = config.with_targets(targets.iter().map(TargetSpec::resolve).collect());
    }
    Ok(SyncEngine::new(&root, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn discovers_state_dir_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".cfgsync")).unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_root(&nested), temp.path());
    }

    #[test]
    fn discovers_skills_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("skills/foo")).unwrap();

        assert_eq!(discover_root(&temp.path().join("skills/foo")), temp.path());
    }

    #[test]
    fn falls_back_to_cwd() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("plain");
        fs::create_dir_all(&nested).unwrap();

        // Only holds if no ancestor of the temp dir looks like a repository
        if temp.path().ancestors().all(|dir| !is_repo_root(dir)) {
            assert_eq!(discover_root(&nested), nested);
        }
    }

    #[test]
    fn command_line_targets_replace_config() {
        let temp = TempDir::new().unwrap();
        let spec: TargetSpec = "only=/tmp/only".parse().unwrap();

        let engine = open_engine(Some(temp.path()), &[spec]).unwrap();

        assert_eq!(engine.config().targets.len(), 1);
        assert_eq!(engine.config().targets[0].name, "only");
    }

    #[test]
    fn missing_repository_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(open_engine(Some(&temp.path().join("missing")), &[]).is_err());
    }
}
