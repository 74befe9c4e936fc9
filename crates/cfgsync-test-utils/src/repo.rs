//! [`TestRepo`] builder for cfgsync test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::tree::{TreeState, capture};

/// A temporary directory holding a repository (`repo/`) and one or more
/// host environments (`hosts/<name>/`).
///
/// # Example
///
/// ```rust,no_run
/// use cfgsync_test_utils::repo::TestRepo;
///
/// let repo = TestRepo::new();
/// repo.write_valid_skill("foo");
/// repo.write_local_dir("host", "skills/bar");
/// repo.assert_real_dir("host", "skills/bar");
/// ```
pub struct TestRepo {
    /// Removed on drop
    _temp_dir: TempDir,
    base: PathBuf,
    hosts: Vec<String>,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    /// Repository plus a single host named `host`.
    pub fn new() -> Self {
        Self::with_hosts(&["host"])
    }

    /// Repository plus one existing root per host name.
    pub fn with_hosts(hosts: &[&str]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        // Canonical so link targets compare equal to engine paths
        let base = fs::canonicalize(temp_dir.path()).unwrap();
        fs::create_dir_all(base.join("repo")).unwrap();
        for host in hosts {
            fs::create_dir_all(base.join("hosts").join(host)).unwrap();
        }
        Self {
            _temp_dir: temp_dir,
            base,
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Temporary directory containing everything.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn repo_root(&self) -> PathBuf {
        self.base.join("repo")
    }

    /// Root of host `name` (whether or not it exists).
    pub fn host(&self, name: &str) -> PathBuf {
        self.base.join("hosts").join(name)
    }

    /// `(name, root)` for every host created by the builder.
    pub fn targets(&self) -> Vec<(String, PathBuf)> {
        self.hosts
            .iter()
            .map(|name| (name.clone(), self.host(name)))
            .collect()
    }

    /// `name=path` arguments for `--target`.
    pub fn target_args(&self) -> Vec<String> {
        self.targets()
            .into_iter()
            .map(|(name, root)| format!("{}={}", name, root.display()))
            .collect()
    }

    /// Write `content` to `path` relative to the repository root.
    pub fn write_repo_file(&self, path: &str, content: &str) -> PathBuf {
        let full = self.repo_root().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();
        full
    }

    /// Skill directory with `SKILL.md` set to `document`.
    pub fn write_skill(&self, name: &str, document: &str) -> PathBuf {
        self.write_repo_file(&format!("skills/{name}/SKILL.md"), document);
        self.repo_root().join("skills").join(name)
    }

    /// Skill whose header satisfies the default rules.
    pub fn write_valid_skill(&self, name: &str) -> PathBuf {
        self.write_skill(name, &skill_document(name, "Does things"))
    }

    /// Single-file agent at `agents/<name>`.
    pub fn write_agent(&self, name: &str, document: &str) -> PathBuf {
        self.write_repo_file(&format!("agents/{name}"), document)
    }

    /// Write `content` to `path` relative to host `host`.
    pub fn write_local_file(&self, host: &str, path: &str, content: &str) -> PathBuf {
        let full = self.host(host).join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();
        full
    }

    /// Real directory (with a marker file) at `path` inside host `host`.
    pub fn write_local_dir(&self, host: &str, path: &str) -> PathBuf {
        let full = self.host(host).join(path);
        fs::create_dir_all(&full).unwrap();
        fs::write(full.join("notes.txt"), "local data").unwrap();
        full
    }

    /// Real skill directory inside host `host`.
    pub fn write_local_skill(&self, host: &str, name: &str, document: &str) -> PathBuf {
        self.write_local_file(host, &format!("skills/{name}/SKILL.md"), document);
        self.host(host).join("skills").join(name)
    }

    /// Symlink at `path` inside host `host` pointing at `target`.
    #[cfg(unix)]
    pub fn write_local_link(&self, host: &str, path: &str, target: &Path) -> PathBuf {
        let full = self.host(host).join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(target, &full).unwrap();
        full
    }

    /// State of every entry under the temporary directory, excluding the
    /// engine's own `repo/.cfgsync` state (lock file and backups).
    pub fn tree(&self) -> TreeState {
        let state_dir = Path::new("repo").join(".cfgsync");
        let mut tree = capture(&self.base);
        tree.retain(|path, _| !path.starts_with(&state_dir));
        tree
    }

    /// Assert that `path` inside host `host` is a symlink to `repo_path`
    /// (relative to the repository root).
    ///
    /// # Panics
    /// Panics if the entry is not a symlink or points elsewhere.
    pub fn assert_link(&self, host: &str, path: &str, repo_path: &str) {
        let full = self.host(host).join(path);
        let meta = fs::symlink_metadata(&full)
            .unwrap_or_else(|_| panic!("Expected symlink at {}", full.display()));
        assert!(
            meta.file_type().is_symlink(),
            "Expected symlink at {}, found another entry",
            full.display()
        );
        let target = fs::read_link(&full).unwrap();
        let target = if target.is_absolute() {
            target
        } else {
            full.parent().unwrap().join(target)
        };
        assert_eq!(
            target,
            self.repo_root().join(repo_path),
            "Symlink {} points elsewhere",
            full.display()
        );
    }

    /// Assert that `path` inside host `host` is a real directory.
    ///
    /// # Panics
    /// Panics if the entry is missing, a symlink, or a file.
    pub fn assert_real_dir(&self, host: &str, path: &str) {
        let full = self.host(host).join(path);
        let meta = fs::symlink_metadata(&full)
            .unwrap_or_else(|_| panic!("Expected directory at {}", full.display()));
        assert!(
            meta.file_type().is_dir(),
            "Expected real directory at {}",
            full.display()
        );
    }

    /// Assert that nothing (not even a dangling link) exists at `path` inside
    /// host `host`.
    pub fn assert_absent(&self, host: &str, path: &str) {
        let full = self.host(host).join(path);
        assert!(
            fs::symlink_metadata(&full).is_err(),
            "Expected nothing at {}",
            full.display()
        );
    }
}

/// A `SKILL.md` document with `name` and `description` headers.
pub fn skill_document(name: &str, description: &str) -> String {
    format!("---\nname: {name}\ndescription: {description}\n---\n\n# {name}\n")
}
