use cfgsync_fs::io::{self, EntryKind};
use cfgsync_fs::{Error, NormalizedPath, RobustnessConfig};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("nested/dir/test.txt"));

    io::write_atomic(&path, b"hello world").unwrap();

    let content = fs::read_to_string(path.to_native()).unwrap();
    assert_eq!(content, "hello world");
}

#[test]
fn test_write_atomic_overwrites_without_leftovers() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("test.txt");
    fs::write(&file_path, "original").unwrap();

    io::write_atomic(&NormalizedPath::new(&file_path), b"updated").unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_read_text_nonexistent_file() {
    let path = NormalizedPath::new("/nonexistent/file.txt");
    let result = io::read_text(&path);
    assert!(matches!(result, Err(Error::Io { .. })));
}

#[test]
fn test_copy_tree_copies_nested_content() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(src.join("a/b")).unwrap();
    fs::write(src.join("top.txt"), "top").unwrap();
    fs::write(src.join("a/b/deep.txt"), "deep").unwrap();

    let dst = temp.path().join("out/copy");
    io::copy_tree(&src, &dst).unwrap();

    assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
    assert_eq!(fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "deep");
}

#[cfg(unix)]
#[test]
fn test_copy_tree_preserves_symlinks() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir(&src).unwrap();
    std::os::unix::fs::symlink("../elsewhere", src.join("link")).unwrap();

    let dst = temp.path().join("dst");
    io::copy_tree(&src, &dst).unwrap();

    assert_eq!(io::entry_kind(&dst.join("link")).unwrap(), EntryKind::Symlink);
    assert_eq!(
        fs::read_link(dst.join("link")).unwrap(),
        std::path::PathBuf::from("../elsewhere")
    );
}

#[test]
fn test_remove_entry_on_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("dir");
    fs::create_dir_all(dir.join("inner")).unwrap();
    fs::write(dir.join("inner/file"), "x").unwrap();

    assert!(io::remove_entry(&dir).unwrap());
    assert_eq!(io::entry_kind(&dir).unwrap(), EntryKind::Missing);
}

#[test]
fn test_lock_is_exclusive() {
    let temp = TempDir::new().unwrap();
    let lock_path = NormalizedPath::new(temp.path().join(".cfgsync/lock"));
    let config = RobustnessConfig {
        lock_timeout: Duration::from_millis(100),
        retry_interval: Duration::from_millis(10),
    };

    let guard = io::acquire_lock(&lock_path, config).unwrap();
    assert!(guard.path().exists());

    let second = io::acquire_lock(&lock_path, config);
    assert!(matches!(second, Err(Error::LockFailed { .. })));

    drop(guard);
    assert!(io::acquire_lock(&lock_path, config).is_ok());
}
