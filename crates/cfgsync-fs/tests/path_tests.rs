use cfgsync_fs::NormalizedPath;
use rstest::rstest;

#[rstest]
#[case("foo/bar/baz", "foo/bar/baz")]
#[case("foo\\bar\\baz", "foo/bar/baz")]
#[case("foo/bar\\baz", "foo/bar/baz")]
#[case("foo//bar/", "foo/bar")]
#[case("/home/user/./.claude/../.codex", "/home/user/.codex")]
fn test_normalize(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(NormalizedPath::new(input).as_str(), expected);
}

#[test]
fn test_join_paths() {
    let base = NormalizedPath::new("foo/bar");
    let joined = base.join("baz");
    assert_eq!(joined.as_str(), "foo/bar/baz");
}

#[test]
fn test_join_resolves_parent_segments() {
    let base = NormalizedPath::new("/repo/skills");
    assert_eq!(base.join("../agents/x.md").as_str(), "/repo/agents/x.md");
}

#[test]
fn test_parent_and_file_name() {
    let path = NormalizedPath::new("/repo/skills/foo");
    assert_eq!(path.file_name(), Some("foo"));
    assert_eq!(path.parent().unwrap().as_str(), "/repo/skills");
    assert_eq!(NormalizedPath::new("/repo").parent().unwrap().as_str(), "/");
    assert!(NormalizedPath::new("/").parent().is_none());
}

#[test]
fn test_extension() {
    assert_eq!(NormalizedPath::new("agents/reviewer.md").extension(), Some("md"));
    assert_eq!(NormalizedPath::new("skills/.hidden").extension(), None);
    assert_eq!(NormalizedPath::new("skills/foo").extension(), None);
}

#[test]
fn test_starts_with_is_component_wise() {
    let repo = NormalizedPath::new("/home/me/repo");
    assert!(NormalizedPath::new("/home/me/repo/skills/foo").starts_with(&repo));
    assert!(NormalizedPath::new("/home/me/repo").starts_with(&repo));
    assert!(!NormalizedPath::new("/home/me/repository/skills").starts_with(&repo));
}

#[test]
fn test_unc_prefix_survives_join() {
    let share = NormalizedPath::new("//server/share");
    assert_eq!(share.join("skills").as_str(), "//server/share/skills");
}
