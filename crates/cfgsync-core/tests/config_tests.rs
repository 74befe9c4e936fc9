//! Tests for repository configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use cfgsync_core::config::{ConfigFile, SyncConfig, TargetSpec};
use cfgsync_core::{Category, Error};
use rstest::rstest;
use tempfile::TempDir;

fn write_config(root: &Path, name: &str, content: &str) {
    let dir = root.join(".cfgsync");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

mod formats {
    use super::*;

    #[rstest]
    #[case(
        "config.toml",
        "[[targets]]\nname = \"host\"\nroot = \"/srv/host\"\n"
    )]
    #[case(
        "config.json",
        r#"{"targets": [{"name": "host", "root": "/srv/host"}]}"#
    )]
    #[case("config.yaml", "targets:\n  - name: host\n    root: /srv/host\n")]
    #[case("config.yml", "targets:\n  - name: host\n    root: /srv/host\n")]
    fn every_format_loads_targets(#[case] file: &str, #[case] content: &str) {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), file, content);

        let config = SyncConfig::load(temp.path()).unwrap();

        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].name, "host");
        assert_eq!(config.targets[0].root, PathBuf::from("/srv/host"));
    }

    #[test]
    fn toml_takes_precedence_over_json() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.toml",
            "[[targets]]\nname = \"from-toml\"\nroot = \"/a\"\n",
        );
        write_config(
            temp.path(),
            "config.json",
            r#"{"targets": [{"name": "from-json", "root": "/b"}]}"#,
        );

        let config = SyncConfig::load(temp.path()).unwrap();
        assert_eq!(config.targets[0].name, "from-toml");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.toml", "[[targets]\n");

        let err = SyncConfig::load(temp.path()).unwrap_err();
        assert!(matches!(err, Error::Fs(cfgsync_fs::Error::ConfigParse { .. })));
    }
}

mod categories {
    use super::*;

    #[test]
    fn overrides_change_layout_and_rules() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.toml",
            r#"
[categories.skill]
target_dir = "commands"
name_matches_identifier = false

[categories.setting]
repo_dir = "host-settings"
"#,
        );

        let config = SyncConfig::load(temp.path()).unwrap();

        let skill = config.category(Category::Skill);
        assert_eq!(skill.target_dir, "commands");
        assert_eq!(skill.repo_dir, "skills");
        assert!(!skill.rules.name_matches_identifier);
        assert_eq!(skill.rules.required_fields, vec!["name", "description"]);
        assert_eq!(config.category(Category::Setting).repo_dir, "host-settings");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.toml", "[categories.plugin]\nrepo_dir = \"x\"\n");

        assert!(SyncConfig::load(temp.path()).is_err());
    }

    #[test]
    fn empty_file_means_defaults() {
        let file = ConfigFile::default();
        let config = SyncConfig::from_file(&file);
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.categories().len(), 4);
    }
}

mod targets {
    use super::*;

    #[test]
    fn home_is_expanded() {
        let spec: TargetSpec = "claude=~/.claude".parse().unwrap();
        let env = spec.resolve();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(env.root, home.join(".claude"));
        }
    }

    #[test]
    fn command_line_targets_replace_configured_ones() {
        let spec: TargetSpec = "only=/tmp/only".parse().unwrap();
        let config = SyncConfig::default().with_targets(vec![spec.resolve()]);
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].name, "only");
    }
}
