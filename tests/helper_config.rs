//! Integration tests for credential helper installation.
//!
//! These tests write to the local configuration of a real repository
//! through [`Git2Configuration`], so ordering and escaping are checked
//! against what libgit2 actually stores.

use tempfile::TempDir;

use gcred::git::helper::{configure, unconfigure};
use gcred::git::{ConfigLevel, Git2Configuration, GitConfiguration};

const PROGRAM: &str = "/opt/gcred bin/git-credential-gcred";

/// Test fixture with a freshly initialised repository.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        git2::Repository::init(dir.path()).expect("failed to init repo");
        Self { dir }
    }

    fn git(&self) -> Git2Configuration {
        Git2Configuration::discover(self.dir.path())
    }

    fn helpers(&self) -> Vec<String> {
        self.git()
            .get_all(ConfigLevel::Local, "credential.helper")
            .expect("failed to read helpers")
    }
}

#[test]
fn configure_appends_blank_then_program() {
    let repo = TestRepo::new();
    let git = repo.git();

    assert!(configure(&git, ConfigLevel::Local, PROGRAM).unwrap());
    assert_eq!(repo.helpers(), vec!["".to_string(), "/opt/gcred\\ bin/git-credential-gcred".to_string()]);
}

#[test]
fn configure_twice_changes_nothing() {
    let repo = TestRepo::new();
    let git = repo.git();

    assert!(configure(&git, ConfigLevel::Local, PROGRAM).unwrap());
    assert!(!configure(&git, ConfigLevel::Local, PROGRAM).unwrap());
    assert_eq!(repo.helpers().len(), 2);
}

#[test]
fn configure_after_other_helpers_moves_program_last() {
    let repo = TestRepo::new();
    let git = repo.git();
    git.add(ConfigLevel::Local, "credential.helper", "/opt/gcred\\ bin/git-credential-gcred").unwrap();
    git.add(ConfigLevel::Local, "credential.helper", "cache --timeout=300").unwrap();

    assert!(configure(&git, ConfigLevel::Local, PROGRAM).unwrap());
    assert_eq!(
        repo.helpers(),
        vec![
            "cache --timeout=300".to_string(),
            "".to_string(),
            "/opt/gcred\\ bin/git-credential-gcred".to_string(),
        ]
    );
}

#[test]
fn unconfigure_restores_previous_helpers() {
    let repo = TestRepo::new();
    let git = repo.git();
    git.add(ConfigLevel::Local, "credential.helper", "cache").unwrap();

    configure(&git, ConfigLevel::Local, PROGRAM).unwrap();
    assert!(unconfigure(&git, ConfigLevel::Local, PROGRAM).unwrap());
    assert_eq!(repo.helpers(), vec!["cache".to_string()]);

    assert!(!unconfigure(&git, ConfigLevel::Local, PROGRAM).unwrap());
}

#[test]
fn merged_view_includes_local_entries() {
    let repo = TestRepo::new();
    let git = repo.git();
    configure(&git, ConfigLevel::Local, PROGRAM).unwrap();

    let merged = git.get_all(ConfigLevel::All, "credential.helper").unwrap();
    assert_eq!(merged.last().map(String::as_str), Some("/opt/gcred\\ bin/git-credential-gcred"));
}
