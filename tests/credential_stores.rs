//! Integration tests for credential store selection and the file backends.
//!
//! These tests go through [`CredentialStoreSelector`] the way the helper
//! does at runtime, configured from an explicit environment and an
//! in-memory Git configuration.

use std::sync::Arc;

use serial_test::serial;
use tempfile::TempDir;

use gcred::core::environment::{Environment, OsKind, Platform};
use gcred::core::settings::Settings;
use gcred::git::mock::MemoryConfig;
use gcred::git::ConfigLevel;
use gcred::store::{
    service_slug, CredentialStore, CredentialStoreSelector, FileCredentialStore, StoreError,
    StoreKind,
};

// =============================================================================
// Test Fixtures
// =============================================================================

fn selector(vars: &[(&str, &str)], config: MemoryConfig, os: OsKind) -> CredentialStoreSelector {
    let settings = Settings::new(Environment::from_vars(vars.iter().copied()), Arc::new(config));
    CredentialStoreSelector::new(settings, Platform::new(os, false))
}

fn unavailable_message(err: StoreError) -> String {
    match err {
        StoreError::Unavailable(message) => message,
        other => panic!("expected an unavailable store, got {:?}", other),
    }
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn store_name_from_git_config() {
    let temp = TempDir::new().unwrap();
    let config = MemoryConfig::new();
    config.seed(ConfigLevel::Global, "credential.credentialStore", "PlainText");
    config.seed(
        ConfigLevel::Global,
        "credential.plaintextStorePath",
        &temp.path().to_string_lossy(),
    );
    let store = selector(&[], config, OsKind::Linux);

    assert_eq!(store.selected_kind().unwrap(), StoreKind::Plaintext);
    store.add_or_update("https://example.com", "alice", "pw").unwrap();
    assert_eq!(store.get_accounts("https://example.com").unwrap(), vec!["alice"]);
}

#[test]
fn environment_beats_git_config() {
    let config = MemoryConfig::new();
    config.seed(ConfigLevel::Global, "credential.credentialStore", "plaintext");
    let store = selector(&[("GCRED_CREDENTIAL_STORE", "cache")], config, OsKind::Linux);

    assert_eq!(store.selected_kind().unwrap(), StoreKind::Cache);
}

#[test]
fn linux_without_selection_explains_choices() {
    let store = selector(&[], MemoryConfig::new(), OsKind::Linux);

    let message = unavailable_message(store.get_accounts("https://example.com").unwrap_err());
    assert!(message.contains("No credential store has been selected"));
    assert!(message.contains("GCRED_CREDENTIAL_STORE"));
    assert!(message.contains("secretservice"));
    assert!(message.contains("plaintext"));
    assert!(!message.contains("wincredman"));
}

#[test]
fn dpapi_is_windows_only() {
    let store = selector(&[("GCRED_CREDENTIAL_STORE", "dpapi")], MemoryConfig::new(), OsKind::MacOs);

    let message = unavailable_message(store.get("https://example.com", None).unwrap_err());
    assert!(message.contains("dpapi"));
    assert!(message.contains("Windows"));
}

// =============================================================================
// File store behaviour through the selector
// =============================================================================

#[test]
fn credentials_survive_a_new_selector() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let vars = [
        ("GCRED_CREDENTIAL_STORE", "plaintext"),
        ("GCRED_PLAINTEXT_STORE_PATH", root.as_str()),
    ];

    let first = selector(&vars, MemoryConfig::new(), OsKind::Linux);
    first.add_or_update("https://example.com/org/repo", "alice", "pw1").unwrap();
    first.add_or_update("https://example.com/org/repo", "bob", "pw2").unwrap();

    let second = selector(&vars, MemoryConfig::new(), OsKind::Linux);
    let mut accounts = second.get_accounts("https://example.com/org/repo").unwrap();
    accounts.sort();
    assert_eq!(accounts, vec!["alice", "bob"]);

    let bob = second.get("https://example.com/org/repo", Some("bob")).unwrap().unwrap();
    assert_eq!(bob.password(), "pw2");

    assert!(second.remove("https://example.com/org/repo", Some("alice")).unwrap());
    assert!(!second.remove("https://example.com/org/repo", Some("alice")).unwrap());
    assert_eq!(
        second.get_accounts("https://example.com/org/repo").unwrap(),
        vec!["bob"]
    );
}

#[test]
fn namespaces_do_not_see_each_other() {
    let temp = TempDir::new().unwrap();
    let git = FileCredentialStore::plaintext(temp.path().to_path_buf(), "git");
    let other = FileCredentialStore::plaintext(temp.path().to_path_buf(), "other");

    git.add_or_update("https://example.com", "alice", "pw").unwrap();
    other.add_or_update("https://example.com", "carol", "pw").unwrap();

    assert_eq!(git.get_accounts("https://example.com").unwrap(), vec!["alice"]);
    assert_eq!(other.get_accounts("https://example.com").unwrap(), vec!["carol"]);
}

#[test]
fn entries_live_under_service_directory() {
    let temp = TempDir::new().unwrap();
    let store = FileCredentialStore::plaintext(temp.path().to_path_buf(), "git");
    store.add_or_update("https://example.com:8443/org", "alice", "pw").unwrap();

    let mut expected = temp.path().to_path_buf();
    for part in service_slug(Some("git"), "https://example.com:8443/org") {
        expected.push(part);
    }
    assert_eq!(store.service_dir("https://example.com:8443/org"), expected);
    assert!(expected.is_dir());
}

// =============================================================================
// Process environment
// =============================================================================

#[test]
#[serial]
fn process_environment_selects_store() {
    let temp = TempDir::new().unwrap();
    std::env::set_var("GCRED_CREDENTIAL_STORE", "plaintext");
    std::env::set_var("GCRED_PLAINTEXT_STORE_PATH", temp.path());

    let settings = Settings::new(Environment::from_process(), Arc::new(MemoryConfig::new()));
    let store = CredentialStoreSelector::new(settings, Platform::new(OsKind::Linux, false));
    let result = store.add_or_update("https://example.com", "alice", "pw");

    std::env::remove_var("GCRED_CREDENTIAL_STORE");
    std::env::remove_var("GCRED_PLAINTEXT_STORE_PATH");

    result.unwrap();
    assert_eq!(store.get_accounts("https://example.com").unwrap(), vec!["alice"]);
}
