//! Store error-message, atomic-write-safety, and init integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use sitekit_core::{store, RemoteProfile, SiteConfig, SiteName, StoreError};
use std::fs;

fn site() -> SiteName {
    SiteName::from("campaign")
}

fn remote() -> RemoteProfile {
    RemoteProfile::new("https://abc.supabase.co", "anon-key")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_profile_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = store::load_profile_at(home.path(), &site()).unwrap_err();
    assert!(matches!(err, StoreError::SiteNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("site not found"));
    assert!(err.to_string().contains("site.yaml"));
}

#[test]
fn load_corrupt_document_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".sitekit/sites/campaign/config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = store::load_config_at(home.path(), &site()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "must contain file path, got: {err}");
}

#[test]
fn load_wrong_type_document_returns_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".sitekit/sites/campaign/config.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = store::load_config_at(home.path(), &site()).unwrap_err();
    assert!(matches!(err, StoreError::Parse { .. }), "got: {err}");
}

#[test]
fn partial_document_is_completed_from_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".sitekit/sites/campaign/config.yaml")
        .write_str(
            "identity:\n  name: Harbour Alliance\nteam:\n  - id: 42\n    name: Ada\n    role: Chair\n",
        )
        .expect("write");

    let config = store::load_config_at(home.path(), &site()).expect("load");
    assert_eq!(config.identity.name, "Harbour Alliance");
    assert_eq!(config.identity.tagline, SiteConfig::default().identity.tagline);
    assert_eq!(config.team[0].id.as_str(), "42");
    assert_eq!(config.social_media.len(), 3, "missing collections take default seeds");
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    store::save_config_at(home.path(), &site(), &SiteConfig::default()).expect("save");

    let path = store::config_path_at(home.path(), &site());
    let original = fs::read(&path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = path.with_file_name("config.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    assert_eq!(original, fs::read(&path).expect("read after crash"));
    assert!(store::load_config_at(home.path(), &site()).is_ok());
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_profile_and_document() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    store::init_at(home.path(), site(), remote()).expect("init");

    home.child(".sitekit/sites/campaign/site.yaml")
        .assert(predicate::path::exists());
    home.child(".sitekit/sites/campaign/config.yaml")
        .assert(predicate::str::contains("social_media"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = store::profile_path_at(home.path(), &site());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn profile_defaults_fill_optional_fields() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".sitekit/sites/campaign/site.yaml")
        .write_str(
            "name: campaign\nremote:\n  url: https://abc.supabase.co\n  anon_key: k\n\
             created_at: 2024-01-01T00:00:00Z\nupdated_at: 2024-01-01T00:00:00Z\n",
        )
        .expect("write");

    let profile = store::load_profile_at(home.path(), &site()).expect("load");
    assert_eq!(profile.remote.settings_id, 1);
    assert_eq!(profile.remote.timeout_secs, 30);
    assert_eq!(profile.remote.max_retries, 3);
}

#[test]
fn session_file_is_private() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let session = sitekit_core::Session {
        access_token: "jwt".into(),
        refresh_token: None,
        email: "ops@example.org".into(),
        expires_at: None,
    };
    store::save_session_at(home.path(), &site(), &session).expect("save");
    home.child(".sitekit/sites/campaign/session.json")
        .assert(predicate::str::contains("ops@example.org"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = store::session_path_at(home.path(), &site());
        let mode = fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
