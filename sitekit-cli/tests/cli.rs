use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use sitekit_core::{store, EntityId, NewsItem, SiteName};
use tempfile::TempDir;

/// Loopback discard port: nothing listens, and nothing here should dial it.
const OFFLINE_URL: &str = "http://127.0.0.1:9";

fn sitekit(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sitekit"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("SITEKIT_REMOTE_URL")
        .env_remove("SITEKIT_ANON_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn init_site(home: &Path, url: &str) {
    sitekit(home)
        .args(["init", "campaign", "--url", url, "--anon-key", "anon"])
        .assert()
        .success()
        .stdout(contains("Initialised 'campaign'"));
}

#[test]
fn init_writes_profile_and_default_document() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);

    let site = SiteName::from("campaign");
    let profile = store::load_profile_at(home.path(), &site).expect("profile");
    assert_eq!(profile.remote.url, OFFLINE_URL);
    assert_eq!(profile.remote.settings_id, 1);
    assert!(store::config_path_at(home.path(), &site).is_file());
}

#[test]
fn status_json_reports_never_synced() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);

    let assert = sitekit(home.path())
        .args(["status", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("status JSON");
    assert_eq!(payload[0]["site"], "campaign");
    assert_eq!(payload[0]["status"], "never-synced");
    assert_eq!(payload[0]["last_sync_age"], "never");
}

#[test]
fn reset_restores_defaults() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);
    let site = SiteName::from("campaign");

    let mut config = store::load_config_at(home.path(), &site).unwrap();
    config.identity.name = "Draft".into();
    store::save_config_at(home.path(), &site, &config).unwrap();

    sitekit(home.path())
        .args(["reset", "campaign"])
        .assert()
        .success();
    let config = store::load_config_at(home.path(), &site).unwrap();
    assert_ne!(config.identity.name, "Draft");
}

#[test]
fn reset_unknown_site_fails() {
    let home = TempDir::new().expect("home");
    sitekit(home.path())
        .args(["reset", "ghost"])
        .assert()
        .failure()
        .stderr(contains("site not found"));
}

#[test]
fn push_rejects_invalid_document_before_contacting_backend() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);
    let site = SiteName::from("campaign");

    let mut config = store::load_config_at(home.path(), &site).unwrap();
    config.news.push(NewsItem {
        id: EntityId::from("new-1-0"),
        title: "Gala".into(),
        date: "next friday".into(),
        content: String::new(),
        image_url: String::new(),
        images: Vec::new(),
        is_featured: false,
        tags: Vec::new(),
        slug: None,
    });
    store::save_config_at(home.path(), &site, &config).unwrap();

    sitekit(home.path())
        .args(["push", "campaign"])
        .assert()
        .failure()
        .stderr(contains("news[0].date"))
        .stderr(contains("push failed for campaign"));
}

#[test]
fn push_without_backend_config_names_the_env_vars() {
    let home = TempDir::new().expect("home");
    sitekit(home.path())
        .args(["init", "campaign"])
        .assert()
        .success()
        .stdout(contains("No backend configured"));

    sitekit(home.path())
        .args(["push", "campaign", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("SITEKIT_REMOTE_URL"));
}

#[test]
fn push_rejects_unknown_part() {
    let home = TempDir::new().expect("home");
    sitekit(home.path())
        .args(["push", "campaign", "--only", "gallery"])
        .assert()
        .failure()
        .stderr(contains("unknown scope 'gallery'"));
}

#[test]
fn pull_refuses_to_overwrite_unpushed_edits() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);
    let site = SiteName::from("campaign");

    let mut config = store::load_config_at(home.path(), &site).unwrap();
    config.footer.description = "Edited offline".into();
    store::save_config_at(home.path(), &site, &config).unwrap();

    sitekit(home.path())
        .args(["pull", "campaign"])
        .assert()
        .failure()
        .stderr(contains("local changes not yet pushed: footer"));
}

#[test]
fn offline_diff_needs_a_previous_sync() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);

    sitekit(home.path())
        .args(["diff", "campaign", "--offline"])
        .assert()
        .failure()
        .stderr(contains("has never been synced"));
}

#[test]
fn logout_without_session_is_harmless() {
    let home = TempDir::new().expect("home");
    init_site(home.path(), OFFLINE_URL);

    sitekit(home.path())
        .args(["logout", "campaign"])
        .assert()
        .success()
        .stdout(contains("has no stored session"));
}

#[test]
fn daemon_status_when_not_running() {
    let home = TempDir::new().expect("home");
    sitekit(home.path())
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(contains("\"running\": false"));
}
