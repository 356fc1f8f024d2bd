//! Per-site local store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.sitekit/
//!   sites/
//!     <site>/
//!       site.yaml      (profile: mode 0600, created by init)
//!       config.yaml    (local config document: mode 0600)
//!       session.json   (operator session: mode 0600, present after login)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::types::{RemoteProfile, Session, SiteConfig, SiteName, SiteProfile};

const PROFILE_FILE: &str = "site.yaml";
const CONFIG_FILE: &str = "config.yaml";
const SESSION_FILE: &str = "session.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.sitekit/`: pure, no I/O.
pub fn sitekit_dir_at(home: &Path) -> PathBuf {
    home.join(".sitekit")
}

/// `<home>/.sitekit/sites/<site>/`
///
/// Creates the directory (mode `0700`) if it does not yet exist.
pub fn site_dir_at(home: &Path, site: &SiteName) -> Result<PathBuf, StoreError> {
    check_site_name(site)?;
    let dir = sitekit_dir_at(home).join("sites").join(&site.0);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

/// `<home>/.sitekit/sites/<site>/site.yaml`: pure, no I/O.
pub fn profile_path_at(home: &Path, site: &SiteName) -> PathBuf {
    site_path(home, site, PROFILE_FILE)
}

/// `<home>/.sitekit/sites/<site>/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path, site: &SiteName) -> PathBuf {
    site_path(home, site, CONFIG_FILE)
}

/// `<home>/.sitekit/sites/<site>/session.json`: pure, no I/O.
pub fn session_path_at(home: &Path, site: &SiteName) -> PathBuf {
    site_path(home, site, SESSION_FILE)
}

/// `config_path_at` convenience wrapper.
pub fn config_path(site: &SiteName) -> Result<PathBuf, StoreError> {
    Ok(config_path_at(&home()?, site))
}

fn site_path(home: &Path, site: &SiteName, file: &str) -> PathBuf {
    sitekit_dir_at(home).join("sites").join(&site.0).join(file)
}

/// Site names become directory names: letters, digits, `-` and `_` only.
pub fn check_site_name(site: &SiteName) -> Result<(), StoreError> {
    let ok = !site.0.is_empty()
        && site
            .0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidSiteName(site.0.clone()))
    }
}

/// Names of all initialised sites (directories holding a `site.yaml`), sorted.
pub fn list_sites_at(home: &Path) -> Result<Vec<SiteName>, StoreError> {
    let dir = sitekit_dir_at(home).join("sites");
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut names: Vec<SiteName> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| e.path().join(PROFILE_FILE).is_file())
        .map(|e| SiteName::from(e.file_name().to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

/// `list_sites_at` convenience wrapper.
pub fn list_sites() -> Result<Vec<SiteName>, StoreError> {
    list_sites_at(&home()?)
}

// ---------------------------------------------------------------------------
// 2. Profile
// ---------------------------------------------------------------------------

/// Load `site.yaml`.
///
/// Returns `StoreError::SiteNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_profile_at(home: &Path, site: &SiteName) -> Result<SiteProfile, StoreError> {
    check_site_name(site)?;
    load_yaml(profile_path_at(home, site))
}

/// `load_profile_at` convenience wrapper.
pub fn load_profile(site: &SiteName) -> Result<SiteProfile, StoreError> {
    load_profile_at(&home()?, site)
}

pub fn save_profile_at(home: &Path, profile: &SiteProfile) -> Result<(), StoreError> {
    site_dir_at(home, &profile.name)?;
    let yaml = serde_yaml::to_string(profile)?;
    write_atomic(&profile_path_at(home, &profile.name), yaml.as_bytes())
}

/// `save_profile_at` convenience wrapper.
pub fn save_profile(profile: &SiteProfile) -> Result<(), StoreError> {
    save_profile_at(&home()?, profile)
}

// ---------------------------------------------------------------------------
// 3. Config document
// ---------------------------------------------------------------------------

/// Load the local config document, completing missing fields from defaults.
pub fn load_config_at(home: &Path, site: &SiteName) -> Result<SiteConfig, StoreError> {
    check_site_name(site)?;
    load_yaml(config_path_at(home, site))
}

/// `load_config_at` convenience wrapper.
pub fn load_config(site: &SiteName) -> Result<SiteConfig, StoreError> {
    load_config_at(&home()?, site)
}

/// Atomically save the local config document.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_config_at(home: &Path, site: &SiteName, config: &SiteConfig) -> Result<(), StoreError> {
    site_dir_at(home, site)?;
    let yaml = serde_yaml::to_string(config)?;
    write_atomic(&config_path_at(home, site), yaml.as_bytes())
}

/// `save_config_at` convenience wrapper.
pub fn save_config(site: &SiteName, config: &SiteConfig) -> Result<(), StoreError> {
    save_config_at(&home()?, site, config)
}

/// Replace the local document with defaults. The remote store is untouched.
pub fn reset_config_at(home: &Path, site: &SiteName) -> Result<SiteConfig, StoreError> {
    let path = profile_path_at(home, site);
    if !path.exists() {
        return Err(StoreError::SiteNotFound { path });
    }
    let config = SiteConfig::default();
    save_config_at(home, site, &config)?;
    Ok(config)
}

/// `reset_config_at` convenience wrapper.
pub fn reset_config(site: &SiteName) -> Result<SiteConfig, StoreError> {
    reset_config_at(&home()?, site)
}

// ---------------------------------------------------------------------------
// 4. Session
// ---------------------------------------------------------------------------

/// Load the stored session, `None` when not logged in.
pub fn load_session_at(home: &Path, site: &SiteName) -> Result<Option<Session>, StoreError> {
    let path = session_path_at(home, site);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// `load_session_at` convenience wrapper.
pub fn load_session(site: &SiteName) -> Result<Option<Session>, StoreError> {
    load_session_at(&home()?, site)
}

pub fn save_session_at(home: &Path, site: &SiteName, session: &Session) -> Result<(), StoreError> {
    site_dir_at(home, site)?;
    let json = serde_json::to_vec_pretty(session)?;
    write_atomic(&session_path_at(home, site), &json)
}

/// `save_session_at` convenience wrapper.
pub fn save_session(site: &SiteName, session: &Session) -> Result<(), StoreError> {
    save_session_at(&home()?, site, session)
}

/// Delete the stored session. Returns `false` if there was none.
pub fn clear_session_at(home: &Path, site: &SiteName) -> Result<bool, StoreError> {
    let path = session_path_at(home, site);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&path)?;
    Ok(true)
}

/// `clear_session_at` convenience wrapper.
pub fn clear_session(site: &SiteName) -> Result<bool, StoreError> {
    clear_session_at(&home()?, site)
}

// ---------------------------------------------------------------------------
// 5. Init
// ---------------------------------------------------------------------------

/// Register `site` with the given remote.
///
/// Creates `site.yaml` and a default `config.yaml`.
/// Idempotent: an existing profile is loaded and returned unchanged, and an
/// existing document is never overwritten.
pub fn init_at(home: &Path, site: SiteName, remote: RemoteProfile) -> Result<SiteProfile, StoreError> {
    check_site_name(&site)?;

    let profile = if profile_path_at(home, &site).exists() {
        load_profile_at(home, &site)?
    } else {
        let now = Utc::now();
        let profile = SiteProfile {
            name: site.clone(),
            remote,
            created_at: now,
            updated_at: now,
        };
        save_profile_at(home, &profile)?;
        profile
    };

    if !config_path_at(home, &site).exists() {
        save_config_at(home, &site, &SiteConfig::default())?;
    }
    Ok(profile)
}

/// `init_at` convenience wrapper.
pub fn init(site: SiteName, remote: RemoteProfile) -> Result<SiteProfile, StoreError> {
    init_at(&home()?, site, remote)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// `dirs::home_dir()` or `StoreError::HomeNotFound`.
pub fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

fn load_yaml<T: DeserializeOwned>(path: PathBuf) -> Result<T, StoreError> {
    if !path.exists() {
        return Err(StoreError::SiteNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// Write `bytes` to a `.tmp` sibling, restrict it to `0600`, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, bytes)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
pub fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
pub fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
