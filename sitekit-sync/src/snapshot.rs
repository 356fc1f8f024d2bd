//! Last-synced remote snapshot with per-part SHA-256 digests.
//!
//! Persists a [`Snapshot`] JSON document at
//! `<home>/.sitekit/snapshots/<site>.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the local store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use sitekit_core::{SiteConfig, SiteName};

use crate::error::{io_err, SyncError};
use crate::schema::{part_value, Part};

/// Part key → SHA-256 hex digest of its canonical JSON.
pub type Digests = BTreeMap<String, String>;

/// On-disk snapshot payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub config: SiteConfig,
    #[serde(default)]
    pub digests: Digests,
}

impl Snapshot {
    /// Snapshot of `config` taken now.
    pub fn capture(config: SiteConfig) -> Result<Self, SyncError> {
        Ok(Self {
            synced_at: Utc::now(),
            digests: digests(&config)?,
            config,
        })
    }

    /// True when no sync has ever been recorded.
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Digest of every part of `config`.
pub fn digests(config: &SiteConfig) -> Result<Digests, SyncError> {
    Part::all()
        .into_iter()
        .map(|part| Ok((part.key().to_string(), digest(config, part)?)))
        .collect()
}

pub fn digest(config: &SiteConfig, part: Part) -> Result<String, SyncError> {
    let canonical = serde_json::to_vec(&part_value(config, part)?)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Parts whose digest in `config` differs from `baseline`, in part order.
pub fn changed_parts(config: &SiteConfig, baseline: &Digests) -> Result<Vec<Part>, SyncError> {
    let mut changed = Vec::new();
    for part in Part::all() {
        if baseline.get(part.key()) != Some(&digest(config, part)?) {
            changed.push(part);
        }
    }
    Ok(changed)
}

/// `~/.sitekit/snapshots/<site>.json`
pub fn snapshot_path_at(home: &Path, site: &SiteName) -> PathBuf {
    home.join(".sitekit")
        .join("snapshots")
        .join(format!("{}.json", site.0))
}

/// Load the snapshot for `site`.
///
/// Returns an empty snapshot if the file does not yet exist.
pub fn load_at(home: &Path, site: &SiteName) -> Result<Snapshot, SyncError> {
    let path = snapshot_path_at(home, site);
    if !path.exists() {
        return Ok(Snapshot {
            synced_at: Utc::now(),
            config: SiteConfig::default(),
            digests: Digests::new(),
        });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Save the snapshot for `site` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(home: &Path, site: &SiteName, snapshot: &Snapshot) -> Result<(), SyncError> {
    let path = snapshot_path_at(home, site);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid snapshot path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
