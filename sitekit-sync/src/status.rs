//! Local-vs-snapshot staleness detection.
//!
//! Signal precedence:
//! 1. `NeverSynced` (snapshot missing or empty)
//! 2. `Modified` (parts whose digest differs from the snapshot)
//! 3. `Pending` (digests match but entries still carry temporary ids)
//! 4. `Current`

use std::path::Path;

use chrono::{DateTime, Utc};

use sitekit_core::{store, SiteConfig, SiteName};

use crate::schema::Part;
use crate::{snapshot, SyncError};

/// Sync state of one site's local document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSignal {
    NeverSynced,
    Current,
    Modified { parts: Vec<Part> },
    Pending { temporary: usize },
}

impl StatusSignal {
    pub fn label(&self) -> &'static str {
        match self {
            StatusSignal::NeverSynced => "never-synced",
            StatusSignal::Current => "current",
            StatusSignal::Modified { .. } => "modified",
            StatusSignal::Pending { .. } => "pending",
        }
    }
}

/// Check `site`'s local document against its last snapshot.
pub fn check(home: &Path, site: &SiteName) -> Result<StatusSignal, SyncError> {
    let config = store::load_config_at(home, site)?;
    let snapshot = snapshot::load_at(home, site)?;
    if snapshot.is_empty() {
        return Ok(StatusSignal::NeverSynced);
    }
    classify(&config, &snapshot.digests)
}

/// Classify `config` against `baseline` digests (never empty).
pub fn classify(config: &SiteConfig, baseline: &snapshot::Digests) -> Result<StatusSignal, SyncError> {
    let parts = snapshot::changed_parts(config, baseline)?;
    if !parts.is_empty() {
        return Ok(StatusSignal::Modified { parts });
    }
    let temporary = count_temporary(config);
    if temporary > 0 {
        return Ok(StatusSignal::Pending { temporary });
    }
    Ok(StatusSignal::Current)
}

/// Entries across all collections whose id is still temporary.
pub fn count_temporary(config: &SiteConfig) -> usize {
    config.team.iter().filter(|e| e.id.is_temporary()).count()
        + config.news.iter().filter(|e| e.id.is_temporary()).count()
        + config.social_media.iter().filter(|e| e.id.is_temporary()).count()
        + config.media_quotes.iter().filter(|e| e.id.is_temporary()).count()
}

/// Format age from a chrono timestamp (snapshot `synced_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let now = Utc::now();
    let age = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
