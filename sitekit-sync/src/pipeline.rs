//! Shared push / pull entrypoints used by CLI and daemon.
//!
//! ## `push` protocol
//!
//! 1. Load the local document, normalise it, validate it.
//! 2. Fetch the remote state.
//! 3. Plan and apply the settings row and each collection in scope. A part
//!    that fails is logged and reported; the other parts still run.
//! 4. Write backend-assigned ids back into the local document.
//! 5. Re-fetch the remote and save it as the new snapshot.
//!
//! Steps 4 and 5 are skipped in dry-run mode.

use std::path::Path;

use sitekit_core::normalize::normalize;
use sitekit_core::validate::validate;
use sitekit_core::{
    store, CollectionKind, MediaQuote, NewsItem, NormalizeReport, SiteConfig, SiteName,
    SocialLink, TeamMember,
};

use crate::apply::{apply_collection, apply_settings, remap_ids, IdMap, WriteResult};
use crate::plan::{plan_kind, plan_settings};
use crate::pull::fetch_remote;
use crate::remote::{RestStore, RowStore};
use crate::schema::Part;
use crate::snapshot::{self, Snapshot};
use crate::{auth, SyncError};

/// Which parts of a document a push covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Settings,
    Collection(CollectionKind),
}

impl SyncScope {
    fn includes_settings(&self) -> bool {
        matches!(self, SyncScope::All | SyncScope::Settings)
    }

    fn collections(&self) -> Vec<CollectionKind> {
        match self {
            SyncScope::All => CollectionKind::all().to_vec(),
            SyncScope::Settings => Vec::new(),
            SyncScope::Collection(kind) => vec![*kind],
        }
    }
}

impl std::str::FromStr for SyncScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SyncScope::All),
            "settings" => Ok(SyncScope::Settings),
            other => other
                .parse::<CollectionKind>()
                .map(SyncScope::Collection)
                .map_err(|_| {
                    format!("unknown scope '{other}'; expected: settings, team, news, social, quotes")
                }),
        }
    }
}

/// A part that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFailure {
    pub part: String,
    pub error: String,
}

/// Outcome of pushing a single site.
#[derive(Debug, Clone, Default)]
pub struct PushReport {
    pub site: String,
    pub dry_run: bool,
    pub normalized: NormalizeReport,
    pub writes: Vec<WriteResult>,
    pub id_map: IdMap,
    pub failures: Vec<PartFailure>,
}

impl PushReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of rows written (or that would be written in dry-run).
    pub fn changes(&self) -> usize {
        self.writes.iter().filter(|w| w.is_change()).count()
    }
}

/// Push `site`'s local document to `remote`.
pub fn push(
    home: &Path,
    site: &SiteName,
    remote: &dyn RowStore,
    settings_id: i64,
    scope: SyncScope,
    dry_run: bool,
) -> Result<PushReport, SyncError> {
    let mut config = store::load_config_at(home, site)?;
    let normalized = normalize(&mut config);

    let issues = validate(&config);
    if !issues.is_empty() {
        for issue in &issues {
            tracing::error!("{site}: {issue}");
        }
        return Err(SyncError::Invalid(issues));
    }

    let state = fetch_remote(remote, settings_id)?;
    let mut report = PushReport {
        site: site.to_string(),
        dry_run,
        normalized,
        ..PushReport::default()
    };

    if scope.includes_settings() {
        let result = plan_settings(&config, settings_id, state.settings_row.as_ref())
            .and_then(|plan| apply_settings(remote, &plan, settings_id, dry_run));
        match result {
            Ok(write) => report.writes.push(write),
            Err(err) => {
                tracing::error!("{site}: settings push failed: {err}");
                report.failures.push(PartFailure {
                    part: "settings".to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    for kind in scope.collections() {
        let remote_rows = state.rows.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let result = plan_kind(&config, kind, remote_rows).and_then(|plan| {
            if state.missing.contains(&kind) && !plan.is_noop() {
                return Err(SyncError::MissingTable {
                    table: kind.table().to_string(),
                });
            }
            apply_collection(remote, &plan, dry_run)
        });
        match result {
            Ok(outcome) => {
                if !dry_run {
                    remap_kind(&mut config, kind, &outcome.id_map);
                }
                report.writes.extend(outcome.results);
                report.id_map.extend(outcome.id_map);
            }
            Err(err) => {
                tracing::error!("{site}: {} push failed: {err}", kind.table());
                report.failures.push(PartFailure {
                    part: kind.key().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    if dry_run {
        tracing::info!("[dry-run] {site}: {} change(s) planned", report.changes());
        return Ok(report);
    }

    if !report.normalized.is_noop() || !report.id_map.is_empty() {
        store::save_config_at(home, site, &config)?;
    }

    match fetch_remote(remote, settings_id) {
        Ok(after) => snapshot::save_at(home, site, &Snapshot::capture(after.config)?)?,
        Err(err) => tracing::warn!("{site}: snapshot not refreshed: {err}"),
    }

    tracing::info!(
        "{site}: pushed {} change(s), {} failure(s)",
        report.changes(),
        report.failures.len()
    );
    Ok(report)
}

fn remap_kind(config: &mut SiteConfig, kind: CollectionKind, id_map: &IdMap) -> usize {
    if id_map.is_empty() {
        return 0;
    }
    match kind {
        CollectionKind::Team => remap_ids::<TeamMember>(config, id_map),
        CollectionKind::News => remap_ids::<NewsItem>(config, id_map),
        CollectionKind::Social => remap_ids::<SocialLink>(config, id_map),
        CollectionKind::MediaQuotes => remap_ids::<MediaQuote>(config, id_map),
    }
}

/// Outcome of pulling a single site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub site: String,
    /// Parts where the new local document differs from the old one.
    pub changed: Vec<Part>,
}

/// Overwrite `site`'s local document with the remote state.
///
/// Refused while the local document has changes that were never pushed
/// (compared with the last snapshot, or with the defaults before the first
/// sync), unless `force` is set.
pub fn pull(
    home: &Path,
    site: &SiteName,
    remote: &dyn RowStore,
    settings_id: i64,
    force: bool,
) -> Result<PullReport, SyncError> {
    let local = store::load_config_at(home, site)?;
    if !force {
        let snapshot = snapshot::load_at(home, site)?;
        let baseline = if snapshot.is_empty() {
            snapshot::digests(&SiteConfig::default())?
        } else {
            snapshot.digests
        };
        let unsynced = snapshot::changed_parts(&local, &baseline)?;
        if !unsynced.is_empty() {
            return Err(SyncError::UnsyncedChanges {
                parts: unsynced.iter().map(|p| p.key().to_string()).collect(),
            });
        }
    }

    let state = fetch_remote(remote, settings_id)?;
    let changed = snapshot::changed_parts(&state.config, &snapshot::digests(&local)?)?;
    store::save_config_at(home, site, &state.config)?;
    snapshot::save_at(home, site, &Snapshot::capture(state.config)?)?;
    tracing::info!("{site}: pulled, {} part(s) changed", changed.len());

    Ok(PullReport {
        site: site.to_string(),
        changed,
    })
}

// ---------------------------------------------------------------------------
// Profile-driven entrypoints
// ---------------------------------------------------------------------------

/// REST client for `site` using its profile, env overrides and session.
pub fn connect_at(home: &Path, site: &SiteName) -> Result<(RestStore, i64), SyncError> {
    let remote = auth::remote_profile_at(home, site)?;
    let session = store::load_session_at(home, site)?;
    Ok((
        RestStore::with_session(&remote, session.as_ref()),
        remote.settings_id,
    ))
}

/// [`push`] against the site's configured backend.
pub fn push_site(
    home: &Path,
    site: &SiteName,
    scope: SyncScope,
    dry_run: bool,
) -> Result<PushReport, SyncError> {
    let (remote, settings_id) = connect_at(home, site)?;
    push(home, site, &remote, settings_id, scope, dry_run)
}

/// [`pull`] from the site's configured backend.
pub fn pull_site(home: &Path, site: &SiteName, force: bool) -> Result<PullReport, SyncError> {
    let (remote, settings_id) = connect_at(home, site)?;
    pull(home, site, &remote, settings_id, force)
}

/// Sites a [`run`] covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteScope {
    /// Every initialised site.
    All,
    Site(SiteName),
}

/// Push every site in `scope`; one failing site does not stop the others.
///
/// This is the canonical push entrypoint for the daemon processor.
pub fn run(
    home: &Path,
    scope: SiteScope,
    dry_run: bool,
) -> Result<Vec<(SiteName, Result<PushReport, SyncError>)>, SyncError> {
    let sites = match scope {
        SiteScope::All => store::list_sites_at(home)?,
        SiteScope::Site(site) => vec![site],
    };
    Ok(sites
        .into_iter()
        .map(|site| {
            let result = push_site(home, &site, SyncScope::All, dry_run);
            if let Err(err) = &result {
                tracing::error!("{site}: push failed: {err}");
            }
            (site, result)
        })
        .collect())
}
