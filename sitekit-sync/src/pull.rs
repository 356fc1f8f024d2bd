//! Load the remote state and the effective document.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use sitekit_core::{CollectionKind, SiteConfig, SiteName};

use crate::remote::{Row, RowStore};
use crate::schema::{collections_from_rows, settings_from_row, ORDER_COLUMN, SETTINGS_TABLE};
use crate::{snapshot, SyncError};

/// Everything the backend holds for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteState {
    /// Remote content merged over defaults, collections in `order_index` order.
    pub config: SiteConfig,
    /// Raw settings row, `None` when the backend has none yet.
    pub settings_row: Option<Row>,
    pub rows: BTreeMap<CollectionKind, Vec<Row>>,
    /// Collection tables the backend does not have; read as empty.
    pub missing: BTreeSet<CollectionKind>,
}

/// Read the settings row and all four collection tables.
///
/// A missing settings table is an error. A missing collection table is
/// logged and read as empty.
pub fn fetch_remote(store: &dyn RowStore, settings_id: i64) -> Result<RemoteState, SyncError> {
    let settings_row = store.select_by_id(SETTINGS_TABLE, &settings_id.to_string())?;
    let mut config = match &settings_row {
        Some(row) => settings_from_row(row),
        None => {
            tracing::warn!("no settings row {settings_id} in {SETTINGS_TABLE}; using defaults");
            let mut config = SiteConfig::default();
            config.social_media.clear();
            config
        }
    };

    let mut rows = BTreeMap::new();
    let mut missing = BTreeSet::new();
    for kind in CollectionKind::all() {
        let table_rows = match store.select(kind.table(), Some(ORDER_COLUMN)) {
            Ok(table_rows) => table_rows,
            Err(err) if err.is_missing_table() => {
                tracing::warn!("table {} not found; treating it as empty", kind.table());
                missing.insert(*kind);
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        tracing::debug!("fetched {} row(s) from {}", table_rows.len(), kind.table());
        rows.insert(*kind, table_rows);
    }
    collections_from_rows(&mut config, &rows)?;

    Ok(RemoteState {
        config,
        settings_row,
        rows,
        missing,
    })
}

/// Where [`load_effective`] got its document from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Remote,
    Snapshot,
    Defaults,
}

impl ConfigSource {
    pub fn label(&self) -> &'static str {
        match self {
            ConfigSource::Remote => "remote",
            ConfigSource::Snapshot => "snapshot",
            ConfigSource::Defaults => "defaults",
        }
    }
}

/// The document a site would serve right now.
///
/// The live remote when reachable; otherwise the last snapshot; otherwise
/// the defaults. Fallbacks are logged, never returned as errors.
pub fn load_effective(
    home: &Path,
    site: &SiteName,
    store: &dyn RowStore,
    settings_id: i64,
) -> Result<(SiteConfig, ConfigSource), SyncError> {
    match fetch_remote(store, settings_id) {
        Ok(state) => Ok((state.config, ConfigSource::Remote)),
        Err(err) => {
            tracing::error!("loading {site} from remote failed: {err}");
            let snapshot = snapshot::load_at(home, site)?;
            if snapshot.is_empty() {
                tracing::warn!("no snapshot for {site}; falling back to defaults");
                Ok((SiteConfig::default(), ConfigSource::Defaults))
            } else {
                tracing::warn!("using snapshot of {site} from {}", snapshot.synced_at);
                Ok((snapshot.config, ConfigSource::Snapshot))
            }
        }
    }
}
