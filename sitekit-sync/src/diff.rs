//! Unified diff of the remote document against the local one, per part.

use std::path::Path;

use similar::TextDiff;

use sitekit_core::{store, SiteConfig, SiteName};

use crate::remote::RowStore;
use crate::schema::{part_value, Part};
use crate::{pull, snapshot, SyncError};

/// A single part diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDiff {
    pub part: Part,
    pub unified_diff: String,
}

/// Diff result for a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSiteResult {
    pub site: SiteName,
    /// `remote`, `snapshot` or `defaults`.
    pub against: &'static str,
    pub diffs: Vec<PartDiff>,
}

/// What to compare the local document with.
pub enum DiffSource<'a> {
    /// The live backend; falls back to the snapshot, then the defaults, when
    /// the backend cannot be read.
    Live {
        store: &'a dyn RowStore,
        settings_id: i64,
    },
    /// Last snapshot; fails with `NeverSynced` when there is none.
    Snapshot,
}

/// Diff `remote` → `local`, one YAML diff per differing part.
pub fn diff_configs(remote: &SiteConfig, local: &SiteConfig) -> Result<Vec<PartDiff>, SyncError> {
    let mut diffs = Vec::new();
    for part in Part::all() {
        let old = serde_yaml::to_string(&part_value(remote, part)?)?;
        let new = serde_yaml::to_string(&part_value(local, part)?)?;
        if old == new {
            continue;
        }
        let old_header = format!("remote/{}", part.key());
        let new_header = format!("local/{}", part.key());
        let unified = TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();
        diffs.push(PartDiff {
            part,
            unified_diff: unified,
        });
    }
    Ok(diffs)
}

/// Compare `site`'s local document with the remote or its last snapshot.
///
/// Nothing is written.
pub fn diff_site(home: &Path, site: &SiteName, source: DiffSource<'_>) -> Result<DiffSiteResult, SyncError> {
    let local = store::load_config_at(home, site)?;
    let (remote, against) = match source {
        DiffSource::Live { store, settings_id } => {
            let (config, source) = pull::load_effective(home, site, store, settings_id)?;
            (config, source.label())
        }
        DiffSource::Snapshot => {
            let snapshot = snapshot::load_at(home, site)?;
            if snapshot.is_empty() {
                return Err(SyncError::NeverSynced {
                    site: site.to_string(),
                });
            }
            (snapshot.config, "snapshot")
        }
    };
    Ok(DiffSiteResult {
        site: site.clone(),
        against,
        diffs: diff_configs(&remote, &local)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use crate::schema::SETTINGS_TABLE;
    use crate::snapshot::Snapshot;
    use sitekit_core::{CollectionKind, RemoteProfile};
    use tempfile::TempDir;

    #[test]
    fn identical_documents_have_no_diff() {
        let config = SiteConfig::default();
        assert!(diff_configs(&config, &config).unwrap().is_empty());
    }

    #[test]
    fn edited_part_produces_unified_diff() {
        let remote = SiteConfig::default();
        let mut local = remote.clone();
        local.social_media[0].url = "https://facebook.com/harbour".into();

        let diffs = diff_configs(&remote, &local).unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].part, Part::Collection(CollectionKind::Social));
        let text = &diffs[0].unified_diff;
        assert!(text.contains("--- remote/social"));
        assert!(text.contains("+++ local/social"));
        assert!(text.contains("@@"));
        assert!(text
            .lines()
            .any(|l| l.starts_with('+') && l.contains("facebook.com/harbour")));
    }

    #[test]
    fn live_diff_falls_back_when_backend_is_unreadable() {
        let home = TempDir::new().unwrap();
        let site = SiteName::from("campaign");
        store::init_at(home.path(), site.clone(), RemoteProfile::new("https://x", "k")).unwrap();
        let broken = MemoryStore::new().with_missing_table(SETTINGS_TABLE);
        let live = || DiffSource::Live {
            store: &broken,
            settings_id: 1,
        };

        let result = diff_site(home.path(), &site, live()).unwrap();
        assert_eq!(result.against, "defaults");
        assert!(result.diffs.is_empty());

        let mut synced = store::load_config_at(home.path(), &site).unwrap();
        synced.footer.description = "From the last sync".into();
        snapshot::save_at(home.path(), &site, &Snapshot::capture(synced).unwrap()).unwrap();
        let result = diff_site(home.path(), &site, live()).unwrap();
        assert_eq!(result.against, "snapshot");
        assert_eq!(result.diffs.len(), 1);
        assert_eq!(result.diffs[0].part.key(), "footer");
    }

    #[test]
    fn offline_diff_requires_snapshot() {
        let home = TempDir::new().unwrap();
        let site = SiteName::from("campaign");
        store::init_at(home.path(), site.clone(), RemoteProfile::new("https://x", "k")).unwrap();

        let err = diff_site(home.path(), &site, DiffSource::Snapshot).unwrap_err();
        assert!(matches!(err, SyncError::NeverSynced { .. }));

        let config = store::load_config_at(home.path(), &site).unwrap();
        snapshot::save_at(home.path(), &site, &Snapshot::capture(config).unwrap()).unwrap();
        let result = diff_site(home.path(), &site, DiffSource::Snapshot).unwrap();
        assert_eq!(result.against, "snapshot");
        assert!(result.diffs.is_empty());
    }
}
