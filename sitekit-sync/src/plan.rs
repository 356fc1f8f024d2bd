//! Reconciliation planner: local document vs. remote rows.
//!
//! Existence is decided by presence in the remote row set, never by id shape:
//!
//! | Local id          | Remote row with that id | Operation                         |
//! |-------------------|-------------------------|-----------------------------------|
//! | any               | present, same content   | `Unchanged`                       |
//! | any               | present, differs        | `Update` (changed columns only)   |
//! | server-shaped     | absent                  | `Insert`, key kept                |
//! | temporary/client  | absent                  | `Insert`, backend assigns the key |
//! | (none)            | present                 | `Delete`                          |
//!
//! `order_index` is the entry's position in the local collection.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use sitekit_core::{CollectionKind, EntityId, IdOrigin, SiteConfig};

use crate::remote::{row_id, Row};
use crate::schema::{entity_to_row, settings_to_row, Entity};
use crate::SyncError;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// What to do with the singleton settings row.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsPlan {
    /// No row yet: insert the full row.
    Insert(Row),
    /// Patch holding only the columns that differ.
    Update(Row),
    Unchanged,
}

impl SettingsPlan {
    /// Columns this plan writes (`id` excluded).
    pub fn columns(&self) -> Vec<String> {
        match self {
            SettingsPlan::Insert(row) | SettingsPlan::Update(row) => {
                row.keys().filter(|k| k.as_str() != "id").cloned().collect()
            }
            SettingsPlan::Unchanged => Vec::new(),
        }
    }
}

pub fn plan_settings(
    local: &SiteConfig,
    settings_id: i64,
    remote: Option<&Row>,
) -> Result<SettingsPlan, SyncError> {
    let full = settings_to_row(local, settings_id)?;
    let Some(remote) = remote else {
        return Ok(SettingsPlan::Insert(full));
    };

    let patch: Row = full
        .into_iter()
        .filter(|(column, value)| column != "id" && remote.get(column) != Some(value))
        .collect();
    Ok(if patch.is_empty() {
        SettingsPlan::Unchanged
    } else {
        SettingsPlan::Update(patch)
    })
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// One planned row operation. `index` is the entry's local position.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOp {
    Insert {
        index: usize,
        local_id: EntityId,
        row: Row,
    },
    Update {
        index: usize,
        id: EntityId,
        patch: Row,
    },
    Delete {
        id: EntityId,
    },
    Unchanged {
        index: usize,
        id: EntityId,
    },
}

/// Planned operations for one collection table.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPlan {
    pub kind: CollectionKind,
    pub ops: Vec<RowOp>,
}

impl CollectionPlan {
    pub fn inserts(&self) -> impl Iterator<Item = &RowOp> {
        self.ops.iter().filter(|op| matches!(op, RowOp::Insert { .. }))
    }

    pub fn updates(&self) -> impl Iterator<Item = &RowOp> {
        self.ops.iter().filter(|op| matches!(op, RowOp::Update { .. }))
    }

    pub fn deletes(&self) -> impl Iterator<Item = &RowOp> {
        self.ops.iter().filter(|op| matches!(op, RowOp::Delete { .. }))
    }

    /// True when nothing would be written.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, RowOp::Unchanged { .. }))
    }
}

/// Plan the writes that make `remote` match `local`.
///
/// Fails on duplicate local ids. Entries with an empty id are always inserted.
pub fn plan_collection<E: Entity>(local: &[E], remote: &[Row]) -> Result<CollectionPlan, SyncError> {
    let kind = E::KIND;

    let mut seen = HashSet::new();
    for entity in local.iter().filter(|e| !e.id().is_empty()) {
        if !seen.insert(entity.id().as_str()) {
            return Err(SyncError::DuplicateId {
                table: kind.table().to_string(),
                id: entity.id().to_string(),
            });
        }
    }

    let remote_by_id: BTreeMap<EntityId, &Row> = remote
        .iter()
        .filter_map(|row| row_id(row).map(|id| (id, row)))
        .collect();

    let mut ops = Vec::with_capacity(local.len());
    for (index, entity) in local.iter().enumerate() {
        let id = entity.id().clone();
        let row = entity_to_row(entity, index)?;

        match remote_by_id.get(&id).filter(|_| !id.is_empty()) {
            Some(existing) => {
                let patch = changed_columns(&row, existing);
                if patch.is_empty() {
                    ops.push(RowOp::Unchanged { index, id });
                } else {
                    ops.push(RowOp::Update { index, id, patch });
                }
            }
            None => {
                let mut row = row;
                if id.origin() == IdOrigin::Server {
                    row.insert("id".into(), Value::String(id.0.clone()));
                }
                ops.push(RowOp::Insert {
                    index,
                    local_id: id,
                    row,
                });
            }
        }
    }

    for id in remote_by_id.keys() {
        if !seen.contains(id.as_str()) {
            ops.push(RowOp::Delete { id: id.clone() });
        }
    }

    Ok(CollectionPlan { kind, ops })
}

/// Columns of `local` whose value differs from `remote`; a column the remote
/// row lacks counts as `null`.
fn changed_columns(local: &Row, remote: &Row) -> Row {
    local
        .iter()
        .filter(|(column, value)| remote.get(*column).unwrap_or(&Value::Null) != *value)
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

/// Dispatch [`plan_collection`] on a runtime [`CollectionKind`].
pub fn plan_kind(
    config: &SiteConfig,
    kind: CollectionKind,
    remote: &[Row],
) -> Result<CollectionPlan, SyncError> {
    match kind {
        CollectionKind::Team => plan_collection(&config.team, remote),
        CollectionKind::News => plan_collection(&config.news, remote),
        CollectionKind::Social => plan_collection(&config.social_media, remote),
        CollectionKind::MediaQuotes => plan_collection(&config.media_quotes, remote),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitekit_core::{Platform, SocialLink, TeamMember};

    fn member(id: &str, name: &str) -> TeamMember {
        TeamMember {
            id: EntityId::from(id),
            name: name.to_string(),
            role: "Member".to_string(),
            photo_url: String::new(),
            description: None,
        }
    }

    fn remote_row(member: &TeamMember, order_index: usize) -> Row {
        let mut row = entity_to_row(member, order_index).unwrap();
        row.insert("id".into(), json!(member.id.as_str()));
        row.insert("created_at".into(), json!("2024-01-01T00:00:00Z"));
        row
    }

    const UUID_A: &str = "0b6f7ad2-5c5e-4d1d-9f54-3f1f6f6a8a01";

    #[test]
    fn settings_insert_when_row_missing() {
        let plan = plan_settings(&SiteConfig::default(), 1, None).unwrap();
        match plan {
            SettingsPlan::Insert(row) => assert_eq!(row["id"], json!(1)),
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn settings_patch_holds_only_changed_columns() {
        let remote = settings_to_row(&SiteConfig::default(), 1).unwrap();
        let mut local = SiteConfig::default();
        local.theme.primary_color = "#000000".into();
        local.news_text_color = "#333333".into();

        let plan = plan_settings(&local, 1, Some(&remote)).unwrap();
        let mut columns = plan.columns();
        columns.sort();
        assert_eq!(columns, ["news_text_color", "theme"]);
    }

    #[test]
    fn settings_unchanged_when_equal() {
        let remote = settings_to_row(&SiteConfig::default(), 1).unwrap();
        let plan = plan_settings(&SiteConfig::default(), 1, Some(&remote)).unwrap();
        assert_eq!(plan, SettingsPlan::Unchanged);
    }

    #[test]
    fn matching_rows_are_unchanged_despite_extra_columns() {
        let local = vec![member("7", "Ada")];
        let remote = vec![remote_row(&local[0], 0)];
        let plan = plan_collection(&local, &remote).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn reorder_updates_only_order_index() {
        let a = member("1", "Ada");
        let b = member("2", "Ben");
        let remote = vec![remote_row(&a, 0), remote_row(&b, 1)];
        let plan = plan_collection(&[b.clone(), a.clone()], &remote).unwrap();
        let patches: Vec<_> = plan
            .updates()
            .map(|op| match op {
                RowOp::Update { id, patch, .. } => (id.0.clone(), patch.clone()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(patches.len(), 2);
        for (_, patch) in &patches {
            assert_eq!(patch.keys().collect::<Vec<_>>(), ["order_index"]);
        }
    }

    #[test]
    fn temporary_and_client_ids_insert_without_key() {
        let local = vec![member("new-1732000000000-0", "Ada"), member("1732000000000", "Ben")];
        let plan = plan_collection(&local, &[]).unwrap();
        assert_eq!(plan.inserts().count(), 2);
        for op in plan.inserts() {
            let RowOp::Insert { row, .. } = op else { unreachable!() };
            assert!(!row.contains_key("id"));
        }
    }

    #[test]
    fn server_ids_missing_remotely_are_reinserted_with_key() {
        let local = vec![member(UUID_A, "Ada")];
        let plan = plan_collection(&local, &[]).unwrap();
        let Some(RowOp::Insert { row, .. }) = plan.inserts().next() else {
            panic!("expected insert");
        };
        assert_eq!(row["id"], json!(UUID_A));
    }

    #[test]
    fn remote_rows_missing_locally_are_deleted() {
        let kept = member("1", "Ada");
        let gone = member("2", "Ben");
        let remote = vec![remote_row(&kept, 0), remote_row(&gone, 1)];
        let plan = plan_collection(&[kept], &remote).unwrap();
        let deleted: Vec<_> = plan
            .deletes()
            .map(|op| match op {
                RowOp::Delete { id } => id.0.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(deleted, ["2"]);
    }

    #[test]
    fn numeric_remote_keys_match_string_local_ids() {
        let link = SocialLink {
            id: EntityId::from("3"),
            platform: Platform::Instagram,
            url: "https://instagram.com".into(),
            icon_url: None,
            icon_color: None,
        };
        let mut row = entity_to_row(&link, 0).unwrap();
        row.insert("id".into(), json!(3));
        let plan = plan_collection(&[link], &[row]).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn duplicate_local_ids_are_rejected() {
        let local = vec![member("1", "Ada"), member("1", "Ben")];
        let err = plan_collection(&local, &[]).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateId { .. }), "got: {err}");
    }

    #[test]
    fn cleared_optional_field_is_patched_to_null() {
        let mut with_bio = member("1", "Ada");
        with_bio.description = Some("Founder".into());
        let remote = vec![remote_row(&with_bio, 0)];
        let plan = plan_collection(&[member("1", "Ada")], &remote).unwrap();
        let Some(RowOp::Update { patch, .. }) = plan.updates().next() else {
            panic!("expected update");
        };
        assert_eq!(patch["description"], Value::Null);
    }
}
