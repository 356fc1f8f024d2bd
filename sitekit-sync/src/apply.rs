//! Execute plans against a [`RowStore`].
//!
//! Collection writes run deletes, then updates, then batched inserts (rows
//! that carry their own key in one batch, the rest in another). Inserted rows come back in input order and are matched to their local
//! entries by position, which yields the temporary-to-server id map.

use std::collections::BTreeMap;

use sitekit_core::{EntityId, SiteConfig};

use crate::plan::{CollectionPlan, RowOp, SettingsPlan};
use crate::remote::{row_id, Row, RowStore};
use crate::schema::{Entity, SETTINGS_TABLE};
use crate::SyncError;

/// Outcome of a single row write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    Inserted { table: &'static str, id: EntityId },
    Updated { table: &'static str, id: EntityId },
    Deleted { table: &'static str, id: EntityId },
    /// Remote row already matches.
    Unchanged { table: &'static str, id: EntityId },
    /// `--dry-run` mode: the row *would* have been inserted.
    WouldInsert { table: &'static str, id: EntityId },
    WouldUpdate { table: &'static str, id: EntityId },
    WouldDelete { table: &'static str, id: EntityId },
}

impl WriteResult {
    pub fn table(&self) -> &'static str {
        match self {
            WriteResult::Inserted { table, .. }
            | WriteResult::Updated { table, .. }
            | WriteResult::Deleted { table, .. }
            | WriteResult::Unchanged { table, .. }
            | WriteResult::WouldInsert { table, .. }
            | WriteResult::WouldUpdate { table, .. }
            | WriteResult::WouldDelete { table, .. } => *table,
        }
    }

    /// True for every variant except `Unchanged`.
    pub fn is_change(&self) -> bool {
        !matches!(self, WriteResult::Unchanged { .. })
    }
}

/// Local id → backend-assigned id, for entries inserted without a key.
pub type IdMap = BTreeMap<EntityId, EntityId>;

/// Results of applying one collection plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub results: Vec<WriteResult>,
    pub id_map: IdMap,
}

pub fn apply_settings(
    store: &dyn RowStore,
    plan: &SettingsPlan,
    settings_id: i64,
    dry_run: bool,
) -> Result<WriteResult, SyncError> {
    let table = SETTINGS_TABLE;
    let id = EntityId(settings_id.to_string());
    match plan {
        SettingsPlan::Unchanged => Ok(WriteResult::Unchanged { table, id }),
        SettingsPlan::Insert(_) if dry_run => Ok(WriteResult::WouldInsert { table, id }),
        SettingsPlan::Update(_) if dry_run => Ok(WriteResult::WouldUpdate { table, id }),
        SettingsPlan::Insert(row) => {
            store.insert(table, vec![row.clone()])?;
            tracing::info!("inserted settings row {id}");
            Ok(WriteResult::Inserted { table, id })
        }
        SettingsPlan::Update(patch) => {
            store.update(table, id.as_str(), patch.clone())?;
            tracing::info!(
                "updated settings columns: {}",
                patch.keys().cloned().collect::<Vec<_>>().join(", ")
            );
            Ok(WriteResult::Updated { table, id })
        }
    }
}

pub fn apply_collection(
    store: &dyn RowStore,
    plan: &CollectionPlan,
    dry_run: bool,
) -> Result<ApplyOutcome, SyncError> {
    let table = plan.kind.table();
    let mut outcome = ApplyOutcome::default();

    for op in &plan.ops {
        if let RowOp::Unchanged { id, .. } = op {
            tracing::debug!("unchanged: {table}/{id}");
            outcome.results.push(WriteResult::Unchanged {
                table,
                id: id.clone(),
            });
        }
    }

    let delete_ids: Vec<EntityId> = plan
        .deletes()
        .filter_map(|op| match op {
            RowOp::Delete { id } => Some(id.clone()),
            _ => None,
        })
        .collect();

    if dry_run {
        for op in &plan.ops {
            let result = match op {
                RowOp::Insert { local_id, .. } => WriteResult::WouldInsert {
                    table,
                    id: local_id.clone(),
                },
                RowOp::Update { id, .. } => WriteResult::WouldUpdate {
                    table,
                    id: id.clone(),
                },
                RowOp::Delete { id } => WriteResult::WouldDelete {
                    table,
                    id: id.clone(),
                },
                RowOp::Unchanged { .. } => continue,
            };
            tracing::info!("[dry-run] {result:?}");
            outcome.results.push(result);
        }
        return Ok(outcome);
    }

    if !delete_ids.is_empty() {
        let raw: Vec<String> = delete_ids.iter().map(|id| id.0.clone()).collect();
        store.delete(table, &raw)?;
        for id in delete_ids {
            tracing::info!("deleted: {table}/{id}");
            outcome.results.push(WriteResult::Deleted { table, id });
        }
    }

    for op in plan.updates() {
        if let RowOp::Update { id, patch, .. } = op {
            store.update(table, id.as_str(), patch.clone())?;
            tracing::info!("updated: {table}/{id}");
            outcome.results.push(WriteResult::Updated {
                table,
                id: id.clone(),
            });
        }
    }

    // PostgREST wants one key set per bulk insert, so re-inserted server keys
    // travel in their own batch.
    let (keyed, unkeyed): (Vec<_>, Vec<_>) = plan
        .inserts()
        .filter_map(|op| match op {
            RowOp::Insert { local_id, row, .. } => Some((local_id.clone(), row.clone())),
            _ => None,
        })
        .partition(|(_, row)| row.contains_key("id"));

    for batch in [keyed, unkeyed] {
        if !batch.is_empty() {
            insert_batch(store, table, batch, &mut outcome)?;
        }
    }

    Ok(outcome)
}

fn insert_batch(
    store: &dyn RowStore,
    table: &'static str,
    batch: Vec<(EntityId, Row)>,
    outcome: &mut ApplyOutcome,
) -> Result<(), SyncError> {
    let (local_ids, rows): (Vec<EntityId>, Vec<Row>) = batch.into_iter().unzip();
    let expected = rows.len();
    let stored = store.insert(table, rows)?;
    if stored.len() != expected {
        return Err(SyncError::InsertMismatch {
            table: table.to_string(),
            expected,
            got: stored.len(),
        });
    }
    for (local_id, row) in local_ids.into_iter().zip(stored.iter()) {
        let server_id = row_id(row).unwrap_or_else(|| local_id.clone());
        tracing::info!("inserted: {table}/{server_id}");
        if server_id != local_id {
            outcome.id_map.insert(local_id, server_id.clone());
        }
        outcome.results.push(WriteResult::Inserted {
            table,
            id: server_id,
        });
    }
    Ok(())
}

/// Replace local ids in `E`'s collection according to `id_map`.
///
/// Returns the number of entries rewritten.
pub fn remap_ids<E: Entity>(config: &mut SiteConfig, id_map: &IdMap) -> usize {
    let mut rewritten = 0;
    for entity in E::items_mut(config) {
        if let Some(server_id) = id_map.get(entity.id()) {
            entity.set_id(server_id.clone());
            rewritten += 1;
        }
    }
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_collection;
    use crate::remote::{MemoryStore, Mutation};
    use crate::schema::entity_to_row;
    use serde_json::json;
    use sitekit_core::TeamMember;

    fn member(id: &str, name: &str) -> TeamMember {
        TeamMember {
            id: EntityId::from(id),
            name: name.to_string(),
            role: String::new(),
            photo_url: String::new(),
            description: None,
        }
    }

    fn seeded(members: &[TeamMember]) -> MemoryStore {
        let rows = members
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let mut row = entity_to_row(m, i).unwrap();
                row.insert("id".into(), json!(m.id.as_str()));
                row
            })
            .collect();
        MemoryStore::new().with_rows("team_members", rows)
    }

    #[test]
    fn writes_run_deletes_then_updates_then_inserts() {
        let store = seeded(&[member("1", "Ada"), member("2", "Ben")]);
        let local = vec![member("1", "Ada L."), member("new-1", "Cy")];
        let plan = plan_collection(&local, &store.rows("team_members")).unwrap();

        let outcome = apply_collection(&store, &plan, false).unwrap();
        let kinds: Vec<_> = store
            .mutations()
            .into_iter()
            .map(|m| match m {
                Mutation::Delete { .. } => "delete",
                Mutation::Update { .. } => "update",
                Mutation::Insert { .. } => "insert",
            })
            .collect();
        assert_eq!(kinds, ["delete", "update", "insert"]);
        assert_eq!(outcome.id_map.len(), 1);
        assert!(outcome.id_map.contains_key(&EntityId::from("new-1")));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let store = seeded(&[member("1", "Ada")]);
        let local = vec![member("new-1", "Cy")];
        let plan = plan_collection(&local, &store.rows("team_members")).unwrap();

        let outcome = apply_collection(&store, &plan, true).unwrap();
        assert!(store.mutations().is_empty());
        assert!(outcome.id_map.is_empty());
        assert_eq!(
            outcome.results,
            vec![
                WriteResult::WouldInsert { table: "team_members", id: EntityId::from("new-1") },
                WriteResult::WouldDelete { table: "team_members", id: EntityId::from("1") },
            ]
        );
    }

    #[test]
    fn reinserted_server_keys_go_in_their_own_batch() {
        let store = MemoryStore::new();
        let key = "0b6f5c43-3d2a-4b8e-9f51-5d7a2c1e8f00";
        let local = vec![member(key, "Ada"), member("new-1", "Cy"), member("new-2", "Dee")];
        let plan = plan_collection(&local, &[]).unwrap();

        let outcome = apply_collection(&store, &plan, false).unwrap();
        let ids: Vec<_> = store
            .rows("team_members")
            .iter()
            .filter_map(row_id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&EntityId::from(key)));
        assert_eq!(outcome.id_map.len(), 2);
        assert!(!outcome.id_map.contains_key(&EntityId::from(key)));
        for temp in ["new-1", "new-2"] {
            assert!(ids.contains(&outcome.id_map[&EntityId::from(temp)]));
        }
    }

    #[test]
    fn remap_rewrites_temporary_ids() {
        let mut config = SiteConfig::default();
        config.team = vec![member("new-1", "Cy"), member("9", "Dee")];
        let mut map = IdMap::new();
        map.insert(EntityId::from("new-1"), EntityId::from("srv-1"));
        assert_eq!(remap_ids::<TeamMember>(&mut config, &map), 1);
        assert_eq!(config.team[0].id.as_str(), "srv-1");
        assert_eq!(config.team[1].id.as_str(), "9");
    }

    #[test]
    fn settings_update_patches_by_id() {
        let store = MemoryStore::new().with_rows(
            SETTINGS_TABLE,
            vec![json!({"id": 1, "theme": {}}).as_object().cloned().unwrap()],
        );
        let mut patch = crate::remote::Row::new();
        patch.insert("theme".into(), json!({"primary_color": "#000000"}));
        let result = apply_settings(&store, &SettingsPlan::Update(patch), 1, false).unwrap();
        assert!(matches!(result, WriteResult::Updated { .. }));
        assert_eq!(store.rows(SETTINGS_TABLE)[0]["theme"]["primary_color"], json!("#000000"));
    }
}
