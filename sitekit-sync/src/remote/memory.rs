//! In-process [`RowStore`] with UUID keys and a mutation log.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use uuid::Uuid;

use super::{row_id, Row, RowStore};
use crate::SyncError;

/// A write the store accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert { table: String, id: String },
    Update { table: String, id: String },
    Delete { table: String, id: String },
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Vec<Row>>,
    log: Vec<Mutation>,
    missing: BTreeSet<String>,
    failing: BTreeSet<String>,
}

/// Rows held in memory; keys are UUID v4 strings unless the caller supplies one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `table` with `rows` as-is.
    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.lock().tables.insert(table.to_string(), rows);
        self
    }

    /// Make every call on `table` answer like a backend without that relation.
    pub fn with_missing_table(self, table: &str) -> Self {
        self.lock().missing.insert(table.to_string());
        self
    }

    /// Make writes to `table` fail with a server error.
    pub fn fail_writes_to(&self, table: &str) {
        self.lock().failing.insert(table.to_string());
    }

    /// Current rows of `table`, in storage order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().log.clone()
    }

    pub fn clear_mutations(&self) {
        self.lock().log.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn check_table(&self, table: &str) -> Result<(), SyncError> {
        if self.missing.contains(table) {
            return Err(SyncError::Remote {
                status: 404,
                code: Some("PGRST205".to_string()),
                message: format!("Could not find the table 'public.{table}' in the schema cache"),
            });
        }
        Ok(())
    }

    fn check_writable(&self, table: &str) -> Result<(), SyncError> {
        self.check_table(table)?;
        if self.failing.contains(table) {
            return Err(SyncError::Remote {
                status: 500,
                code: None,
                message: format!("write to {table} rejected"),
            });
        }
        Ok(())
    }
}

fn matches_id(row: &Row, id: &str) -> bool {
    row_id(row).map(|rid| rid.as_str() == id).unwrap_or(false)
}

fn order_key(row: &Row, column: &str) -> i64 {
    row.get(column).and_then(Value::as_i64).unwrap_or(i64::MAX)
}

impl RowStore for MemoryStore {
    fn select(&self, table: &str, order_by: Option<&str>) -> Result<Vec<Row>, SyncError> {
        let state = self.lock();
        state.check_table(table)?;
        let mut rows = state.tables.get(table).cloned().unwrap_or_default();
        if let Some(column) = order_by {
            rows.sort_by_key(|row| order_key(row, column));
        }
        Ok(rows)
    }

    fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, SyncError> {
        let state = self.lock();
        state.check_table(table)?;
        Ok(state
            .tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| matches_id(row, id)).cloned()))
    }

    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, SyncError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.check_writable(table)?;
        if let Some(first) = rows.first() {
            if rows.iter().any(|row| !row.keys().eq(first.keys())) {
                return Err(SyncError::Remote {
                    status: 400,
                    code: Some("PGRST102".to_string()),
                    message: "All object keys must match".to_string(),
                });
            }
        }
        let mut stored = Vec::with_capacity(rows.len());
        for mut row in rows {
            let id = match row_id(&row) {
                Some(id) => id.0,
                None => {
                    let id = Uuid::new_v4().to_string();
                    row.insert("id".to_string(), Value::String(id.clone()));
                    id
                }
            };
            let existing = state.tables.get(table).map(|t| t.iter().any(|r| matches_id(r, &id)));
            if existing.unwrap_or(false) {
                return Err(SyncError::Remote {
                    status: 409,
                    code: Some("23505".to_string()),
                    message: format!("duplicate key value violates unique constraint on {table}.id ({id})"),
                });
            }
            state.tables.entry(table.to_string()).or_default().push(row.clone());
            state.log.push(Mutation::Insert {
                table: table.to_string(),
                id,
            });
            stored.push(row);
        }
        Ok(stored)
    }

    fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), SyncError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.check_writable(table)?;
        if let Some(row) = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| matches_id(row, id)))
        {
            for (column, value) in patch {
                row.insert(column, value);
            }
            state.log.push(Mutation::Update {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, table: &str, ids: &[String]) -> Result<(), SyncError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.check_writable(table)?;
        let Some(rows) = state.tables.get_mut(table) else {
            return Ok(());
        };
        let before: Vec<String> = rows.iter().filter_map(row_id).map(|id| id.0).collect();
        rows.retain(|row| !ids.iter().any(|id| matches_id(row, id)));
        for id in before.into_iter().filter(|id| ids.contains(id)) {
            state.log.push(Mutation::Delete {
                table: table.to_string(),
                id,
            });
        }
        Ok(())
    }
}
