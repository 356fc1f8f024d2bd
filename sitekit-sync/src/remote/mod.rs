//! Remote row store seam.
//!
//! Reconciliation only ever talks to a [`RowStore`]: [`RestStore`] speaks
//! PostgREST over HTTP, [`MemoryStore`] keeps rows in process.

use serde_json::Value;

use sitekit_core::EntityId;

use crate::SyncError;

pub mod memory;
pub mod rest;

pub use memory::{MemoryStore, Mutation};
pub use rest::RestStore;

/// One backend row, column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Outcome of a connectivity probe against one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Reachable,
    TableMissing,
}

/// Table-level row operations the reconciler needs.
pub trait RowStore {
    /// All rows of `table`, ascending by `order_by` when given.
    fn select(&self, table: &str, order_by: Option<&str>) -> Result<Vec<Row>, SyncError>;

    fn select_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, SyncError>;

    /// Insert `rows` and return them as stored, keys included, in input order.
    /// Every row of one call carries the same columns.
    fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, SyncError>;

    /// Patch the columns in `patch` on the row with primary key `id`.
    fn update(&self, table: &str, id: &str, patch: Row) -> Result<(), SyncError>;

    fn delete(&self, table: &str, ids: &[String]) -> Result<(), SyncError>;

    /// Check that `table` can be read.
    fn probe(&self, table: &str) -> Result<Probe, SyncError> {
        match self.select(table, None) {
            Ok(_) => Ok(Probe::Reachable),
            Err(err) if err.is_missing_table() => Ok(Probe::TableMissing),
            Err(err) => Err(err),
        }
    }
}

/// Primary key of `row` as an [`EntityId`]; numeric keys are stringified.
pub fn row_id(row: &Row) -> Option<EntityId> {
    match row.get("id")? {
        Value::String(s) if !s.is_empty() => Some(EntityId::from(s.as_str())),
        Value::Number(n) => Some(EntityId(n.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn row_id_accepts_strings_and_numbers() {
        assert_eq!(row_id(&row(json!({"id": "abc"}))), Some(EntityId::from("abc")));
        assert_eq!(row_id(&row(json!({"id": 7}))), Some(EntityId::from("7")));
        assert_eq!(row_id(&row(json!({"id": null}))), None);
        assert_eq!(row_id(&row(json!({"name": "x"}))), None);
    }
}
