//! In-memory store, used by the CLI over an exported snapshot and by tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::field::Record;
use crate::error::{Error, Result};
use crate::port::store::{Filter, Store, Table};

/// Rows per table, held behind a lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Record>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from an export document.
    ///
    /// The document is a JSON object keyed by table name, each holding an
    /// array of row objects:
    ///
    /// ```json
    /// { "venues": [{ "id": "v1", "name": "Harbour Fish Bar" }], "trials": [] }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON, names an unknown
    /// table, or contains a row that is not an object.
    pub fn from_export(json: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(json)?;
        let Value::Object(tables) = document else {
            return Err(Error::Parse("export must be a JSON object keyed by table".into()));
        };

        let store = Self::new();
        for (name, rows) in tables {
            let table = Table::from_name(&name)
                .ok_or_else(|| Error::Parse(format!("unknown table in export: {name}")))?;
            let Value::Array(rows) = rows else {
                return Err(Error::Parse(format!("{table} must be an array of rows")));
            };
            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Value::Object(record) => records.push(record),
                    other => {
                        return Err(Error::Parse(format!("{table} row is not an object: {other}")))
                    }
                }
            }
            store.seed(table, records);
        }
        Ok(store)
    }

    /// Append rows to `table` as-is, without assigning ids.
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Record>) {
        self.tables.write().entry(table).or_default().extend(rows);
    }

    /// Snapshot of every row in `table`.
    pub fn rows(&self, table: Table) -> Vec<Record> {
        self.tables.read().get(&table).cloned().unwrap_or_default()
    }

    /// Row of `table` with the given id.
    pub fn row(&self, table: Table, id: &str) -> Option<Record> {
        self.tables
            .read()
            .get(&table)?
            .iter()
            .find(|r| has_id(r, id))
            .cloned()
    }
}

fn has_id(record: &Record, id: &str) -> bool {
    record.get("id").and_then(Value::as_str) == Some(id)
}

fn ensure_id(record: &mut Record) {
    if !matches!(record.get("id"), Some(Value::String(_))) {
        record.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
}

fn same_key(a: &Record, b: &Record, conflict_key: &[&str]) -> bool {
    conflict_key
        .iter()
        .all(|column| a.get(*column).unwrap_or(&Value::Null) == b.get(*column).unwrap_or(&Value::Null))
}

impl Store for MemoryStore {
    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Record>> {
        let tables = self.tables.read();
        Ok(tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, mut record: Record) -> Result<Record> {
        ensure_id(&mut record);
        self.tables
            .write()
            .entry(table)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: Table, id: &str, fields: Record) -> Result<()> {
        let mut tables = self.tables.write();
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| has_id(r, id)))
            .ok_or_else(|| Error::NotFound {
                table,
                id: id.to_string(),
            })?;
        for (column, value) in fields {
            if column != "id" {
                row.insert(column, value);
            }
        }
        Ok(())
    }

    async fn upsert(&self, table: Table, records: Vec<Record>, conflict_key: &[&str]) -> Result<()> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table).or_default();
        for mut record in records {
            match rows.iter_mut().find(|r| same_key(r, &record, conflict_key)) {
                Some(existing) => {
                    if let Some(id) = existing.get("id").cloned() {
                        record.insert("id".into(), id);
                    }
                    *existing = record;
                }
                None => {
                    ensure_id(&mut record);
                    rows.push(record);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_select_filters() {
        let store = MemoryStore::new();
        let stored = store
            .insert(Table::Venues, record(json!({ "name": "Harbour", "state": "NSW" })))
            .await
            .unwrap();
        store
            .insert(Table::Venues, record(json!({ "id": "v2", "name": "Quay", "state": "VIC" })))
            .await
            .unwrap();

        assert!(stored.get("id").and_then(Value::as_str).is_some());
        let nsw = store
            .select(Table::Venues, &Filter::all().eq("state", "NSW"))
            .await
            .unwrap();
        assert_eq!(nsw.len(), 1);
        assert_eq!(nsw[0]["name"], "Harbour");
        assert!(store.row(Table::Venues, "v2").is_some());
    }

    #[tokio::test]
    async fn update_merges_columns() {
        let store = MemoryStore::new();
        store.seed(Table::Trials, [record(json!({ "id": "t1", "status": "pending", "notes": "x" }))]);

        store
            .update(Table::Trials, "t1", record(json!({ "status": "in-progress" })))
            .await
            .unwrap();

        let row = store.row(Table::Trials, "t1").unwrap();
        assert_eq!(row["status"], "in-progress");
        assert_eq!(row["notes"], "x");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(Table::Trials, "nope", Record::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { table: Table::Trials, .. }));
    }

    #[tokio::test]
    async fn upsert_replaces_on_conflict_key() {
        let store = MemoryStore::new();
        let key = ["venue_id", "fryer_number"];
        store
            .upsert(
                Table::Readings,
                vec![record(json!({ "venue_id": "v1", "fryer_number": 1, "oil_age": 1 }))],
                &key,
            )
            .await
            .unwrap();
        let id = store.rows(Table::Readings)[0]["id"].clone();

        store
            .upsert(
                Table::Readings,
                vec![
                    record(json!({ "venue_id": "v1", "fryer_number": 1, "oil_age": 2 })),
                    record(json!({ "venue_id": "v1", "fryer_number": 2, "oil_age": 1 })),
                ],
                &key,
            )
            .await
            .unwrap();

        let rows = store.rows(Table::Readings);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["oil_age"], 2);
        assert_eq!(rows[0]["id"], id);
    }

    #[test]
    fn export_loads_named_tables() {
        let store = MemoryStore::from_export(
            r#"{ "venues": [{ "id": "v1", "name": "Harbour" }], "outcome-reasons": [] }"#,
        )
        .unwrap();
        assert_eq!(store.rows(Table::Venues).len(), 1);
        assert!(store.rows(Table::OutcomeReasons).is_empty());
    }

    #[test]
    fn export_rejects_unknown_tables_and_bad_rows() {
        assert!(matches!(
            MemoryStore::from_export(r#"{ "orders": [] }"#),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            MemoryStore::from_export(r#"{ "venues": [1] }"#),
            Err(Error::Parse(_))
        ));
        assert!(matches!(MemoryStore::from_export("[]"), Err(Error::Parse(_))));
        assert!(matches!(MemoryStore::from_export("{"), Err(Error::Json(_))));
    }
}
