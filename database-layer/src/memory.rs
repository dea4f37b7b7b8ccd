// In-memory table store, optionally backed by a JSON snapshot file
use crate::client::{guard_filtered, TableClient};
use crate::error::{DatabaseError, DatabaseResult};
use crate::query::Query;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Table client holding every table in memory
///
/// Used for offline work against a snapshot (`{"table": [rows...]}`) and in tests.
#[derive(Debug, Default)]
pub struct InMemoryTables {
    tables: RwLock<BTreeMap<String, Vec<JsonValue>>>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object mapping table names to row arrays
    pub fn from_value(value: JsonValue) -> DatabaseResult<Self> {
        let JsonValue::Object(map) = value else {
            return Err(DatabaseError::Snapshot(
                "snapshot root must be an object of tables".to_string(),
            ));
        };

        let mut tables = BTreeMap::new();
        for (name, rows) in map {
            let JsonValue::Array(rows) = rows else {
                return Err(DatabaseError::Snapshot(format!("table '{name}' must be an array")));
            };
            tables.insert(name, rows);
        }

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    pub fn from_snapshot(path: &Path) -> DatabaseResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_value(serde_json::from_str(&raw)?)?;
        info!(path = %path.display(), tables = store.tables.read().len(), "Snapshot loaded");
        Ok(store)
    }

    pub fn save_snapshot(&self, path: &Path) -> DatabaseResult<()> {
        let snapshot: Map<String, JsonValue> = self
            .tables
            .read()
            .iter()
            .map(|(name, rows)| (name.clone(), JsonValue::Array(rows.clone())))
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&JsonValue::Object(snapshot))?)?;
        info!(path = %path.display(), "Snapshot saved");
        Ok(())
    }

    pub fn seed(&self, table: &str, rows: Vec<JsonValue>) {
        self.tables.write().entry(table.to_string()).or_default().extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<JsonValue> {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }
}

fn with_generated_id(mut row: JsonValue) -> DatabaseResult<JsonValue> {
    let JsonValue::Object(map) = &mut row else {
        return Err(DatabaseError::Snapshot("rows must be JSON objects".to_string()));
    };
    let missing = map.get("id").map_or(true, JsonValue::is_null);
    if missing {
        map.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
    }
    Ok(row)
}

fn merge_into(target: &mut JsonValue, patch: &JsonValue) {
    if let (JsonValue::Object(target), JsonValue::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl TableClient for InMemoryTables {
    async fn select(&self, table: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>> {
        let tables = self.tables.read();
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(query.apply(rows))
    }

    async fn insert(&self, table: &str, row: JsonValue) -> DatabaseResult<JsonValue> {
        let row = with_generated_id(row)?;
        debug!(table, "insert (memory)");
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, query: &Query, patch: JsonValue) -> DatabaseResult<Vec<JsonValue>> {
        guard_filtered(table, query, "update")?;
        let mut tables = self.tables.write();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                merge_into(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> DatabaseResult<usize> {
        guard_filtered(table, query, "delete")?;
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok(before - rows.len())
    }

    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &[&str]) -> DatabaseResult<JsonValue> {
        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();

        let existing = rows.iter_mut().find(|candidate| {
            on_conflict
                .iter()
                .all(|column| candidate.get(*column).is_some() && candidate.get(*column) == row.get(*column))
        });

        match existing {
            Some(current) => {
                merge_into(current, &row);
                Ok(current.clone())
            }
            None => {
                let row = with_generated_id(row)?;
                rows.push(row.clone());
                Ok(row)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = InMemoryTables::new();
        let row = store
            .insert("transactions", json!({"amount": 50, "type": "income"}))
            .await
            .unwrap();

        assert!(row["id"].is_string());
        assert_eq!(store.rows("transactions").len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_filter() {
        let store = InMemoryTables::new();
        store.seed(
            "transactions",
            vec![json!({"id": "1", "amount": 10}), json!({"id": "2", "amount": 20})],
        );

        let updated = store
            .update("transactions", &Query::new().eq("id", "2"), json!({"amount": 25}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["amount"], 25);

        let removed = store.delete("transactions", &Query::new().eq("id", "1")).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.rows("transactions").len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_merges_on_conflict_columns() {
        let store = InMemoryTables::new();
        store
            .upsert("commission_rules", json!({"doctor": "Paez", "category": "_default", "rate": 30}), &["doctor", "category"])
            .await
            .unwrap();
        store
            .upsert("commission_rules", json!({"doctor": "Paez", "category": "_default", "rate": 35}), &["doctor", "category"])
            .await
            .unwrap();
        store
            .upsert("commission_rules", json!({"doctor": "Paez", "category": "Ortodoncia", "rate": 50}), &["doctor", "category"])
            .await
            .unwrap();

        let rows = store.rows("commission_rules");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rate"], 35);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let store = InMemoryTables::from_value(json!({"goals": [{"category": "BILLING", "metric": "MONTHLY", "target": 30000}]})).unwrap();
        store.save_snapshot(&path).unwrap();

        let reloaded = InMemoryTables::from_snapshot(&path).unwrap();
        let rows = reloaded.select("goals", &Query::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["target"], 30000);
    }

    #[test]
    fn test_select_sees_seeded_rows() {
        let store = InMemoryTables::new();
        store.seed("goals", vec![json!({"category": "CHAIR", "metric": "DAILY", "target": 150})]);

        let rows = tokio_test::block_on(store.select("goals", &Query::new().eq("metric", "DAILY"))).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(tokio_test::block_on(store.select("treatments", &Query::new())).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_must_be_object() {
        assert!(matches!(
            InMemoryTables::from_value(json!([1, 2, 3])),
            Err(DatabaseError::Snapshot(_))
        ));
    }
}
