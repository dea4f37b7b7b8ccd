// Table client abstraction over the hosted backend
use crate::error::{DatabaseError, DatabaseResult};
use crate::query::Query;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// CRUD + filter + order + limit over named tables
///
/// Rows travel as JSON objects; typed decoding happens in the repositories.
#[async_trait]
pub trait TableClient: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>>;

    /// Insert one row and return it as stored (with generated id)
    async fn insert(&self, table: &str, row: JsonValue) -> DatabaseResult<JsonValue>;

    /// Patch every row matching `query`; an unfiltered query is rejected
    async fn update(&self, table: &str, query: &Query, patch: JsonValue) -> DatabaseResult<Vec<JsonValue>>;

    /// Delete every row matching `query`; an unfiltered query is rejected
    async fn delete(&self, table: &str, query: &Query) -> DatabaseResult<usize>;

    /// Insert or merge on the given conflict columns
    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &[&str]) -> DatabaseResult<JsonValue>;
}

/// Select and decode every row, failing on the first malformed one
pub async fn select_as<T: DeserializeOwned>(
    client: &dyn TableClient,
    table: &str,
    query: &Query,
) -> DatabaseResult<Vec<T>> {
    client
        .select(table, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(DatabaseError::from))
        .collect()
}

/// Serialize a row and drop null fields so the backend applies its defaults
pub fn to_row<T: Serialize>(value: &T) -> DatabaseResult<JsonValue> {
    let mut row = serde_json::to_value(value)?;
    if let JsonValue::Object(map) = &mut row {
        map.retain(|_, v| !v.is_null());
    }
    Ok(row)
}

pub(crate) fn guard_filtered(table: &str, query: &Query, operation: &'static str) -> DatabaseResult<()> {
    if query.is_unfiltered() {
        return Err(DatabaseError::UnfilteredMutation {
            table: table.to_string(),
            operation,
        });
    }
    Ok(())
}
