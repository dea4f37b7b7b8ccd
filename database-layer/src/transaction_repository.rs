use chrono::NaiveDate;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::client::{select_as, to_row, TableClient};
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{decode_rows, Decoded, ExternalPaymentRow, TransactionRow};
use crate::query::Query;

/// Inclusive date range used to narrow transaction loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Repository over the local `transactions` table and the read-only external payments table
#[derive(Clone)]
pub struct TransactionRepository {
    client: Arc<dyn TableClient>,
    local_table: String,
    external_table: String,
}

impl TransactionRepository {
    /// Create a new transaction repository
    pub fn new(client: Arc<dyn TableClient>, local_table: &str, external_table: &str) -> Self {
        Self {
            client,
            local_table: local_table.to_string(),
            external_table: external_table.to_string(),
        }
    }

    /// List local transactions, newest first
    pub async fn list_local(&self, range: Option<DateRange>) -> DatabaseResult<Vec<Decoded<TransactionRow>>> {
        let query = ranged(Query::new(), "date", range).order_by("date", true).order_by("time", true);
        let rows = self.client.select(&self.local_table, &query).await?;
        debug!(table = %self.local_table, rows = rows.len(), "Loaded local transactions");
        Ok(decode_rows(&self.local_table, rows))
    }

    /// List every external payment, newest first
    ///
    /// `fecha` is free text in several formats, so date windows are applied
    /// by the caller once it has been parsed.
    pub async fn list_external(&self) -> DatabaseResult<Vec<Decoded<ExternalPaymentRow>>> {
        let query = Query::new().order_by("fecha", true);
        let rows = self.client.select(&self.external_table, &query).await?;
        debug!(table = %self.external_table, rows = rows.len(), "Loaded external payments");
        Ok(decode_rows(&self.external_table, rows))
    }

    /// Fetch one local transaction by id
    pub async fn get_local(&self, id: &str) -> DatabaseResult<Option<TransactionRow>> {
        let rows: Vec<TransactionRow> =
            select_as(self.client.as_ref(), &self.local_table, &Query::new().eq("id", id).limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Whether an id belongs to the external payments table
    pub async fn is_external(&self, id: &str) -> DatabaseResult<bool> {
        let rows = self
            .client
            .select(&self.external_table, &Query::new().eq("id", id).limit(1))
            .await?;
        Ok(!rows.is_empty())
    }

    /// Insert a new local transaction
    pub async fn insert(&self, row: &TransactionRow) -> DatabaseResult<TransactionRow> {
        let stored = self.client.insert(&self.local_table, to_row(row)?).await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Patch a local transaction; last write wins
    pub async fn update(&self, id: &str, patch: JsonValue) -> DatabaseResult<TransactionRow> {
        let updated = self
            .client
            .update(&self.local_table, &Query::new().eq("id", id), patch)
            .await?;
        let row = updated.into_iter().next().ok_or_else(|| DatabaseError::RecordNotFound {
            table: self.local_table.clone(),
            id: id.to_string(),
        })?;
        Ok(serde_json::from_value(row)?)
    }

    /// Delete a local transaction
    pub async fn delete(&self, id: &str) -> DatabaseResult<()> {
        let removed = self.client.delete(&self.local_table, &Query::new().eq("id", id)).await?;
        if removed == 0 {
            return Err(DatabaseError::RecordNotFound {
                table: self.local_table.clone(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn ranged(query: Query, column: &str, range: Option<DateRange>) -> Query {
    match range {
        Some(r) => query.gte(column, r.start).lte(column, r.end),
        None => query,
    }
}
