use std::sync::Arc;

use crate::client::{select_as, to_row, TableClient};
use crate::error::DatabaseResult;
use crate::models::{TreatmentCostRow, TreatmentRow};
use crate::query::Query;

/// Repository for the treatment catalog and clinic cost overrides
#[derive(Clone)]
pub struct CatalogRepository {
    client: Arc<dyn TableClient>,
    treatments_table: String,
    costs_table: String,
}

impl CatalogRepository {
    /// Create a new catalog repository
    pub fn new(client: Arc<dyn TableClient>, treatments_table: &str, costs_table: &str) -> Self {
        Self {
            client,
            treatments_table: treatments_table.to_string(),
            costs_table: costs_table.to_string(),
        }
    }

    /// List catalog treatments ordered by name
    pub async fn list_treatments(&self) -> DatabaseResult<Vec<TreatmentRow>> {
        select_as(
            self.client.as_ref(),
            &self.treatments_table,
            &Query::new().order_by("name", false),
        )
        .await
    }

    /// List treatment cost overrides
    pub async fn list_treatment_costs(&self) -> DatabaseResult<Vec<TreatmentCostRow>> {
        select_as(self.client.as_ref(), &self.costs_table, &Query::new()).await
    }

    /// Insert or replace the override for `row.treatment_key`
    pub async fn upsert_treatment_cost(&self, row: &TreatmentCostRow) -> DatabaseResult<TreatmentCostRow> {
        let stored = self
            .client
            .upsert(&self.costs_table, to_row(row)?, &["treatment_key"])
            .await?;
        Ok(serde_json::from_value(stored)?)
    }
}
