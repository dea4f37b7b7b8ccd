use rust_decimal::Decimal;
use std::sync::Arc;

use crate::client::{select_as, to_row, TableClient};
use crate::error::DatabaseResult;
use crate::models::{ClinicConfigRow, CommissionRuleRow, GoalRow};
use crate::query::Query;

/// Repository for commission rules, clinic cost configuration and goals
#[derive(Clone)]
pub struct SettingsRepository {
    client: Arc<dyn TableClient>,
    rules_table: String,
    config_table: String,
    goals_table: String,
}

impl SettingsRepository {
    /// Create a new settings repository
    pub fn new(client: Arc<dyn TableClient>, rules_table: &str, config_table: &str, goals_table: &str) -> Self {
        Self {
            client,
            rules_table: rules_table.to_string(),
            config_table: config_table.to_string(),
            goals_table: goals_table.to_string(),
        }
    }

    // Commission rules

    pub async fn list_commission_rules(&self) -> DatabaseResult<Vec<CommissionRuleRow>> {
        select_as(
            self.client.as_ref(),
            &self.rules_table,
            &Query::new().order_by("doctor", false).order_by("category", false),
        )
        .await
    }

    pub async fn upsert_commission_rule(&self, rule: &CommissionRuleRow) -> DatabaseResult<CommissionRuleRow> {
        let stored = self
            .client
            .upsert(&self.rules_table, to_row(rule)?, &["doctor", "category"])
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Returns the number of rules removed
    pub async fn delete_commission_rule(&self, doctor: &str, category: &str) -> DatabaseResult<usize> {
        self.client
            .delete(
                &self.rules_table,
                &Query::new().eq("doctor", doctor).eq("category", category),
            )
            .await
    }

    // Clinic configuration

    pub async fn list_config(&self) -> DatabaseResult<Vec<ClinicConfigRow>> {
        select_as(self.client.as_ref(), &self.config_table, &Query::new().order_by("key", false)).await
    }

    pub async fn set_config_value(&self, key: &str, value: Decimal) -> DatabaseResult<ClinicConfigRow> {
        let row = ClinicConfigRow {
            key: key.to_string(),
            value,
        };
        let stored = self.client.upsert(&self.config_table, to_row(&row)?, &["key"]).await?;
        Ok(serde_json::from_value(stored)?)
    }

    // Goals

    pub async fn list_goals(&self) -> DatabaseResult<Vec<GoalRow>> {
        select_as(self.client.as_ref(), &self.goals_table, &Query::new()).await
    }

    pub async fn upsert_goal(&self, goal: &GoalRow) -> DatabaseResult<GoalRow> {
        let stored = self
            .client
            .upsert(&self.goals_table, to_row(goal)?, &["category", "metric"])
            .await?;
        Ok(serde_json::from_value(stored)?)
    }
}
