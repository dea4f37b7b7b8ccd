// REST client for the hosted table API (PostgREST dialect)
use crate::client::{guard_filtered, TableClient};
use crate::error::{DatabaseError, DatabaseResult};
use crate::query::Query;
use async_trait::async_trait;
use config_engine::BackendSettings;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, error};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "return=representation,resolution=merge-duplicates";

/// Table client talking to `{base_url}/rest/v1/{table}`
#[derive(Clone)]
pub struct RestTableClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestTableClient {
    pub fn new(settings: &BackendSettings) -> DatabaseResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &settings.api_key {
            let apikey = HeaderValue::from_str(key)
                .map_err(|e| DatabaseError::ConnectionFailed(format!("invalid api key: {e}")))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| DatabaseError::ConnectionFailed(format!("invalid api key: {e}")))?;
            headers.insert("apikey", apikey);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get full URL for a table
    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> DatabaseResult<Vec<JsonValue>> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(table, status = status.as_u16(), "Table request failed");
            return Err(DatabaseError::RequestFailed {
                table: table.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TableClient for RestTableClient {
    async fn select(&self, table: &str, query: &Query) -> DatabaseResult<Vec<JsonValue>> {
        debug!(table, params = ?query.to_params(), "select");
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .query(&query.to_params());
        self.send(table, request).await
    }

    async fn insert(&self, table: &str, row: JsonValue) -> DatabaseResult<JsonValue> {
        debug!(table, "insert");
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row);
        self.send(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::EmptyResponse(format!("insert into {table}")))
    }

    async fn update(&self, table: &str, query: &Query, patch: JsonValue) -> DatabaseResult<Vec<JsonValue>> {
        guard_filtered(table, query, "update")?;
        debug!(table, params = ?query.to_params(), "update");
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&query.to_params())
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);
        self.send(table, request).await
    }

    async fn delete(&self, table: &str, query: &Query) -> DatabaseResult<usize> {
        guard_filtered(table, query, "delete")?;
        debug!(table, params = ?query.to_params(), "delete");
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&query.to_params())
            .header("Prefer", RETURN_REPRESENTATION);
        Ok(self.send(table, request).await?.len())
    }

    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &[&str]) -> DatabaseResult<JsonValue> {
        debug!(table, on_conflict = ?on_conflict, "upsert");
        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict.join(","))])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&row);
        self.send(table, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::EmptyResponse(format!("upsert into {table}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_trims_slash() {
        let settings = BackendSettings {
            base_url: "https://clinic.example.test/".to_string(),
            api_key: Some("anon".to_string()),
            ..Default::default()
        };
        let client = RestTableClient::new(&settings).unwrap();
        assert_eq!(
            client.table_url("transactions"),
            "https://clinic.example.test/rest/v1/transactions"
        );
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let settings = BackendSettings {
            api_key: Some("bad\nkey".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            RestTableClient::new(&settings),
            Err(DatabaseError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_unfiltered_delete_is_refused() {
        let client = RestTableClient::new(&BackendSettings::default()).unwrap();
        let result = client.delete("transactions", &Query::new()).await;
        assert!(matches!(result, Err(DatabaseError::UnfilteredMutation { .. })));
    }
}
