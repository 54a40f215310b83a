//! UniDB transport.
//!
//! The hosted row store is the source of truth for all application data; this
//! module speaks its four REST verbs and nothing else.

mod repository;

pub use repository::*;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::errors::ClientError;
use crate::models::{StoreRequest, Table, UpdateRequest};

/// Thin HTTP client over the UniDB REST contract.
#[derive(Clone)]
pub struct UniDbClient {
    http: reqwest::Client,
    root: String,
    cache_bust: bool,
}

impl UniDbClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            root: config.api_root(),
            cache_bust: config.cache_bust,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/data/{}", self.root, path)
    }

    /// GET `/data/{table}/all?format=json`.
    ///
    /// A body that is not JSON comes back as `Value::Null`; deciding what an
    /// unusable body means is left to the decoder.
    pub async fn list(&self, table: Table) -> Result<Value, ClientError> {
        let mut query = vec![("format", "json".to_string())];
        if self.cache_bust {
            query.push(("t", Utc::now().timestamp_millis().to_string()));
        }

        let resp = self
            .http
            .get(self.url(&format!("{}/all", table)))
            .query(&query)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(table, e))?;

        let text = check_status(table, resp)
            .await?
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(table, e))?;

        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!("{} returned a body that is not JSON: {}", table, e);
            Value::Null
        }))
    }

    /// POST `/data/store`. Returns whatever the backend echoes back.
    pub async fn store<T: Serialize>(&self, table: Table, data: &T) -> Result<Value, ClientError> {
        let body = StoreRequest {
            table_name: table.as_str(),
            data,
        };

        let resp = self
            .http
            .post(self.url("store"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(table, e))?;

        let text = check_status(table, resp)
            .await?
            .text()
            .await
            .map_err(|e| ClientError::from_reqwest(table, e))?;

        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    /// PUT `/data/{table}/update/{entry_id}` with a full replacement payload.
    pub async fn update<T: Serialize>(
        &self,
        table: Table,
        entry_id: &str,
        data: &T,
    ) -> Result<(), ClientError> {
        let resp = self
            .http
            .put(self.url(&format!("{}/update/{}", table, entry_id)))
            .json(&UpdateRequest { data })
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(table, e))?;

        check_status(table, resp).await?;
        Ok(())
    }

    /// DELETE `/data/{table}/delete/{entry_id}`.
    pub async fn delete(&self, table: Table, entry_id: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("{}/delete/{}", table, entry_id)))
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(table, e))?;

        check_status(table, resp).await?;
        Ok(())
    }
}

async fn check_status(
    table: Table,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status {
        table,
        status: status.as_u16(),
        body,
    })
}
