//! Durable seen-set storage. Every operation is a fresh network round trip
//! with no local caching and no multi-key transactions. The orchestrator tolerates
//! the init flag and the seen-set being updated as two independent mutations.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use crate::config::STORE_TIMEOUT_SECS;
use crate::error::{AppError, Result};

pub trait SeenSetStore {
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;
    fn members(&self, key: &str) -> impl Future<Output = Result<HashSet<String>>> + Send;
    /// Idempotent: adding an already-present id is a no-op on the server.
    fn add(&self, key: &str, ids: &[String]) -> impl Future<Output = Result<()>> + Send;
    fn set_scalar(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Upstash-style Redis REST client: each command is POSTed as a JSON array
/// (`["SADD", key, id, ...]`) with bearer auth, and the reply carries either
/// a `result` or an `error` field.
pub struct RedisRestStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RedisRestStore {
    pub fn new(url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(STORE_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Store(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn command(&self, parts: Vec<String>) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&parts)
            .send()
            .await
            .map_err(|e| AppError::Store(format!("transport failure: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Store(format!(
                "command {} failed with status {}",
                parts.first().map(String::as_str).unwrap_or("?"),
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AppError::Store(format!("unparseable response: {e}")))?;

        if let Some(err) = body.get("error").and_then(|e| e.as_str()) {
            return Err(AppError::Store(err.to_string()));
        }

        Ok(body.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }
}

impl SeenSetStore for RedisRestStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let result = self
            .command(vec!["EXISTS".to_string(), key.to_string()])
            .await?;
        Ok(result.as_i64().unwrap_or(0) > 0)
    }

    async fn members(&self, key: &str) -> Result<HashSet<String>> {
        let result = self
            .command(vec!["SMEMBERS".to_string(), key.to_string()])
            .await?;
        // An absent key comes back as an empty array; null means the same.
        let members = result
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(members)
    }

    async fn add(&self, key: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::with_capacity(ids.len() + 2);
        parts.push("SADD".to_string());
        parts.push(key.to_string());
        parts.extend(ids.iter().cloned());
        self.command(parts).await?;
        Ok(())
    }

    async fn set_scalar(&self, key: &str, value: &str) -> Result<()> {
        self.command(vec![
            "SET".to_string(),
            key.to_string(),
            value.to_string(),
        ])
        .await?;
        Ok(())
    }
}
