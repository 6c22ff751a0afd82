//! API client for the zone sync daemon's admin API

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the admin API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        self.get("status").await
    }

    /// Health is reported with 503 when unhealthy, so the body is read either way
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("healthz").context("Invalid path")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE => {
                response.json().await.context("Failed to parse response")
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("API error ({}): {}", status, body)
            }
        }
    }

    /// Trigger a sync cycle; a failed cycle is still returned as a result
    pub async fn trigger_sync(&self) -> Result<SyncResult> {
        let url = self.base_url.join("sync").context("Invalid path")?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::OK | StatusCode::INTERNAL_SERVER_ERROR => {
                let body = response.text().await.context("Failed to read response")?;
                serde_json::from_str(&body)
                    .with_context(|| format!("Unexpected sync response: {}", body))
            }
            StatusCode::CONFLICT => {
                anyhow::bail!("A sync cycle is already in progress, try again shortly")
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("API error ({}): {}", status, body)
            }
        }
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub clusters_found: u64,
    pub zones_created: u64,
    pub zones_updated: u64,
    pub zones_deleted: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub enabled: bool,
    pub running: bool,
    pub interval_secs: u64,
    pub last_result: Option<SyncResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}
