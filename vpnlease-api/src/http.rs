//! HTTP implementation of the authority contract.

use crate::authority::{Authority, Operation};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use vpnlease_types::{Account, Gateway, Lease, LeaseGrant, LeaseRequest};

/// HTTP authority configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpAuthorityConfig {
    /// Base URL every path is appended to (e.g. `https://api.example.net/v1`).
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpAuthorityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Talks to the authority over JSON/HTTP.
pub struct HttpAuthority {
    config: HttpAuthorityConfig,
    client: Client,
}

impl HttpAuthority {
    /// Creates a client for the configured authority.
    pub fn new(config: HttpAuthorityConfig) -> ApiResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::Config("authority base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpAuthorityConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, operation: Operation, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{operation}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{operation} rejected: {status}");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let response = self.send(operation, request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl Authority for HttpAuthority {
    async fn create_account(&self) -> ApiResult<Account> {
        let request = self.client.post(self.url("account"));
        self.send_json(Operation::CreateAccount, request).await
    }

    async fn account_info(&self, account_id: &str) -> ApiResult<Account> {
        let path = format!("account/{}", urlencoding::encode(account_id));
        let request = self.client.get(self.url(&path));
        self.send_json(Operation::AccountInfo, request).await
    }

    async fn gateways(&self) -> ApiResult<Vec<Gateway>> {
        let request = self.client.get(self.url("gateway"));
        self.send_json(Operation::Gateways, request).await
    }

    async fn leases(&self, account_id: &str) -> ApiResult<Vec<Lease>> {
        let request = self
            .client
            .get(self.url("lease"))
            .query(&[("accountId", account_id)]);
        self.send_json(Operation::Leases, request).await
    }

    async fn request_lease(&self, lease: &LeaseRequest) -> ApiResult<LeaseGrant> {
        let request = self.client.post(self.url("lease")).json(lease);
        self.send_json(Operation::RequestLease, request).await
    }

    async fn delete_lease(&self, lease: &LeaseRequest) -> ApiResult<()> {
        let request = self.client.delete(self.url("lease")).json(lease);
        self.send(Operation::DeleteLease, request).await?;
        Ok(())
    }
}
