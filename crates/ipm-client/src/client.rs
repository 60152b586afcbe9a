//! IPM API client
//!
//! Concrete client for the IPM management API (`/api/v1/...`).

use crate::common::{ApiResponse, Credentials, HttpClient, RetryPolicy};
use crate::error::IpmError;
use crate::ipm_trait::IpmClientTrait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// IPM API client
pub struct IpmClient {
    http: HttpClient,
}

impl IpmClient {
    /// Create a new IPM client
    ///
    /// # Arguments
    /// * `base_url` - IPM base URL (e.g., "https://ipm.example:443")
    /// * `credentials` - password grant or pre-issued bearer token
    /// * `accept_invalid_certs` - skip TLS verification (lab deployments)
    pub fn new(
        base_url: String,
        credentials: Credentials,
        accept_invalid_certs: bool,
    ) -> Result<Self, IpmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self::with_client(client, base_url, credentials))
    }

    /// Create a client around an existing reqwest client
    pub fn with_client(client: Client, base_url: String, credentials: Credentials) -> Self {
        Self {
            http: HttpClient::new(client, base_url, credentials),
        }
    }

    /// Override the transient retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.http = self.http.with_retry(retry);
        self
    }

    /// Check connectivity and credentials with a lightweight request.
    pub async fn validate(&self) -> Result<(), IpmError> {
        debug!("Validating IPM credentials and connectivity");
        self.http
            .execute(Method::GET, "/xr-networks?limit=1", None)
            .await?;
        debug!("IPM credentials validated successfully");
        Ok(())
    }
}

#[async_trait::async_trait]
impl IpmClientTrait for IpmClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse, IpmError> {
        self.http.execute(method, path, body).await
    }
}
