//! Common utilities for the IPM API client
//!
//! Provides the authenticated HTTP wrapper shared by the concrete client and
//! the response type shared with the mock.

pub mod query;

use crate::error::IpmError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Prefix of every management API path
pub const API_PREFIX: &str = "/api/v1";

/// Keycloak realm token endpoint used by IPM
const TOKEN_PATH: &str = "/realms/xr-cm/protocol/openid-connect/token";

/// OIDC client the IPM web UI registers
const TOKEN_CLIENT_ID: &str = "xr-web-client";

/// Raw answer of the management API.
///
/// Status codes are kept as data: a 202 Accepted is a success like any 2xx,
/// callers branch on `status` when they need to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True when the server accepted the request for asynchronous processing
    pub fn is_accepted(&self) -> bool {
        self.status == 202
    }

    /// Decode the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<serde_json::Value, IpmError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Turn a status + body into the client result.
///
/// Any 2xx (202 included) is a success; everything else becomes
/// [`IpmError::Status`] with the server message verbatim.
pub fn check_status(
    method: &Method,
    path: &str,
    status: u16,
    body: Vec<u8>,
) -> Result<ApiResponse, IpmError> {
    if (200..300).contains(&status) {
        Ok(ApiResponse::new(status, body))
    } else {
        Err(IpmError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status,
            message: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// How the client authenticates against IPM
#[derive(Clone)]
pub enum Credentials {
    /// OIDC password grant, the token is fetched lazily and refreshed on 401
    Password { username: String, password: String },
    /// Pre-issued bearer token
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Token(_) => f.write_str("Token(..)"),
        }
    }
}

/// Retry policy for transient transport failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay for the given retry (0-indexed)
    pub fn delay(&self, retry: u32) -> Duration {
        self.initial_delay * 2u32.saturating_pow(retry)
    }
}

/// Statuses worth retrying without caller involvement
pub fn is_transient(status: u16) -> bool {
    matches!(status, 429 | 502 | 503 | 504)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP client wrapper with authentication and transient retry
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    token: RwLock<Option<String>>,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, credentials: Credentials) -> Self {
        let token = match &credentials {
            Credentials::Token(t) => Some(t.clone()),
            Credentials::Password { .. } => None,
        };
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            token: RwLock::new(token),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the transient retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from an API path (`/transport-capacities?...`)
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}{}", self.base_url, API_PREFIX, path)
        }
    }

    async fn bearer(&self) -> Result<String, IpmError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    async fn login(&self) -> Result<String, IpmError> {
        let Credentials::Password { username, password } = &self.credentials else {
            return Err(IpmError::Authentication(
                "bearer token rejected and no credentials to refresh it".to_string(),
            ));
        };

        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        debug!("Requesting IPM access token for {}", username);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("username", username.as_str()),
                ("password", password.as_str()),
                ("grant_type", "password"),
                ("client_id", TOKEN_CLIENT_ID),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IpmError::Authentication(format!(
                "status: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Execute one API request.
    ///
    /// Transient statuses and connection errors are retried with exponential
    /// delay; a 401 triggers a single re-login when credentials are known.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse, IpmError> {
        let url = self.build_url(path);
        let mut retry = 0u32;
        let mut relogged = false;

        loop {
            let token = self.bearer().await?;
            debug!("{} {}", method, url);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .header(ACCEPT, "application/json");
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let bytes = response.bytes().await?.to_vec();

                    if status == 401
                        && !relogged
                        && matches!(self.credentials, Credentials::Password { .. })
                    {
                        warn!("{} {} unauthorized, refreshing token", method, path);
                        *self.token.write().await = None;
                        relogged = true;
                        continue;
                    }

                    if is_transient(status) && retry < self.retry.max_retries {
                        let delay = self.retry.delay(retry);
                        warn!(
                            "{} {} returned {}, retrying in {:?} ({}/{})",
                            method,
                            path,
                            status,
                            delay,
                            retry + 1,
                            self.retry.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        retry += 1;
                        continue;
                    }

                    return check_status(&method, path, status, bytes);
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && retry < self.retry.max_retries => {
                    let delay = self.retry.delay(retry);
                    warn!("{} {} transport error: {}, retrying in {:?}", method, path, e, delay);
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(IpmError::Http(e)),
            }
        }
    }
}
