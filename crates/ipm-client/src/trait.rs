//! IpmClient trait for mocking
//!
//! This trait abstracts the IpmClient to enable mocking in unit tests.
//! The concrete IpmClient implements `execute`; the typed helpers are
//! provided on top of it so mocks only script raw answers.

use crate::common::ApiResponse;
use crate::error::IpmError;
use reqwest::Method;
use serde_json::Value;

/// Trait for IPM API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime,
/// and implementations must tolerate concurrent callers.
#[async_trait::async_trait]
pub trait IpmClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Execute a request given a verb, a path+query string and an optional JSON body.
    ///
    /// Any 2xx answer (including 202 Accepted) is `Ok`; other statuses come back as
    /// [`IpmError::Status`].
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, IpmError>;

    /// GET and decode JSON
    async fn get_json(&self, path: &str) -> Result<Value, IpmError> {
        self.execute(Method::GET, path, None).await?.json()
    }

    /// POST a JSON body and decode the answer
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, IpmError> {
        self.execute(Method::POST, path, Some(body)).await?.json()
    }

    /// PUT a JSON body and decode the answer
    async fn put_json(&self, path: &str, body: &Value) -> Result<Value, IpmError> {
        self.execute(Method::PUT, path, Some(body)).await?.json()
    }

    /// DELETE, discarding the body
    async fn delete(&self, path: &str) -> Result<(), IpmError> {
        self.execute(Method::DELETE, path, None).await.map(|_| ())
    }
}
