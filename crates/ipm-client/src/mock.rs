//! Mock IpmClient for unit testing
//!
//! This module provides a mock implementation of IpmClientTrait that can be used
//! in unit tests without requiring a running IPM instance.
//!
//! Responses are scripted per `(method, path)`. Each request pops the next
//! scripted answer; the last one keeps repeating so polling loops can be
//! driven with a single entry. Every request is recorded for assertions.

use crate::common::{check_status, ApiResponse};
use crate::error::IpmError;
use crate::ipm_trait::IpmClientTrait;
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// A request the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Response { status: u16, body: Vec<u8> },
    /// Transport failure before any status was received
    Unreachable(String),
}

/// Mock IpmClient for testing
#[derive(Clone)]
pub struct MockIpmClient {
    base_url: String,
    responses: Arc<Mutex<HashMap<(Method, String), VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockIpmClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    /// Queue a JSON answer with the given status
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            Scripted::Response {
                status,
                body: body.to_string().into_bytes(),
            },
        );
    }

    /// Queue an answer with an empty body (204, 202 without payload)
    pub fn respond_empty(&self, method: Method, path: &str, status: u16) {
        self.push(method, path, Scripted::Response { status, body: Vec::new() });
    }

    /// Queue an error status carrying a plain-text message
    pub fn respond_error(&self, method: Method, path: &str, status: u16, message: &str) {
        self.push(
            method,
            path,
            Scripted::Response {
                status,
                body: message.as_bytes().to_vec(),
            },
        );
    }

    /// Queue a transport failure (no status)
    pub fn respond_unreachable(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Scripted::Unreachable(message.to_string()));
    }

    /// Shorthand for a 200 GET answer
    pub fn on_get(&self, path: &str, body: Value) {
        self.respond(Method::GET, path, 200, body);
    }

    /// All requests received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests matching a method
    pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Number of requests to `(method, path)`
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn next(&self, method: &Method, path: &str) -> Option<Scripted> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait::async_trait]
impl IpmClientTrait for MockIpmClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, IpmError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });

        match self.next(&method, path) {
            Some(Scripted::Response { status, body }) => check_status(&method, path, status, body),
            Some(Scripted::Unreachable(message)) => Err(IpmError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: 503,
                message,
            }),
            None => check_status(
                &method,
                path,
                404,
                format!("no mock response for {} {}", method, path).into_bytes(),
            ),
        }
    }
}
