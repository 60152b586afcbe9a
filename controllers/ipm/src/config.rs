//! Controller configuration from environment variables.

use crate::error::ControllerError;
use crate::reconciler::Timings;
use ipm_client::Credentials;
use std::time::Duration;

const DEFAULT_IPM_URL: &str = "https://ipm.ipm:443";
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone)]
pub struct Config {
    pub ipm_url: String,
    pub credentials: Credentials,
    pub insecure_tls: bool,
    pub namespace: String,
    pub timings: Timings,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = match (var("IPM_TOKEN"), var("IPM_USERNAME"), var("IPM_PASSWORD")) {
            (Some(token), _, _) => Credentials::Token(token),
            (None, Some(username), Some(password)) => Credentials::Password { username, password },
            _ => {
                return Err(ControllerError::InvalidConfig(
                    "IPM_TOKEN or IPM_USERNAME and IPM_PASSWORD environment variables are required"
                        .to_string(),
                ));
            }
        };

        let defaults = Timings::default();
        let timings = Timings {
            poll_interval: seconds(var("IPM_POLL_INTERVAL_SECS"), "IPM_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            read_retry_interval: seconds(
                var("IPM_READ_RETRY_INTERVAL_SECS"),
                "IPM_READ_RETRY_INTERVAL_SECS",
                defaults.read_retry_interval,
            )?,
            delete_grace: seconds(var("IPM_DELETE_GRACE_SECS"), "IPM_DELETE_GRACE_SECS", defaults.delete_grace)?,
        };

        Ok(Self {
            ipm_url: var("IPM_URL").unwrap_or_else(|| DEFAULT_IPM_URL.to_string()),
            credentials,
            insecure_tls: flag(var("IPM_INSECURE_TLS"), "IPM_INSECURE_TLS")?,
            namespace: var("WATCH_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            timings,
        })
    }
}

fn seconds(value: Option<String>, key: &str, default: Duration) -> Result<Duration, ControllerError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
            ControllerError::InvalidConfig(format!("{} must be a number of seconds: {}", key, e))
        }),
    }
}

fn flag(value: Option<String>, key: &str) -> Result<bool, ControllerError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(v) => Err(ControllerError::InvalidConfig(format!(
            "{} must be true or false, got '{}'",
            key, v
        ))),
    }
}
