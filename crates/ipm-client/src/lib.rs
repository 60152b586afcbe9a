//! IPM REST API Client
//!
//! A Rust client library for the IPM optical transport management API.
//! Provides the authenticated command client, the query dialect helpers and
//! null-tolerant decoders for transport capacities, xr-networks and modules.
//!
//! # Example
//!
//! ```no_run
//! use ipm_client::{Credentials, IpmClient, IpmClientTrait, TransportCapacity};
//! use ipm_client::decode::decode_one;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IpmClient::new(
//!     "https://ipm.example:443".to_string(),
//!     Credentials::Password {
//!         username: "xr-user-1".to_string(),
//!         password: "secret".to_string(),
//!     },
//!     false,
//! )?;
//!
//! let value = client
//!     .get_json("/transport-capacities/tc-1?content=expanded")
//!     .await?;
//! let tc: Option<TransportCapacity> = decode_one(&value)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod decode;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod ipm_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::IpmClient;
pub use common::{ApiResponse, Credentials, HttpClient, RetryPolicy};
pub use error::IpmError;
pub use ipm_trait::IpmClientTrait;
pub use models::*;
pub use reqwest::Method;
#[cfg(feature = "test-util")]
pub use mock::MockIpmClient;
