//! # Restobaza Client Library
//!
//! A Rust client for the Restobaza HTTP API. Every request is authenticated
//! with a per-request signature derived from the caller identity, a nonce, a
//! timestamp, and a shared secret; the crate builds the signed URL, executes
//! a single GET, and folds transport-level and API-level failures into one
//! [`ApiError`] model.
//!
//! ## Modules
//!
//! - [`client`] - HTTP API client, configuration, and the error type
//! - [`model`] - Wire shapes and per-call trace data
//! - [`signer`] - Request signature backends and clock/nonce seams
//! - [`mocks`] - httpmock helpers for testing against a local server
//! - [`mock_client`] - Scripted mock client for service-layer tests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use restobaza_rs::{ApiClient, ClientConfig};
//! use secrecy::Secret;
//!
//! # async fn example() -> Result<(), restobaza_rs::ApiError> {
//! let config = ClientConfig::new("17", "3", Secret::new("secret".to_string()))?;
//! let client = ApiClient::new(config);
//!
//! let mut params = BTreeMap::new();
//! params.insert("limit".to_string(), "10".to_string());
//! let news = client.call("news/getmany", &params).await?;
//! println!("{news}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Signature Compatibility Warning
//!
//! The request digest is **MD5** because that is what the Restobaza servers
//! verify. It is a wire contract external to this library, not a security
//! design choice. Do not swap it for a stronger digest unless the server
//! side changes too. See the [`signer`] module docs.

pub mod client;
pub mod client_trait;
pub mod mock_client;
pub mod mocks;
pub mod model;
pub mod signer;

pub use client::{ApiClient, ApiError, ClientConfig, RESERVED_PARAMS};
pub use client_trait::RestobazaApi;
pub use mock_client::{MockApiClient, RecordedCall};
pub use model::{ApiErrorBody, ApiResult, CallOutcome, CallTrace};
pub use signer::{
    Clock, DigestSigner, Md5Signer, NonceSource, Signer, SystemClock, ThreadRngNonce,
};
