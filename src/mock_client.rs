//! Mock API Client for Testing
//!
//! This module provides a `MockApiClient` that implements the same
//! [`RestobazaApi`] trait as the real client but returns scripted responses
//! without building URLs or touching the network. This is useful for
//! integration testing in consuming applications.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use restobaza_rs::{MockApiClient, RestobazaApi};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MockApiClient::new()
//!     .with_response("news/getmany", json!({"items": [1, 2, 3]}));
//!
//! let news = client.call("news/getmany", &BTreeMap::new()).await?;
//! assert_eq!(news["items"][0], 1);
//!
//! // Every invocation is recorded for assertions.
//! assert_eq!(client.calls().len(), 1);
//! assert_eq!(client.calls()[0].method, "news/getmany");
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::ApiError;
use crate::client_trait::RestobazaApi;
use crate::model::ApiResult;

/// Mock API client with scripted per-method responses.
///
/// Cloning shares the scripted responses and the call log, so a test can
/// hand a clone to the code under test and keep one for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockApiClient {
    inner: Arc<MockApiClientInner>,
}

#[derive(Debug, Default)]
struct MockApiClientInner {
    responses: Mutex<HashMap<String, Result<ApiResult, ApiError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

/// One recorded `call` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub params: BTreeMap<String, String>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful response for a method.
    pub fn with_response(self, method: impl Into<String>, data: ApiResult) -> Self {
        self.inner
            .responses
            .lock()
            .expect("mock state poisoned")
            .insert(method.into(), Ok(data));
        self
    }

    /// Scripts an error for a method.
    pub fn with_error(self, method: impl Into<String>, error: ApiError) -> Self {
        self.inner
            .responses
            .lock()
            .expect("mock state poisoned")
            .insert(method.into(), Err(error));
        self
    }

    /// All calls made so far, in invocation order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.calls.lock().expect("mock state poisoned").clone()
    }

    /// Clears the recorded call log.
    pub fn reset_calls(&self) {
        self.inner.calls.lock().expect("mock state poisoned").clear();
    }
}

#[async_trait]
impl RestobazaApi for MockApiClient {
    async fn call(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ApiResult, ApiError> {
        self.inner
            .calls
            .lock()
            .expect("mock state poisoned")
            .push(RecordedCall {
                method: method.to_string(),
                params: params.clone(),
            });

        self.inner
            .responses
            .lock()
            .expect("mock state poisoned")
            .get(method)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError {
                    code: 0,
                    description: format!("no scripted response for method: {method}"),
                })
            })
    }
}
