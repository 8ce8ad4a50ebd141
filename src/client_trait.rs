//! Trait for Restobaza API client implementations
//!
//! This trait defines the call surface needed by service layers.
//! Both the production ApiClient and the test MockApiClient implement it.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::client::ApiError;
use crate::model::ApiResult;

/// Trait for Restobaza API client implementations
///
/// Both [`ApiClient`](crate::ApiClient) and [`MockApiClient`](crate::MockApiClient)
/// implement this trait, enabling service layers to be written against it and
/// tested without a live API or a mock HTTP server.
#[async_trait]
pub trait RestobazaApi: Send + Sync {
    /// Call an API method with caller-supplied parameters.
    ///
    /// Fails with [`ApiError`] on any pipeline stage failure; see
    /// [`ApiClient::call`](crate::ApiClient::call) for the taxonomy.
    async fn call(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ApiResult, ApiError>;
}
