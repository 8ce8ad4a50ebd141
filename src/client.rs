use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::client_trait::RestobazaApi;
use crate::model::{ApiErrorBody, ApiResult, CallOutcome, CallTrace};
use crate::signer::{Clock, Md5Signer, NonceSource, Signer, SystemClock, ThreadRngNonce};

/// Production API host, used when no base address is configured.
static DEFAULT_BASE_ADDRESS: Lazy<Url> =
    Lazy::new(|| Url::parse("http://api.restobaza.ru").expect("default base address is a valid URL"));

/// Parameter names whose values the client computes itself. Caller
/// parameters may not use these names; see [`ApiError::CODE_RESERVED_COLLISION`].
pub const RESERVED_PARAMS: [&str; 6] = ["sig", "format", "app_id", "co_id", "random", "timestamp"];

/// The single error type surfaced by this crate.
///
/// Transport failures, decode failures, local validation failures, and
/// errors reported by the API itself all share this shape, mirroring the
/// `{error_code, error_description}` wire format. The fixed local codes are
/// exposed as associated constants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("restobaza api error {code}: {description}")]
pub struct ApiError {
    pub code: i64,
    pub description: String,
}

impl ApiError {
    /// Transport-level failure: connection error, non-2xx status, or an
    /// unreadable response body.
    pub const CODE_TRANSPORT: i64 = 21;
    /// Response body could not be decoded as JSON.
    pub const CODE_DECODE: i64 = 22;
    /// A required configuration parameter is missing or invalid.
    pub const CODE_MISSING_PARAMETER: i64 = 23;
    /// A caller parameter collides with a reserved parameter name.
    pub const CODE_RESERVED_COLLISION: i64 = 24;
    /// Synthetic error produced in forced-error test mode.
    pub const CODE_TEST_ERROR: i64 = 123_456_789;

    /// Creates a transport-failure error.
    pub fn transport() -> Self {
        Self {
            code: Self::CODE_TRANSPORT,
            description: "transport call failed".to_string(),
        }
    }

    /// Creates a decode-failure error.
    pub fn decode() -> Self {
        Self {
            code: Self::CODE_DECODE,
            description: "response could not be decoded".to_string(),
        }
    }

    /// Creates a missing-configuration error naming the parameter.
    pub fn missing_parameter(name: &str) -> Self {
        Self {
            code: Self::CODE_MISSING_PARAMETER,
            description: format!("missing required parameter: {name}"),
        }
    }

    /// Creates an invalid-configuration error naming the parameter.
    pub fn invalid_parameter(name: &str) -> Self {
        Self {
            code: Self::CODE_MISSING_PARAMETER,
            description: format!("invalid value for parameter: {name}"),
        }
    }

    /// Creates a reserved-name collision error naming the offending key.
    pub fn reserved_collision(name: &str) -> Self {
        Self {
            code: Self::CODE_RESERVED_COLLISION,
            description: format!("parameter collides with reserved name: {name}"),
        }
    }

    /// Creates the synthetic forced-error-mode error.
    pub fn test_error() -> Self {
        Self {
            code: Self::CODE_TEST_ERROR,
            description: "synthetic test error".to_string(),
        }
    }
}

impl From<ApiErrorBody> for ApiError {
    fn from(body: ApiErrorBody) -> Self {
        Self {
            code: body.error_code,
            description: body.error_description,
        }
    }
}

/// Immutable client configuration.
///
/// `app_id`, `co_id`, and `app_secret` must be non-empty; both constructors
/// enforce that and fail with [`ApiError::CODE_MISSING_PARAMETER`] naming the
/// offending field. The secret is held behind [`secrecy::Secret`] so it never
/// appears in `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    app_id: String,
    co_id: String,
    app_secret: Secret<String>,
    base_address: Url,
    test_errors: bool,
    test_empty_data: bool,
}

impl ClientConfig {
    /// Creates a configuration for the production API host.
    ///
    /// # Errors
    ///
    /// Returns an error with code 23 if any of the three identity fields is
    /// empty.
    pub fn new(
        app_id: impl Into<String>,
        co_id: impl Into<String>,
        app_secret: Secret<String>,
    ) -> Result<Self, ApiError> {
        let app_id = app_id.into();
        let co_id = co_id.into();
        if app_id.is_empty() {
            return Err(ApiError::missing_parameter("app_id"));
        }
        if co_id.is_empty() {
            return Err(ApiError::missing_parameter("co_id"));
        }
        if app_secret.expose_secret().is_empty() {
            return Err(ApiError::missing_parameter("app_secret"));
        }
        Ok(Self {
            app_id,
            co_id,
            app_secret,
            base_address: DEFAULT_BASE_ADDRESS.clone(),
            test_errors: false,
            test_empty_data: false,
        })
    }

    /// Reads configuration from environment variables.
    ///
    /// `RESTOBAZA_APP_ID`, `RESTOBAZA_CO_ID`, and `RESTOBAZA_APP_SECRET` are
    /// required. `RESTOBAZA_API_BASE_URL` overrides the production host, and
    /// `RESTOBAZA_TEST_ERRORS` / `RESTOBAZA_TEST_EMPTY_DATA` enable the test
    /// modes (`1`, `true`, or `yes`).
    ///
    /// # Errors
    ///
    /// Returns an error with code 23 if a required variable is missing or
    /// empty, or if the base URL does not parse.
    pub fn from_env() -> Result<Self, ApiError> {
        let app_id =
            env::var("RESTOBAZA_APP_ID").map_err(|_| ApiError::missing_parameter("app_id"))?;
        let co_id =
            env::var("RESTOBAZA_CO_ID").map_err(|_| ApiError::missing_parameter("co_id"))?;
        let app_secret = env::var("RESTOBAZA_APP_SECRET")
            .map_err(|_| ApiError::missing_parameter("app_secret"))?;

        let mut config = Self::new(app_id, co_id, Secret::new(app_secret))?;

        if let Ok(raw) = env::var("RESTOBAZA_API_BASE_URL") {
            let base_address =
                Url::parse(&raw).map_err(|_| ApiError::invalid_parameter("base_address"))?;
            config.base_address = base_address;
        }
        if let Ok(raw) = env::var("RESTOBAZA_TEST_ERRORS") {
            config.test_errors = parse_flag(&raw);
        }
        if let Ok(raw) = env::var("RESTOBAZA_TEST_EMPTY_DATA") {
            config.test_empty_data = parse_flag(&raw);
        }
        Ok(config)
    }

    /// Sets the base API address.
    pub fn with_base_address(mut self, base_address: Url) -> Self {
        self.base_address = base_address;
        self
    }

    /// Enables or disables forced-error mode.
    ///
    /// When enabled, every call fails with the synthetic test error without
    /// touching the network. Used for exercising caller-side error handling.
    pub fn with_test_errors(mut self, enabled: bool) -> Self {
        self.test_errors = enabled;
        self
    }

    /// Enables or disables forced-empty-data mode.
    ///
    /// When enabled, every call succeeds with an empty JSON object without
    /// touching the network. Used for exercising caller-side empty states.
    pub fn with_test_empty_data(mut self, enabled: bool) -> Self {
        self.test_empty_data = enabled;
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn co_id(&self) -> &str {
        &self.co_id
    }

    pub fn base_address(&self) -> &Url {
        &self.base_address
    }

    pub fn test_errors(&self) -> bool {
        self.test_errors
    }

    pub fn test_empty_data(&self) -> bool {
        self.test_empty_data
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

/// Client for the Restobaza API.
///
/// Carries immutable configuration plus the injected signer, clock, and
/// nonce source. Cloning is cheap and clones share no mutable state, so one
/// client may serve concurrent calls; per-call artifacts are returned via
/// [`ApiClient::call_traced`] rather than stored on the instance.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
    signer: Arc<dyn Signer>,
    clock: Arc<dyn Clock>,
    nonces: Arc<dyn NonceSource>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client with the default MD5 signer, system clock, and
    /// thread-RNG nonce source.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            signer: Arc::new(Md5Signer::new()),
            clock: Arc::new(SystemClock),
            nonces: Arc::new(ThreadRngNonce),
        }
    }

    /// Creates a client from environment variables; see
    /// [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error with code 23 when required configuration is missing
    /// or invalid.
    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Replaces the signature backend.
    ///
    /// The default MD5 digest is what the production servers verify; swapping
    /// it only makes sense against a server configured for another digest.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    /// Replaces the clock. Tests pin the timestamp through this seam.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the nonce source. Tests pin the nonce through this seam.
    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Calls an API method and returns the decoded result.
    ///
    /// `method` is used verbatim in the URL (e.g. `news/getmany`); leading or
    /// trailing slashes are the caller's responsibility. Caller parameters
    /// may not use reserved names (see [`RESERVED_PARAMS`]).
    ///
    /// # Errors
    ///
    /// Fails with [`ApiError`] on any pipeline stage failure: reserved-name
    /// collision (24), transport failure (21), undecodable payload (22), an
    /// error-shaped API response (server-reported code), or the synthetic
    /// test error (123456789) in forced-error mode.
    pub async fn call(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ApiResult, ApiError> {
        self.call_traced(method, params)
            .await
            .map(|outcome| outcome.data)
    }

    /// Same as [`ApiClient::call`], but also returns the per-call debug
    /// trace (signature parameters, signature, merged parameters, and the
    /// final URL).
    ///
    /// # Errors
    ///
    /// See [`ApiClient::call`].
    pub async fn call_traced(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<CallOutcome, ApiError> {
        let signature_params = self.signature_params();
        let signature = self.signer.sign(&signature_params, &self.config.app_secret);
        tracing::debug!(%signature, "request signature computed");

        let standard_params = standard_params(&signature);
        let all_params = merge_params(&standard_params, &signature_params, params)?;
        let query_url = build_url(&self.config.base_address, method, &all_params)?;
        tracing::debug!(%query_url, method, "dispatching api call");

        let body = self.fetch(&query_url).await?;
        let data = decode_response(&body)?;

        Ok(CallOutcome {
            data,
            trace: CallTrace {
                signature_params,
                signature,
                standard_params,
                unique_params: params.clone(),
                all_params,
                query_url,
            },
        })
    }

    /// Builds the per-call signature parameters: identity fields from the
    /// configuration, a fresh nonce, and the current Unix timestamp. Never
    /// reused across calls; replay resistance depends on that.
    fn signature_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("app_id".to_string(), self.config.app_id.clone());
        params.insert("co_id".to_string(), self.config.co_id.clone());
        params.insert("random".to_string(), self.nonces.nonce().to_string());
        params.insert(
            "timestamp".to_string(),
            self.clock.unix_timestamp().to_string(),
        );
        params
    }

    /// Single-shot GET. Test modes short-circuit before any network access.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ApiError> {
        if self.config.test_errors {
            tracing::debug!("forced-error mode active, skipping network call");
            return Err(ApiError::test_error());
        }
        if self.config.test_empty_data {
            tracing::debug!("forced-empty-data mode active, skipping network call");
            return Ok(b"{}".to_vec());
        }

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            tracing::warn!(error = %e, "api request failed");
            ApiError::transport()
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "api responded with non-success status");
            return Err(ApiError::transport());
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to read api response body");
            ApiError::transport()
        })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl RestobazaApi for ApiClient {
    async fn call(
        &self,
        method: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ApiResult, ApiError> {
        self.call_traced(method, params)
            .await
            .map(|outcome| outcome.data)
    }
}

/// The standard parameters every request carries: the computed signature and
/// the response-format marker.
fn standard_params(signature: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("sig".to_string(), signature.to_string());
    params.insert("format".to_string(), "json".to_string());
    params
}

/// Merges standard, signature, and caller parameters into the final set.
///
/// Caller keys matching a reserved name are rejected rather than allowed to
/// shadow the computed values; the signature must stay authoritative.
fn merge_params(
    standard: &BTreeMap<String, String>,
    signature: &BTreeMap<String, String>,
    unique: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ApiError> {
    let mut merged = standard.clone();
    for (key, value) in signature {
        merged.insert(key.clone(), value.clone());
    }
    for (key, value) in unique {
        if RESERVED_PARAMS.contains(&key.as_str()) {
            return Err(ApiError::reserved_collision(key));
        }
        merged.insert(key.clone(), value.clone());
    }
    Ok(merged)
}

/// Serializes the merged parameters as `{base}/{method}?{query}`.
///
/// Values are form-encoded (space becomes `+`); keys are plain identifiers
/// and pass through unchanged. The map's key order is the query order.
fn build_url(
    base_address: &Url,
    method: &str,
    params: &BTreeMap<String, String>,
) -> Result<Url, ApiError> {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, value);
    }
    let query = query.finish();

    let base = base_address.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/{method}?{query}")).map_err(|e| {
        tracing::warn!(error = %e, method, "constructed query url does not parse");
        ApiError::transport()
    })
}

/// Decodes a raw response body and maps error-shaped payloads onto
/// [`ApiError`].
fn decode_response(body: &[u8]) -> Result<ApiResult, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "api response is not valid json");
        ApiError::decode()
    })?;

    if value.get("error_description").is_some() {
        let body: ApiErrorBody = serde_json::from_value(value).map_err(|e| {
            tracing::warn!(error = %e, "error-shaped response did not deserialize");
            ApiError::decode()
        })?;
        return Err(ApiError::from(body));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn secret(value: &str) -> Secret<String> {
        Secret::new(value.to_string())
    }

    fn sample_config() -> ClientConfig {
        ClientConfig::new("7", "13", secret("s3cret")).expect("sample config is valid")
    }

    #[test]
    fn config_rejects_empty_app_id() {
        let err = ClientConfig::new("", "13", secret("s3cret")).unwrap_err();
        assert_eq!(err.code, ApiError::CODE_MISSING_PARAMETER);
        assert!(err.description.contains("app_id"));
    }

    #[test]
    fn config_rejects_empty_co_id() {
        let err = ClientConfig::new("7", "", secret("s3cret")).unwrap_err();
        assert_eq!(err.code, 23);
        assert!(err.description.contains("co_id"));
    }

    #[test]
    fn config_rejects_empty_secret() {
        let err = ClientConfig::new("7", "13", secret("")).unwrap_err();
        assert_eq!(err.code, 23);
        assert!(err.description.contains("app_secret"));
    }

    #[test]
    fn config_defaults() {
        let config = sample_config();
        assert_eq!(config.base_address().as_str(), "http://api.restobaza.ru/");
        assert!(!config.test_errors());
        assert!(!config.test_empty_data());
    }

    #[test]
    fn config_builders_set_flags() {
        let config = sample_config()
            .with_test_errors(true)
            .with_test_empty_data(true);
        assert!(config.test_errors());
        assert!(config.test_empty_data());
    }

    #[test]
    fn parse_flag_accepts_common_truthy_values() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn standard_params_carry_signature_and_format() {
        let params = standard_params("abc123");
        assert_eq!(params.get("sig").map(String::as_str), Some("abc123"));
        assert_eq!(params.get("format").map(String::as_str), Some("json"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn merge_keeps_every_parameter_exactly_once() {
        let standard = standard_params("abc123");
        let mut signature = BTreeMap::new();
        signature.insert("app_id".to_string(), "7".to_string());
        signature.insert("co_id".to_string(), "13".to_string());
        let mut unique = BTreeMap::new();
        unique.insert("limit".to_string(), "10".to_string());

        let merged = merge_params(&standard, &signature, &unique).expect("no collisions");
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, ["app_id", "co_id", "format", "limit", "sig"]);
    }

    #[test]
    fn merge_rejects_reserved_caller_keys() {
        let standard = standard_params("abc123");
        let signature = BTreeMap::new();

        for reserved in RESERVED_PARAMS {
            let mut unique = BTreeMap::new();
            unique.insert(reserved.to_string(), "spoof".to_string());
            let err = merge_params(&standard, &signature, &unique).unwrap_err();
            assert_eq!(err.code, ApiError::CODE_RESERVED_COLLISION);
            assert!(err.description.contains(reserved));
        }
    }

    #[test]
    fn build_url_joins_base_method_and_sorted_query() {
        let base = Url::parse("http://api.example.com").unwrap();
        let mut params = BTreeMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());

        let url = build_url(&base, "news/getmany", &params).expect("url builds");
        assert_eq!(url.as_str(), "http://api.example.com/news/getmany?a=1&b=2");
    }

    #[test]
    fn build_url_form_encodes_values_only() {
        let base = Url::parse("http://api.example.com").unwrap();
        let mut params = BTreeMap::new();
        params.insert("q".to_string(), "a b&c=d".to_string());

        let url = build_url(&base, "search", &params).expect("url builds");
        assert_eq!(url.as_str(), "http://api.example.com/search?q=a+b%26c%3Dd");
    }

    #[test]
    fn build_url_tolerates_trailing_slash_on_base() {
        let base = Url::parse("http://api.example.com/").unwrap();
        let params = BTreeMap::new();
        let url = build_url(&base, "ping", &params).expect("url builds");
        assert_eq!(url.as_str(), "http://api.example.com/ping?");
    }

    #[test]
    fn decode_response_passes_plain_payload_through() {
        let value = decode_response(br#"{"items": [1, 2, 3]}"#).expect("decodes");
        assert_eq!(value, json!({"items": [1, 2, 3]}));
    }

    #[test]
    fn decode_response_maps_error_shape() {
        let err = decode_response(br#"{"error_code": 5, "error_description": "bad method"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ApiError {
                code: 5,
                description: "bad method".to_string()
            }
        );
    }

    #[test]
    fn decode_response_defaults_missing_error_code_to_zero() {
        let err = decode_response(br#"{"error_description": "oops"}"#).unwrap_err();
        assert_eq!(err.code, 0);
        assert_eq!(err.description, "oops");
    }

    #[test]
    fn decode_response_rejects_malformed_json() {
        let err = decode_response(b"<html>not json</html>").unwrap_err();
        assert_eq!(err.code, ApiError::CODE_DECODE);
    }

    #[test]
    fn decode_response_rejects_unreadable_error_shape() {
        // error_description present but not a string: claims to be an error
        // yet cannot be decoded as one.
        let err = decode_response(br#"{"error_description": 17}"#).unwrap_err();
        assert_eq!(err.code, ApiError::CODE_DECODE);
    }

    #[test]
    fn decode_response_accepts_top_level_arrays() {
        let value = decode_response(b"[1, 2, 3]").expect("decodes");
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn signature_params_use_injected_clock_and_nonce() {
        struct FixedClock;
        impl Clock for FixedClock {
            fn unix_timestamp(&self) -> i64 {
                1_700_000_000
            }
        }
        struct FixedNonce;
        impl NonceSource for FixedNonce {
            fn nonce(&self) -> u32 {
                42
            }
        }

        let client = ApiClient::new(sample_config())
            .with_clock(Arc::new(FixedClock))
            .with_nonce_source(Arc::new(FixedNonce));

        let params = client.signature_params();
        assert_eq!(params.get("app_id").map(String::as_str), Some("7"));
        assert_eq!(params.get("co_id").map(String::as_str), Some("13"));
        assert_eq!(params.get("random").map(String::as_str), Some("42"));
        assert_eq!(
            params.get("timestamp").map(String::as_str),
            Some("1700000000")
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", ApiClient::new(sample_config()));
        assert!(!rendered.contains("s3cret"));
    }
}
