use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;

/// Decoded payload of a successful API call.
///
/// The API is method-agnostic, so no schema is imposed beyond "not
/// error-shaped"; callers deserialize into their own types from here.
pub type ApiResult = serde_json::Value;

/// Wire shape of an error-shaped API response.
///
/// `error_code` defaults to 0 when the server omits it.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_code: i64,
    pub error_description: String,
}

/// Debug artifacts for one API call.
///
/// Everything here is call-scoped: the trace is built fresh per invocation
/// and returned with the result, so concurrent calls on a shared client
/// never observe each other's state.
#[derive(Debug, Clone)]
pub struct CallTrace {
    /// Identity, nonce, and timestamp parameters the signature was computed
    /// from.
    pub signature_params: BTreeMap<String, String>,
    /// The computed signature, lowercase hex.
    pub signature: String,
    /// `sig` and `format`.
    pub standard_params: BTreeMap<String, String>,
    /// Caller-supplied parameters, verbatim.
    pub unique_params: BTreeMap<String, String>,
    /// The full merged parameter set in serialization (key) order.
    pub all_params: BTreeMap<String, String>,
    /// The URL the request was (or would have been) dispatched to.
    pub query_url: Url,
}

/// Successful call result together with its trace.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub data: ApiResult,
    pub trace: CallTrace,
}
