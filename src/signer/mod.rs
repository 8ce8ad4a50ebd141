//! # Signer Module
//!
//! Request signature backends for the Restobaza API, plus the clock and
//! nonce seams the signature parameters are assembled from.
//!
//! Every API call carries a `sig` query parameter derived from the signature
//! parameters (`app_id`, `co_id`, `random`, `timestamp`) and the shared
//! application secret: the pairs are sorted by key, concatenated as
//! `key=value` with no separator, the raw secret is appended, and the result
//! is digested and rendered as lowercase hex.
//!
//! ## Digest compatibility
//!
//! The production servers verify an **MD5** digest. That is a wire contract,
//! not a cryptographic choice this crate is free to upgrade: swapping the
//! digest breaks interoperability unless the server side changes too. The
//! [`Signer`] trait keeps the digest pluggable for non-standard deployments,
//! and [`Md5Signer`] is the default every client should use.
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use restobaza_rs::signer::{Md5Signer, Signer};
//! use secrecy::Secret;
//!
//! let mut params = BTreeMap::new();
//! params.insert("app_id".to_string(), "7".to_string());
//! params.insert("co_id".to_string(), "13".to_string());
//! params.insert("random".to_string(), "42".to_string());
//! params.insert("timestamp".to_string(), "1700000000".to_string());
//!
//! let secret = Secret::new("s3cret".to_string());
//! let signature = Md5Signer::new().sign(&params, &secret);
//! assert_eq!(signature, "66080b49d31f35b9fc4fb6e3eda8ba69");
//! ```

use std::collections::BTreeMap;
use std::marker::PhantomData;

use md5::{Digest, Md5};
use rand::Rng;
use secrecy::{ExposeSecret, Secret};

/// Trait for request signature implementations.
///
/// Implementations must be deterministic: identical parameters and secret
/// always yield the identical signature string. All implementations must be
/// thread-safe (`Send + Sync`) so a client can be shared across tasks.
pub trait Signer: Send + Sync {
    /// Derives the signature string for one set of signature parameters.
    ///
    /// The parameter map is consumed in ascending key order; `BTreeMap`
    /// guarantees that regardless of insertion order.
    fn sign(&self, params: &BTreeMap<String, String>, secret: &Secret<String>) -> String;
}

/// Builds the canonical byte string the signature is computed over:
/// `key=value` pairs in ascending key order, no separator, raw secret
/// appended.
pub fn canonical_payload(params: &BTreeMap<String, String>, secret: &str) -> Vec<u8> {
    let mut payload = String::new();
    for (key, value) in params {
        payload.push_str(key);
        payload.push('=');
        payload.push_str(value);
    }
    payload.push_str(secret);
    payload.into_bytes()
}

/// Signature backend over any digest from the RustCrypto `digest` family.
pub struct DigestSigner<D> {
    _digest: PhantomData<fn() -> D>,
}

impl<D> DigestSigner<D> {
    pub fn new() -> Self {
        Self {
            _digest: PhantomData,
        }
    }
}

impl<D> Default for DigestSigner<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest> Signer for DigestSigner<D> {
    fn sign(&self, params: &BTreeMap<String, String>, secret: &Secret<String>) -> String {
        let payload = canonical_payload(params, secret.expose_secret());
        hex::encode(D::digest(&payload))
    }
}

/// The default signer. MD5 is what the production API verifies; see the
/// module docs before reaching for anything else.
pub type Md5Signer = DigestSigner<Md5>;

/// Clock seam for the `timestamp` signature parameter.
///
/// The production client uses [`SystemClock`]; tests inject a fixed value to
/// make the whole pipeline deterministic.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn unix_timestamp(&self) -> i64;
}

/// System clock backed by `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Nonce seam for the `random` signature parameter.
pub trait NonceSource: Send + Sync {
    /// A fresh nonce in `[0, 10000]` inclusive. The range is part of the
    /// wire contract with the API servers.
    fn nonce(&self) -> u32;
}

/// Thread-local RNG nonce source used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngNonce;

impl NonceSource for ThreadRngNonce {
    fn nonce(&self) -> u32 {
        rand::thread_rng().gen_range(0..=10_000)
    }
}
