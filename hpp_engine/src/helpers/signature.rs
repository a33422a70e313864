//! Request and callback signatures.
//!
//! The gateway authenticates both directions of the exchange with the same keyed digest:
//!
//! 1. drop the signature field itself,
//! 2. sort the remaining keys lexicographically (byte order),
//! 3. concatenate every `key + value` pair with no delimiter,
//! 4. wrap the result as `api_key + pairs + api_password`,
//! 5. SHA-256 the string and hex-encode it (lowercase).
//!
//! Values are hashed exactly as they appear on the wire. Any coercion before hashing (trimming, number formatting)
//! breaks verification.
use std::collections::BTreeMap;

use hpp_common::Secret;
use log::*;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// The name of the parameter that carries the digest, both outbound and inbound.
pub const SIGNATURE_FIELD: &str = "ivp_signature";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Cannot sign an empty parameter set")]
    EmptyParameterSet,
}

/// The two halves of the shared secret that wrap the canonical parameter string.
#[derive(Clone, Debug, Default)]
pub struct SignatureSecret {
    api_key: Secret<String>,
    api_password: Secret<String>,
}

impl SignatureSecret {
    pub fn new(api_key: Secret<String>, api_password: Secret<String>) -> Self {
        Self { api_key, api_password }
    }
}

fn canonical_pairs<I, K, V>(params: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .into_iter()
        .filter(|(k, _)| k.as_ref() != SIGNATURE_FIELD)
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect()
}

fn digest(pairs: &BTreeMap<String, String>, secret: &SignatureSecret) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.api_key.reveal().as_bytes());
    for (key, value) in pairs {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.update(secret.api_password.reveal().as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the signature over `params`. A signature field already present in `params` is ignored.
pub fn sign<I, K, V>(params: I, secret: &SignatureSecret) -> Result<String, SignatureError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let pairs = canonical_pairs(params);
    if pairs.is_empty() {
        return Err(SignatureError::EmptyParameterSet);
    }
    Ok(digest(&pairs, secret))
}

/// Recomputes the digest over `params` (minus any signature field) and compares it with `signature` in constant time.
/// Hex case is not significant. An empty parameter set or an empty signature never verifies.
pub fn verify<I, K, V>(params: I, signature: &str, secret: &SignatureSecret) -> bool
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let pairs = canonical_pairs(params);
    if pairs.is_empty() {
        warn!("🔏️ Refusing to verify a signature over an empty parameter set");
        return false;
    }
    let supplied = signature.trim().to_ascii_lowercase();
    if supplied.is_empty() {
        return false;
    }
    let expected = digest(&pairs, secret);
    let result: bool = expected.as_bytes().ct_eq(supplied.as_bytes()).into();
    trace!("🔏️ Signature verification result: {result}");
    result
}
