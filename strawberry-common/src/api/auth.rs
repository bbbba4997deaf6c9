//! Launch-parameter signature verification and token hashing
//!
//! The platform signs the launch parameters it hands to an app. The signature
//! must be reproduced bit-for-bit:
//!
//! 1. Keep only parameters whose key starts with `vk_`
//! 2. Sort them by key
//! 3. Encode as an `application/x-www-form-urlencoded` query string, with
//!    array values repeated under the same key
//! 4. HMAC-SHA256 the query string keyed by the client secret
//! 5. Base64 the digest, drop the trailing padding character, then map
//!    `+` to `-` and `/` to `_`
//! 6. Compare with the `sign` parameter
//!
//! # Pure Functions
//!
//! No HTTP framework or database dependencies live here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub use super::types::LaunchParams;

type HmacSha256 = Hmac<Sha256>;

/// Prefix marking parameters supplied by the platform
pub const PLATFORM_PREFIX: &str = "vk_";

/// Name of the parameter carrying the signature
pub const SIGN_PARAM: &str = "sign";

/// Characters left unescaped in query components: letters, digits and `_.-~`.
/// Spaces are handled separately and become `+`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b' ');

// ========================================
// Error Types
// ========================================

/// Signature verification failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No scalar `sign` parameter in the request
    MissingSign,

    /// Provided signature does not match the calculated one
    Mismatch,

    /// Secret could not be used as an HMAC key
    InvalidKey(String),
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::MissingSign => write!(f, "Missing sign parameter"),
            SignatureError::Mismatch => write!(f, "Signature mismatch"),
            SignatureError::InvalidKey(err) => write!(f, "Invalid signing key: {}", err),
        }
    }
}

impl std::error::Error for SignatureError {}

// ========================================
// Signature Calculation
// ========================================

/// Build the canonical query string over the platform parameters
///
/// # Examples
///
/// ```
/// use strawberry_common::api::auth::{canonical_query, LaunchParams};
///
/// let mut params = LaunchParams::new();
/// params.insert("vk_b".into(), "2".into());
/// params.insert("vk_a".into(), "x y".into());
/// params.insert("sign".into(), "ignored".into());
///
/// assert_eq!(canonical_query(&params), "vk_a=x+y&vk_b=2");
/// ```
pub fn canonical_query(params: &LaunchParams) -> String {
    let mut pairs = Vec::new();

    // BTreeMap iteration is already sorted by key
    for (key, value) in params.iter().filter(|(k, _)| k.starts_with(PLATFORM_PREFIX)) {
        let encoded_key = encode_component(key);
        for item in value.encoded_values() {
            pairs.push(format!("{}={}", encoded_key, encode_component(&item)));
        }
    }

    pairs.join("&")
}

fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_COMPONENT)
        .to_string()
        .replace(' ', "+")
}

/// Calculate the URL-safe signature for a set of launch parameters
pub fn calculate_sign(params: &LaunchParams, secret: &str) -> Result<String, SignatureError> {
    let query = canonical_query(params);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
    mac.update(query.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut encoded = STANDARD.encode(digest);
    // 32-byte digest always encodes to 44 chars ending in a single '='
    encoded.pop();

    Ok(encoded.replace('+', "-").replace('/', "_"))
}

/// Verify the `sign` parameter against the other launch parameters
pub fn verify_sign(params: &LaunchParams, secret: &str) -> Result<(), SignatureError> {
    let provided = params
        .get(SIGN_PARAM)
        .and_then(|v| v.as_text())
        .ok_or(SignatureError::MissingSign)?;

    let calculated = calculate_sign(params, secret)?;

    if bool::from(provided.as_bytes().ct_eq(calculated.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Signature predicate used by the authorization gate
pub fn is_valid(params: &LaunchParams, secret: &str) -> bool {
    verify_sign(params, secret).is_ok()
}

// ========================================
// Token Hashing
// ========================================

/// SHA-256 of a bearer token as 64 lowercase hex characters
///
/// Tokens are stored only in this form.
///
/// # Examples
///
/// ```
/// use strawberry_common::api::auth::hash_token;
///
/// let hash = hash_token("token");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_token("token"));
/// ```
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// ========================================
// Tests
// ========================================
