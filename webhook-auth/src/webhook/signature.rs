//! HMAC webhook signature computation and verification.
//!
//! Understands the header encodings used by the providers we receive from:
//!
//! | Style   | Example header value                 |
//! |---------|--------------------------------------|
//! | Stripe  | `t=1700000000,v1=<hex>,v0=<hex>`     |
//! | GitHub  | `sha256=<hex>`                       |
//! | Svix    | `v1,<hex> v1,<hex>`                  |
//! | Raw     | `<hex>`                              |

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::debug;

use super::SignatureVerifier;
use crate::error::{config_error, webhook_error, ConfigErrorKind, Error, WebhookErrorKind};
use crate::MAX_PAYLOAD_BYTES;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Shortest secret we are willing to compute an HMAC with.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Hash function used for a provider's HMAC signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    #[default]
    Sha256,
    Sha1,
}

impl SignatureAlgorithm {
    /// Get the algorithm identifier string, as used in GitHub-style prefixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha256 => "sha256",
            SignatureAlgorithm::Sha1 => "sha1",
        }
    }

    /// Length of a lowercase hex digest produced by this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            SignatureAlgorithm::Sha256 => 64,
            SignatureAlgorithm::Sha1 => 40,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            other => Err(config_error(
                ConfigErrorKind::InvalidOption,
                &format!("Unsupported signature algorithm: {other}"),
            )),
        }
    }
}

/// Compute `HMAC(algorithm, secret, payload)` as lowercase hex.
pub fn compute_signature(
    payload: &[u8],
    secret: &str,
    algorithm: SignatureAlgorithm,
) -> Result<String, Error> {
    let invalid_key =
        |_| webhook_error(WebhookErrorKind::InvalidSignatureFormat, "Invalid HMAC key");

    let digest = match algorithm {
        SignatureAlgorithm::Sha256 => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(invalid_key)?;
            mac.update(payload);
            hex::encode(mac.finalize().into_bytes())
        }
        SignatureAlgorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).map_err(invalid_key)?;
            mac.update(payload);
            hex::encode(mac.finalize().into_bytes())
        }
    };

    Ok(digest)
}

/// Produce a signature header for `payload`.
///
/// With a timestamp the Stripe form `t=<ts>,v1=<hex>` is returned, otherwise raw hex.
/// Intended for tests and for self-signing outbound fixtures.
pub fn generate_signature(
    payload: &[u8],
    secret: &str,
    algorithm: SignatureAlgorithm,
    timestamp: Option<i64>,
) -> Result<String, Error> {
    let digest = compute_signature(payload, secret, algorithm)?;
    Ok(match timestamp {
        Some(ts) => format!("t={ts},v1={digest}"),
        None => digest,
    })
}

/// Verify `signature_header` against the HMAC of `payload`.
///
/// Never panics; any malformed input yields `false`.
pub fn validate_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    algorithm: SignatureAlgorithm,
) -> bool {
    if payload.is_empty() || signature_header.is_empty() || secret.is_empty() {
        debug!("Signature check rejected: empty payload, header or secret");
        return false;
    }
    if secret.chars().count() < MIN_SECRET_LENGTH {
        debug!("Signature check rejected: secret shorter than {MIN_SECRET_LENGTH} characters");
        return false;
    }
    if payload.len() > MAX_PAYLOAD_BYTES {
        debug!(
            "Signature check rejected: payload of {} bytes exceeds limit",
            payload.len()
        );
        return false;
    }

    let expected = match compute_signature(payload, secret, algorithm) {
        Ok(digest) => digest,
        Err(_) => return false,
    };

    let candidates = match extract_candidates(signature_header, algorithm) {
        Some(candidates) => candidates,
        None => {
            debug!("Signature header is malformed");
            return false;
        }
    };

    // Every well-formed candidate is compared so the number of comparisons
    // does not depend on which one matches.
    let mut matched = false;
    for candidate in candidates {
        if !is_well_formed(candidate, algorithm) {
            continue;
        }
        let candidate = candidate.to_ascii_lowercase();
        matched |= constant_time_eq(candidate.as_bytes(), expected.as_bytes());
    }

    matched
}

/// Split a signature header into the signature candidates it carries.
///
/// Returns `None` when the header claims a known format but the signature part is missing.
fn extract_candidates(header: &str, algorithm: SignatureAlgorithm) -> Option<Vec<&str>> {
    let header = header.trim();

    // Stripe: t=<ts>,v1=<sig>[,v0=<sig>]
    if header.contains("v1=") {
        return header
            .split(',')
            .filter_map(|part| part.trim().strip_prefix("v1="))
            .find(|sig| !sig.is_empty())
            .map(|sig| vec![sig]);
    }

    // GitHub: sha256=<sig>
    let prefix = format!("{}=", algorithm.as_str());
    if let Some(sig) = header.strip_prefix(prefix.as_str()) {
        return (!sig.is_empty()).then(|| vec![sig]);
    }

    // Svix and friends: space separated, each optionally prefixed with "v1,"
    if header.contains(' ') {
        let candidates: Vec<&str> = header
            .split_whitespace()
            .map(|sig| sig.strip_prefix("v1,").unwrap_or(sig))
            .filter(|sig| !sig.is_empty())
            .collect();
        return (!candidates.is_empty()).then_some(candidates);
    }

    Some(vec![header])
}

/// Pure hex of exactly the digest length for `algorithm`.
fn is_well_formed(candidate: &str, algorithm: SignatureAlgorithm) -> bool {
    candidate.len() == algorithm.hex_len() && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Constant-time byte comparison.
///
/// Differing lengths return early; the length of a signature is not secret.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Default [`SignatureVerifier`] backed by [`validate_signature`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSignatureVerifier;

impl SignatureVerifier for HmacSignatureVerifier {
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        algorithm: SignatureAlgorithm,
    ) -> bool {
        validate_signature(payload, signature_header, secret, algorithm)
    }
}
