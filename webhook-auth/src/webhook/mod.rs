//! Webhook signature validation.

mod provider;
mod signature;
pub mod timestamp;

pub use provider::ProviderWebhookValidator;
pub use signature::{
    compute_signature, generate_signature, validate_signature, HmacSignatureVerifier,
    SignatureAlgorithm, MIN_SECRET_LENGTH,
};
pub use timestamp::{extract_timestamp, validate_timestamp};

use std::collections::HashMap;

use crate::validator::ValidationResult;

/// Trait for validating webhook deliveries from a single provider.
pub trait WebhookValidator: Send + Sync {
    /// Validate a webhook request.
    ///
    /// # Arguments
    ///
    /// * `headers` - HTTP headers from the webhook request
    /// * `body` - Raw request body bytes
    ///
    /// # Returns
    ///
    /// The full verdict; callers must reject the request unless `valid` is set.
    fn validate(&self, headers: &HashMap<String, String>, body: &[u8]) -> ValidationResult;

    /// Get the provider identifier for this validator.
    fn provider_id(&self) -> &str;
}

/// Seam over the HMAC check so the pipeline can run with an instrumented verifier.
pub trait SignatureVerifier: Send + Sync {
    /// `true` if `signature_header` carries a valid signature of `payload`.
    fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
        algorithm: SignatureAlgorithm,
    ) -> bool;
}
