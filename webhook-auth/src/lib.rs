//! # webhook-auth
//!
//! Trust-boundary validation for inbound webhook deliveries:
//! - Provider registry (secret, algorithm, header name, replay tolerance)
//! - HMAC signature verification across Stripe, GitHub, Svix and raw hex headers
//! - Timestamp replay-window enforcement
//! - Recursive payload sanitization into a bounded [`SanitizedValue`] tree
//! - Per-provider schema and structural checks
//! - Header heuristics (content type/length, spoofable and suspicious headers)
//!
//! ## Architecture
//!
//! The crate is pure and synchronous: no network or disk access happens while a
//! delivery is validated. The only shared state is the [`ProviderRegistry`],
//! which callers build at startup and share behind an `Arc`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use webhook_auth::{ProviderRegistry, WebhookValidationEngine};
//!
//! let registry = Arc::new(ProviderRegistry::new());
//! registry.register_provider("stripe", "whsec_0123456789abcdef", None)?;
//!
//! let engine = WebhookValidationEngine::new(registry);
//! let result = engine.validate_webhook("stripe", body, signature, &headers);
//! if !result.valid {
//!     // reject with 400
//! }
//! ```

pub mod error;
pub mod heuristics;
pub mod provider_checks;
pub mod providers;
pub mod sanitize;
pub mod schema;
pub mod validator;
pub mod webhook;

// Re-export commonly used types
pub use error::{Error, ErrorKind, WebhookErrorKind};
pub use providers::{ProviderConfig, ProviderOptions, ProviderRegistry};
pub use sanitize::{PayloadSanitizer, SanitizationOptions, SanitizedValue};
pub use validator::{ValidationResult, WebhookValidationEngine};
pub use webhook::{
    generate_signature, validate_signature, HmacSignatureVerifier, ProviderWebhookValidator,
    SignatureAlgorithm, SignatureVerifier, WebhookValidator,
};

/// Maximum accepted size of a raw webhook body (1 MiB).
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
