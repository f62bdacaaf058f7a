//! Pre-configured provider settings.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{config_error, ConfigErrorKind, Error};
use crate::webhook::timestamp::{DEFAULT_TOLERANCE_SECONDS, MAX_TOLERANCE_SECONDS};
use crate::webhook::{SignatureAlgorithm, MIN_SECRET_LENGTH};

/// Header used by providers we have no defaults for.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Provider configuration used to authenticate deliveries.
///
/// Immutable once registered; the registry hands out shared snapshots.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Shared signing secret.
    pub secret: SecretString,
    /// HMAC hash function.
    pub algorithm: SignatureAlgorithm,
    /// Header carrying the signature (lower case).
    pub header_name: String,
    /// Accepted distance between the signed timestamp and now.
    pub timestamp_tolerance_seconds: u64,
}

/// Optional overrides applied on top of a provider's defaults.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub algorithm: Option<SignatureAlgorithm>,
    pub header_name: Option<String>,
    pub timestamp_tolerance_seconds: Option<u64>,
}

impl ProviderConfig {
    /// Build a config for `provider` from its defaults merged with `options`.
    pub fn build(provider: &str, secret: &str, options: Option<ProviderOptions>) -> Result<Self, Error> {
        if secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(config_error(
                ConfigErrorKind::InvalidSecret,
                &format!("Webhook secret for {provider} must be at least {MIN_SECRET_LENGTH} characters"),
            ));
        }

        let mut config = defaults_for(provider, secret);
        let options = options.unwrap_or_default();

        if let Some(algorithm) = options.algorithm {
            config.algorithm = algorithm;
        }

        if let Some(header_name) = options.header_name {
            let header_name = header_name.trim().to_lowercase();
            if header_name.is_empty() {
                return Err(config_error(
                    ConfigErrorKind::InvalidOption,
                    "Signature header name must not be empty",
                ));
            }
            config.header_name = header_name;
        }

        if let Some(tolerance) = options.timestamp_tolerance_seconds {
            if tolerance > MAX_TOLERANCE_SECONDS {
                return Err(config_error(
                    ConfigErrorKind::InvalidOption,
                    &format!("Timestamp tolerance must be within 0..={MAX_TOLERANCE_SECONDS} seconds"),
                ));
            }
            config.timestamp_tolerance_seconds = tolerance;
        }

        Ok(config)
    }

    /// Expose the secret for HMAC computation.
    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

/// Defaults for the providers we know about; anything else gets a generic sha256 setup.
fn defaults_for(provider: &str, secret: &str) -> ProviderConfig {
    let header_name = match provider {
        "stripe" => "stripe-signature",
        "clerk" => "svix-signature",
        "github" => "x-hub-signature-256",
        "paypal" => "paypal-transmission-sig",
        _ => DEFAULT_SIGNATURE_HEADER,
    };

    ProviderConfig {
        secret: SecretString::from(secret.to_string()),
        algorithm: SignatureAlgorithm::Sha256,
        header_name: header_name.to_string(),
        timestamp_tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
    }
}
