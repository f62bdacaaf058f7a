//! Header-driven validator bound to one registered provider.

use std::collections::HashMap;
use std::sync::Arc;

use super::WebhookValidator;
use crate::error::WebhookErrorKind;
use crate::validator::{ValidationResult, WebhookValidationEngine};

/// Validates deliveries for a single provider.
///
/// The signature is read from the header configured for the provider (case-insensitive),
/// then the delivery is run through the full [`WebhookValidationEngine`] pipeline.
pub struct ProviderWebhookValidator {
    provider_id: String,
    engine: Arc<WebhookValidationEngine>,
}

impl ProviderWebhookValidator {
    /// Create a new validator for `provider_id`.
    ///
    /// # Arguments
    ///
    /// * `provider_id` - Provider name as registered in the engine's registry
    /// * `engine` - Shared validation engine
    pub fn new(provider_id: impl Into<String>, engine: Arc<WebhookValidationEngine>) -> Self {
        Self {
            provider_id: provider_id.into().to_lowercase(),
            engine,
        }
    }
}

impl WebhookValidator for ProviderWebhookValidator {
    fn validate(&self, headers: &HashMap<String, String>, body: &[u8]) -> ValidationResult {
        let Some(config) = self.engine.registry().get_config(&self.provider_id) else {
            return ValidationResult::rejected(
                WebhookErrorKind::MissingProviderConfig,
                format!("Provider configuration not found: {}", self.provider_id),
            );
        };

        let header_name = config.header_name.to_lowercase();
        let signature = headers
            .iter()
            .find(|(name, _)| name.to_lowercase() == header_name)
            .map(|(_, value)| value.as_str());

        match signature {
            Some(signature) => {
                self.engine
                    .validate_webhook(&self.provider_id, body, signature, headers)
            }
            None => ValidationResult::rejected(
                WebhookErrorKind::InvalidSignatureFormat,
                format!("Missing signature header: {}", config.header_name),
            ),
        }
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }
}
