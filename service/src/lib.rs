use config::{Config, CONFIGURABLE_PROVIDERS};
use log::{info, warn};
use std::sync::Arc;
use webhook_auth::error::{config_error, ConfigErrorKind};
use webhook_auth::{
    Error, PayloadSanitizer, ProviderOptions, ProviderRegistry, ProviderWebhookValidator,
    WebhookValidationEngine,
};

pub mod config;
pub mod logging;

/// Builds the provider registry from every webhook secret present in the config.
pub fn init_registry(config: &Config) -> Result<ProviderRegistry, Error> {
    let registry = ProviderRegistry::new();

    for provider in CONFIGURABLE_PROVIDERS {
        let Some(secret) = config.webhook_secret(provider) else {
            continue;
        };
        let options = ProviderOptions {
            timestamp_tolerance_seconds: Some(config.webhook_timestamp_tolerance_secs),
            ..Default::default()
        };
        registry.register_provider(provider, secret, Some(options))?;
    }

    if registry.is_empty() {
        if config.is_production() {
            return Err(config_error(
                ConfigErrorKind::NoProvidersConfigured,
                "At least one webhook secret must be configured in production",
            ));
        }
        warn!("No webhook providers configured; every delivery will be rejected");
    }

    info!(
        "Webhook providers configured: [{}]",
        registry.get_providers().join(", ")
    );

    Ok(registry)
}

// Service-level state shared by every request handler.
// Cloning is cheap; the registry and engine are behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    engine: Arc<WebhookValidationEngine>,
}

impl AppState {
    pub fn new(app_config: Config) -> Result<Self, Error> {
        let registry = Arc::new(init_registry(&app_config)?);
        let sanitizer = PayloadSanitizer::new(app_config.sanitization_options());
        let engine = WebhookValidationEngine::new(registry).with_sanitizer(sanitizer);

        Ok(Self {
            config: app_config,
            engine: Arc::new(engine),
        })
    }

    pub fn engine(&self) -> &WebhookValidationEngine {
        self.engine.as_ref()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.engine.registry().as_ref()
    }

    /// A header-driven validator for one provider.
    pub fn validator_for(&self, provider: &str) -> ProviderWebhookValidator {
        ProviderWebhookValidator::new(provider, Arc::clone(&self.engine))
    }
}
