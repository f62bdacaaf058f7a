//! Registry of provider configurations, shared read-mostly across requests.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::{ProviderConfig, ProviderOptions};
use crate::error::{config_error, ConfigErrorKind, Error};

/// Provider name -> configuration.
///
/// Populated at startup and read on every request. Lookups return `Arc` snapshots,
/// so a concurrent re-registration never changes a config mid-validation.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: DashMap<String, Arc<ProviderConfig>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider, merging its defaults with `options`.
    ///
    /// Provider names are case-insensitive.
    pub fn register_provider(
        &self,
        provider: &str,
        secret: &str,
        options: Option<ProviderOptions>,
    ) -> Result<(), Error> {
        let name = normalize(provider)?;
        let config = ProviderConfig::build(&name, secret, options)?;

        info!(
            "Registered webhook provider {} (algorithm={}, header={}, tolerance={}s)",
            name, config.algorithm, config.header_name, config.timestamp_tolerance_seconds
        );

        self.providers.insert(name, Arc::new(config));
        Ok(())
    }

    /// Snapshot of the configuration for `provider`, if registered.
    pub fn get_config(&self, provider: &str) -> Option<Arc<ProviderConfig>> {
        self.providers
            .get(&canonical_name(provider))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a provider. Returns `true` if it was registered.
    pub fn remove_provider(&self, provider: &str) -> bool {
        self.providers
            .remove(&canonical_name(provider))
            .is_some()
    }

    /// Registered provider names, sorted.
    pub fn get_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// The key a provider name is stored under: trimmed and lower-cased.
pub fn canonical_name(provider: &str) -> String {
    provider.trim().to_lowercase()
}

fn normalize(provider: &str) -> Result<String, Error> {
    let name = canonical_name(provider);
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(config_error(
            ConfigErrorKind::InvalidProviderName,
            "Provider name must be non-empty and contain only [a-z0-9_-]",
        ));
    }
    Ok(name)
}
