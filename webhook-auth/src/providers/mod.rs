//! Provider configurations and the registry that holds them.

mod config;
mod registry;

pub use config::{ProviderConfig, ProviderOptions, DEFAULT_SIGNATURE_HEADER};
pub use registry::{canonical_name, ProviderRegistry};
