//! Error types for the `webhook-auth` crate.
//!
//! Follows the same pattern as the service layer with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

/// Top-level error type for webhook-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in webhook-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    Webhook(WebhookErrorKind),
}

/// Errors raised while registering or looking up provider configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    InvalidProviderName,
    InvalidSecret,
    InvalidOption,
    NoProvidersConfigured,
}

/// Errors from webhook validation.
///
/// Every message in a [`crate::ValidationResult`] is tagged with one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WebhookErrorKind {
    MissingProviderConfig,
    OversizedPayload,
    MalformedJson,
    InvalidSignatureFormat,
    SignatureMismatch,
    TimestampOutOfTolerance,
    SchemaViolation,
    ContentTypeOrLengthMismatch,
    ProviderCheckFailed,
    UncaughtException,
}

impl Error {
    /// The message this error was created with, or its kind when it has none.
    pub fn message(&self) -> String {
        match &self.source {
            Some(source) => source.to_string(),
            None => format!("{:?}", self.error_kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let detail = self
            .source
            .as_ref()
            .map(|s| format!(": {s}"))
            .unwrap_or_default();
        match &self.error_kind {
            ErrorKind::Config(kind) => write!(f, "Config error: {:?}{}", kind, detail),
            ErrorKind::Webhook(kind) => write!(f, "Webhook error: {:?}{}", kind, detail),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}

/// Helper function to create webhook errors.
pub fn webhook_error(kind: WebhookErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Webhook(kind),
    }
}
