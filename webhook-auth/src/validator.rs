//! The validation pipeline: one verdict per webhook delivery.
//!
//! Stages run in a fixed order. Provider lookup, signature header shape, payload size
//! and JSON parsing are fatal and end the pipeline; everything after parsing
//! accumulates findings so a rejected delivery reports all of its problems at once.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{webhook_error, Error, ErrorKind, WebhookErrorKind};
use crate::heuristics::SecurityHeuristics;
use crate::provider_checks::check_provider_payload;
use crate::providers::{canonical_name, ProviderConfig, ProviderRegistry};
use crate::sanitize::{PayloadSanitizer, SanitizedValue};
use crate::schema::SchemaValidator;
use crate::webhook::{extract_timestamp, validate_timestamp, HmacSignatureVerifier, SignatureVerifier};
use crate::MAX_PAYLOAD_BYTES;

/// Validations slower than this are logged.
const SLOW_VALIDATION: Duration = Duration::from_secs(1);

/// Longest signature header we will look at.
const MAX_SIGNATURE_HEADER_LENGTH: usize = 4096;

/// Verdict for a single delivery.
///
/// Business logic may only consume `payload`, and only when `valid` is set.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<SanitizedValue>,
    #[serde(skip)]
    kinds: Vec<WebhookErrorKind>,
}

impl ValidationResult {
    /// A rejection produced by a fatal stage.
    pub(crate) fn rejected(kind: WebhookErrorKind, message: String) -> Self {
        Self {
            valid: false,
            errors: vec![message],
            timestamp: None,
            payload: None,
            kinds: vec![kind],
        }
    }

    /// Error kinds, one per entry of `errors` and in the same order.
    pub fn kinds(&self) -> &[WebhookErrorKind] {
        &self.kinds
    }

    pub fn has_error(&self, kind: WebhookErrorKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Non-fatal findings accumulated after the payload is parsed.
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    kinds: Vec<WebhookErrorKind>,
}

impl Findings {
    fn push(&mut self, kind: WebhookErrorKind, message: impl Into<String>) {
        self.errors.push(message.into());
        self.kinds.push(kind);
    }
}

/// Sequences every trust-boundary check for a delivery.
///
/// Cheap to share: wrap it in an `Arc` and call [`Self::validate_webhook`] from any thread.
pub struct WebhookValidationEngine {
    registry: Arc<ProviderRegistry>,
    sanitizer: PayloadSanitizer,
    schemas: SchemaValidator,
    heuristics: SecurityHeuristics,
    verifier: Arc<dyn SignatureVerifier>,
}

impl WebhookValidationEngine {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            sanitizer: PayloadSanitizer::default(),
            schemas: SchemaValidator::default(),
            heuristics: SecurityHeuristics,
            verifier: Arc::new(HmacSignatureVerifier),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: PayloadSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_schema_validator(mut self, schemas: SchemaValidator) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn sanitizer(&self) -> &PayloadSanitizer {
        &self.sanitizer
    }

    /// Validate one delivery. Never panics; every failure ends up in `errors`.
    ///
    /// # Arguments
    ///
    /// * `provider` - Registered provider name
    /// * `raw_payload` - Request body exactly as received
    /// * `signature_header` - Value of the provider's signature header
    /// * `headers` - All request headers (any case)
    pub fn validate_webhook(
        &self,
        provider: &str,
        raw_payload: &[u8],
        signature_header: &str,
        headers: &HashMap<String, String>,
    ) -> ValidationResult {
        let started = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(provider, raw_payload, signature_header, headers)
        }));

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => match err.error_kind {
                ErrorKind::Webhook(kind) => ValidationResult::rejected(kind, err.message()),
                ErrorKind::Config(_) => ValidationResult::rejected(
                    WebhookErrorKind::UncaughtException,
                    format!("Validation error: {}", err.message()),
                ),
            },
            Err(panic) => ValidationResult::rejected(
                WebhookErrorKind::UncaughtException,
                format!("Validation error: {}", panic_message(panic.as_ref())),
            ),
        };

        let elapsed = started.elapsed();
        if elapsed > SLOW_VALIDATION {
            warn!(
                "Slow webhook validation for provider {}: {}ms",
                log_safe(provider),
                elapsed.as_millis()
            );
        }
        debug!(
            "Webhook from {} validated in {}us: valid={} errors={}",
            log_safe(provider),
            elapsed.as_micros(),
            result.valid,
            result.errors.len()
        );

        result
    }

    fn run_pipeline(
        &self,
        provider: &str,
        raw_payload: &[u8],
        signature_header: &str,
        headers: &HashMap<String, String>,
    ) -> Result<ValidationResult, Error> {
        let provider = canonical_name(provider);
        let provider = provider.as_str();
        let config = self.resolve_provider(provider)?;
        check_signature_header(signature_header)?;
        check_payload_size(raw_payload)?;
        let parsed = parse_payload(raw_payload)?;

        let mut findings = Findings::default();

        if !self
            .verifier
            .verify(raw_payload, signature_header, config.secret(), config.algorithm)
        {
            warn!("Invalid signature for provider {}", log_safe(provider));
            findings.push(WebhookErrorKind::SignatureMismatch, "Invalid signature");
        }

        let timestamp = extract_timestamp(signature_header);
        match timestamp {
            Some(ts) => {
                let tolerance = config.timestamp_tolerance_seconds as i64;
                if !validate_timestamp(ts, tolerance) {
                    findings.push(
                        WebhookErrorKind::TimestampOutOfTolerance,
                        "Timestamp outside tolerance window",
                    );
                }
            }
            None if provider == "stripe" => {
                warn!("Stripe delivery carries no timestamp; replay window not enforced");
            }
            None => debug!("No timestamp in signature header for {}", log_safe(provider)),
        }

        let sanitized = self.sanitizer.sanitize(&parsed);

        let schema = self.schemas.validate_schema(&sanitized, provider);
        for error in schema.errors {
            findings.push(
                WebhookErrorKind::SchemaViolation,
                format!("Schema validation: {error}"),
            );
        }

        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.clone()))
            .collect();
        let heuristics = self.heuristics.inspect(&headers);
        for warning in &heuristics.warnings {
            warn!("Webhook header heuristics ({}): {}", log_safe(provider), warning);
        }
        for error in heuristics.errors {
            findings.push(WebhookErrorKind::ContentTypeOrLengthMismatch, error);
        }

        for finding in check_provider_payload(provider, &sanitized) {
            findings.push(WebhookErrorKind::ProviderCheckFailed, finding);
        }

        Ok(ValidationResult {
            valid: findings.errors.is_empty(),
            errors: findings.errors,
            timestamp,
            payload: Some(sanitized),
            kinds: findings.kinds,
        })
    }

    fn resolve_provider(&self, provider: &str) -> Result<Arc<ProviderConfig>, Error> {
        self.registry.get_config(provider).ok_or_else(|| {
            warn!("No configuration for webhook provider {}", log_safe(provider));
            webhook_error(
                WebhookErrorKind::MissingProviderConfig,
                &format!("Provider configuration not found: {}", log_safe(provider)),
            )
        })
    }
}

fn check_signature_header(signature_header: &str) -> Result<(), Error> {
    if signature_header.trim().is_empty() {
        return Err(webhook_error(
            WebhookErrorKind::InvalidSignatureFormat,
            "Missing signature",
        ));
    }
    if signature_header.len() > MAX_SIGNATURE_HEADER_LENGTH
        || signature_header.chars().any(char::is_control)
    {
        return Err(webhook_error(
            WebhookErrorKind::InvalidSignatureFormat,
            "Invalid signature format",
        ));
    }
    Ok(())
}

fn check_payload_size(raw_payload: &[u8]) -> Result<(), Error> {
    if raw_payload.len() > MAX_PAYLOAD_BYTES {
        return Err(webhook_error(
            WebhookErrorKind::OversizedPayload,
            "Payload too large",
        ));
    }
    Ok(())
}

fn parse_payload(raw_payload: &[u8]) -> Result<Value, Error> {
    if raw_payload.iter().all(u8::is_ascii_whitespace) {
        return Err(webhook_error(WebhookErrorKind::MalformedJson, "Empty payload"));
    }
    serde_json::from_slice(raw_payload)
        .map_err(|_| webhook_error(WebhookErrorKind::MalformedJson, "Invalid JSON payload"))
}

/// Attacker-controlled text made safe for a log line.
fn log_safe(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).take(64).collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::{generate_signature, SignatureAlgorithm};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const STRIPE_SECRET: &str = "whsec_stripe_test_secret";
    const GITHUB_SECRET: &str = "github_test_secret_value";
    const ACME_SECRET: &str = "acme_test_secret_value";

    fn registry() -> Arc<ProviderRegistry> {
        let registry = Arc::new(ProviderRegistry::new());
        registry.register_provider("stripe", STRIPE_SECRET, None).unwrap();
        registry.register_provider("github", GITHUB_SECRET, None).unwrap();
        registry.register_provider("acme", ACME_SECRET, None).unwrap();
        registry
    }

    fn json_headers() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    fn stripe_event(now: i64) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "object": "event",
            "type": "charge.succeeded",
            "data": {"object": {}},
            "created": now
        }))
        .unwrap()
    }

    /// Counts calls and delegates to the real verifier.
    #[derive(Default)]
    struct CountingVerifier {
        calls: AtomicUsize,
    }

    impl SignatureVerifier for CountingVerifier {
        fn verify(
            &self,
            payload: &[u8],
            signature_header: &str,
            secret: &str,
            algorithm: SignatureAlgorithm,
        ) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            HmacSignatureVerifier.verify(payload, signature_header, secret, algorithm)
        }
    }

    struct PanickingVerifier;

    impl SignatureVerifier for PanickingVerifier {
        fn verify(&self, _: &[u8], _: &str, _: &str, _: SignatureAlgorithm) -> bool {
            panic!("verifier exploded")
        }
    }

    #[test]
    fn test_valid_stripe_delivery() {
        let now = Utc::now().timestamp();
        let body = stripe_event(now);
        let signature =
            generate_signature(&body, STRIPE_SECRET, SignatureAlgorithm::Sha256, Some(now)).unwrap();

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("stripe", &body, &signature, &json_headers());

        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
        assert_eq!(result.timestamp, Some(now));
        let payload = result.payload.expect("sanitized payload");
        assert_eq!(payload.get("type").and_then(SanitizedValue::as_str), Some("charge.succeeded"));
    }

    #[test]
    fn test_wrong_secret_reports_invalid_signature_and_keeps_going() {
        let now = Utc::now().timestamp();
        let body = stripe_event(now);
        let signature = generate_signature(
            &body,
            "some_other_secret_value",
            SignatureAlgorithm::Sha256,
            Some(now),
        )
        .unwrap();

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("stripe", &body, &signature, &HashMap::new());

        assert!(!result.valid);
        assert!(result.errors.contains(&"Invalid signature".to_string()));
        // Later stages still ran.
        assert!(result.has_error(WebhookErrorKind::ContentTypeOrLengthMismatch));
        assert!(result.payload.is_some());
        assert_eq!(result.errors.len(), result.kinds().len());
    }

    #[test]
    fn test_prototype_pollution_and_script_are_neutralized() {
        let body = br#"{"__proto__":{"x":1},"name":"<script>alert(1)</script>"}"#;
        let signature = generate_signature(body, ACME_SECRET, SignatureAlgorithm::Sha256, None).unwrap();

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("acme", body, &signature, &json_headers());

        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        let payload = result.payload.unwrap();
        let map = payload.as_object().unwrap();
        assert!(!map.contains_key("__proto__"));
        assert!(!map["name"].as_str().unwrap().contains("<script"));
    }

    #[test]
    fn test_oversized_payload_never_reaches_signature_check() {
        let verifier = Arc::new(CountingVerifier::default());
        let engine = WebhookValidationEngine::new(registry())
            .with_signature_verifier(Arc::clone(&verifier) as Arc<dyn SignatureVerifier>);

        let body = vec![b' '; 2 * 1024 * 1024];
        let result = engine.validate_webhook("stripe", &body, "t=1,v1=abc", &json_headers());

        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Payload too large".to_string()]);
        assert_eq!(result.kinds(), &[WebhookErrorKind::OversizedPayload]);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_github_ping_passes_without_action() {
        let body = br#"{"zen":"Anything added dilutes everything else.","hook_id":42}"#;
        let signature = format!(
            "sha256={}",
            generate_signature(body, GITHUB_SECRET, SignatureAlgorithm::Sha256, None).unwrap()
        );

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("github", body, &signature, &json_headers());

        assert!(result.valid, "unexpected errors: {:?}", result.errors);
        assert_eq!(result.timestamp, None);
    }

    #[test]
    fn test_fatal_stages_short_circuit() {
        let engine = WebhookValidationEngine::new(registry());
        let headers = json_headers();

        let result = engine.validate_webhook("gitlab", b"{}", "abc", &headers);
        assert_eq!(result.kinds(), &[WebhookErrorKind::MissingProviderConfig]);

        let result = engine.validate_webhook("stripe", b"{}", "  ", &headers);
        assert_eq!(result.kinds(), &[WebhookErrorKind::InvalidSignatureFormat]);

        let result = engine.validate_webhook("stripe", b"{}", "t=1\n,v1=abc", &headers);
        assert_eq!(result.kinds(), &[WebhookErrorKind::InvalidSignatureFormat]);

        let result = engine.validate_webhook("stripe", b"", "abc", &headers);
        assert_eq!(result.errors, vec!["Empty payload".to_string()]);

        let result = engine.validate_webhook("stripe", b"{not json", "abc", &headers);
        assert_eq!(result.errors, vec!["Invalid JSON payload".to_string()]);
        assert!(result.payload.is_none());
    }

    #[test]
    fn test_padded_provider_name_still_gets_schema_and_provider_checks() {
        let now = Utc::now().timestamp();
        let body = br#"{"id":"ch_1","anything":"goes"}"#;
        let signature =
            generate_signature(body, STRIPE_SECRET, SignatureAlgorithm::Sha256, Some(now)).unwrap();
        let engine = WebhookValidationEngine::new(registry());

        let canonical = engine.validate_webhook("stripe", body, &signature, &json_headers());
        assert!(!canonical.valid);
        assert!(canonical.has_error(WebhookErrorKind::SchemaViolation));
        assert!(canonical.has_error(WebhookErrorKind::ProviderCheckFailed));

        for name in [" stripe", "stripe\t", "  StRiPe  "] {
            let result = engine.validate_webhook(name, body, &signature, &json_headers());
            assert!(!result.valid, "{name:?} skipped validation");
            assert!(!result.has_error(WebhookErrorKind::SignatureMismatch));
            assert!(result.has_error(WebhookErrorKind::SchemaViolation));
            assert!(result.has_error(WebhookErrorKind::ProviderCheckFailed));
            assert_eq!(result.errors, canonical.errors);
        }
    }

    #[test]
    fn test_padded_github_name_still_requires_identifying_field() {
        let body = br#"{"sender":{"login":"octocat"}}"#;
        let signature = format!(
            "sha256={}",
            generate_signature(body, GITHUB_SECRET, SignatureAlgorithm::Sha256, None).unwrap()
        );

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook(" GitHub ", body, &signature, &json_headers());

        assert!(result
            .errors
            .contains(&"GitHub webhook missing action field".to_string()));
    }

    #[test]
    fn test_stale_timestamp_is_reported() {
        let stale = Utc::now().timestamp() - 3600;
        let body = stripe_event(stale);
        let signature =
            generate_signature(&body, STRIPE_SECRET, SignatureAlgorithm::Sha256, Some(stale)).unwrap();

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("stripe", &body, &signature, &json_headers());

        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec!["Timestamp outside tolerance window".to_string()]
        );
        assert_eq!(result.timestamp, Some(stale));
    }

    #[test]
    fn test_schema_and_provider_findings_accumulate() {
        let now = Utc::now().timestamp();
        let body = serde_json::to_vec(&json!({"id": "ch_1", "object": "event", "type": "charge.succeeded"}))
            .unwrap();
        let signature =
            generate_signature(&body, STRIPE_SECRET, SignatureAlgorithm::Sha256, Some(now)).unwrap();

        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("stripe", &body, &signature, &json_headers());

        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![
                "Schema validation: data: required field missing".to_string(),
                "Schema validation: data.object: required field missing".to_string(),
                "Schema validation: created: required field missing".to_string(),
                "Stripe event id must start with evt_".to_string(),
            ]
        );
    }

    #[test]
    fn test_panics_become_validation_errors() {
        let engine = WebhookValidationEngine::new(registry())
            .with_signature_verifier(Arc::new(PanickingVerifier));
        let result = engine.validate_webhook("acme", b"{}", "abc", &json_headers());

        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec!["Validation error: verifier exploded".to_string()]
        );
        assert_eq!(result.kinds(), &[WebhookErrorKind::UncaughtException]);
    }

    #[test]
    fn test_result_serializes_without_internal_kinds() {
        let engine = WebhookValidationEngine::new(registry());
        let result = engine.validate_webhook("gitlab", b"{}", "abc", &json_headers());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"valid": false, "errors": ["Provider configuration not found: gitlab"]})
        );
    }

    #[test]
    fn test_concurrent_validation_shares_engine() {
        let engine = Arc::new(WebhookValidationEngine::new(registry()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let now = Utc::now().timestamp();
                    let body = stripe_event(now);
                    let signature = generate_signature(
                        &body,
                        STRIPE_SECRET,
                        SignatureAlgorithm::Sha256,
                        Some(now),
                    )
                    .unwrap();
                    engine
                        .validate_webhook("stripe", &body, &signature, &json_headers())
                        .valid
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
