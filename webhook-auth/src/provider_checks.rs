//! Provider-specific structural checks run after schema validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::providers::canonical_name;
use crate::sanitize::SanitizedValue;

// charge.succeeded, invoice.payment_succeeded, user.created
static LOWER_EVENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*(?:\.[a-z0-9_]+)+$").expect("valid event pattern"));

// PAYMENT.CAPTURE.COMPLETED
static UPPER_EVENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*(?:\.[A-Z0-9_]+)+$").expect("valid event pattern"));

/// Structural findings for `payload` as delivered by `provider`.
///
/// Fields missing entirely are left to the schema; these checks look at the values.
pub fn check_provider_payload(provider: &str, payload: &SanitizedValue) -> Vec<String> {
    match canonical_name(provider).as_str() {
        "stripe" => check_stripe(payload),
        "clerk" => check_clerk(payload),
        "github" => check_github(payload),
        "paypal" => check_paypal(payload),
        _ => Vec::new(),
    }
}

fn check_stripe(payload: &SanitizedValue) -> Vec<String> {
    let mut findings = Vec::new();

    if let Some(id) = payload.get("id").and_then(SanitizedValue::as_str) {
        if !id.starts_with("evt_") {
            findings.push("Stripe event id must start with evt_".to_string());
        }
    }
    if let Some(object) = payload.get("object").and_then(SanitizedValue::as_str) {
        if object != "event" {
            findings.push("Stripe payload object must be event".to_string());
        }
    }
    if let Some(event_type) = payload.get("type").and_then(SanitizedValue::as_str) {
        if !LOWER_EVENT_NAME.is_match(event_type) {
            findings.push("Stripe event type is not a valid event name".to_string());
        }
    }

    findings
}

fn check_clerk(payload: &SanitizedValue) -> Vec<String> {
    let mut findings = Vec::new();

    if let Some(event_type) = payload.get("type").and_then(SanitizedValue::as_str) {
        if !LOWER_EVENT_NAME.is_match(event_type) {
            findings.push("Clerk event type is not a valid event name".to_string());
        }
    }
    if let Some(data) = payload.get("data") {
        if data.as_object().is_none() {
            findings.push("Clerk payload data must be an object".to_string());
        }
    }

    findings
}

fn check_github(payload: &SanitizedValue) -> Vec<String> {
    // Ping deliveries carry `zen`/`hook_id`, push deliveries `ref`; everything else has `action`.
    let identified = ["action", "zen", "ref", "hook_id"]
        .iter()
        .any(|key| payload.get(key).is_some());
    if !identified {
        return vec!["GitHub webhook missing action field".to_string()];
    }

    match payload.get("action") {
        Some(action) if action.as_str().map_or(true, |a| a.trim().is_empty()) => {
            vec!["GitHub action must be a non-empty string".to_string()]
        }
        _ => Vec::new(),
    }
}

fn check_paypal(payload: &SanitizedValue) -> Vec<String> {
    let mut findings = Vec::new();

    if let Some(event_type) = payload.get("event_type").and_then(SanitizedValue::as_str) {
        if !UPPER_EVENT_NAME.is_match(event_type) {
            findings.push("PayPal event_type is not a valid event name".to_string());
        }
    }
    if let Some(resource) = payload.get("resource") {
        if resource.as_object().is_none() {
            findings.push("PayPal resource must be an object".to_string());
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::PayloadSanitizer;
    use serde_json::json;

    fn check(provider: &str, value: serde_json::Value) -> Vec<String> {
        check_provider_payload(provider, &PayloadSanitizer::default().sanitize(&value))
    }

    #[test]
    fn test_stripe() {
        assert!(check(
            "stripe",
            json!({"id": "evt_1", "object": "event", "type": "invoice.payment_succeeded"})
        )
        .is_empty());

        assert_eq!(
            check("stripe", json!({"id": "ch_1", "object": "charge", "type": "Charge"})),
            vec![
                "Stripe event id must start with evt_".to_string(),
                "Stripe payload object must be event".to_string(),
                "Stripe event type is not a valid event name".to_string(),
            ]
        );
    }

    #[test]
    fn test_github_ping_without_action_passes() {
        assert!(check("github", json!({"zen": "Design for failure."})).is_empty());
        assert!(check("github", json!({"ref": "refs/heads/main"})).is_empty());
        assert!(check("github", json!({"action": "opened"})).is_empty());
    }

    #[test]
    fn test_github_requires_identifying_field() {
        assert_eq!(
            check("github", json!({"sender": {}})),
            vec!["GitHub webhook missing action field".to_string()]
        );
        assert_eq!(
            check("github", json!({"action": ""})),
            vec!["GitHub action must be a non-empty string".to_string()]
        );
    }

    #[test]
    fn test_clerk_and_paypal() {
        assert!(check("clerk", json!({"type": "user.created", "data": {}})).is_empty());
        assert_eq!(check("clerk", json!({"type": "user", "data": []})).len(), 2);

        assert!(check(
            "paypal",
            json!({"event_type": "PAYMENT.CAPTURE.COMPLETED", "resource": {}})
        )
        .is_empty());
        assert_eq!(
            check("paypal", json!({"event_type": "payment", "resource": "x"})).len(),
            2
        );
    }

    #[test]
    fn test_unknown_provider_has_no_checks() {
        assert!(check("acme", json!(null)).is_empty());
    }
}
