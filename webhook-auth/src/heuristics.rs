//! Header heuristics.
//!
//! Only content-type and content-length violations are errors; everything else is
//! advisory and reported as a warning for the caller to log.

use std::collections::HashMap;

use crate::MAX_PAYLOAD_BYTES;

/// Client-supplied proxy headers that anyone can forge.
const SPOOFABLE_HEADERS: [&str; 8] = [
    "x-forwarded-for",
    "x-forwarded-host",
    "x-real-ip",
    "x-client-ip",
    "x-originating-ip",
    "x-remote-ip",
    "x-remote-addr",
    "forwarded",
];

/// Credentials that webhook senders never attach.
const UNEXPECTED_SECURITY_HEADERS: [&str; 3] = ["authorization", "cookie", "proxy-authorization"];

/// Tool and automation signatures seen in user agents of hand-crafted requests.
const SUSPICIOUS_USER_AGENTS: [&str; 12] = [
    "curl",
    "wget",
    "python-requests",
    "httpie",
    "postman",
    "insomnia",
    "bot",
    "crawler",
    "spider",
    "scanner",
    "sqlmap",
    "nikto",
];

/// Findings of a header inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicsReport {
    /// Hard failures: content-type and content-length.
    pub errors: Vec<String>,
    /// Advisory findings; never affect the verdict.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeuristics;

impl SecurityHeuristics {
    /// Inspect a header map whose names are already lower case.
    pub fn inspect(&self, headers: &HashMap<String, String>) -> HeuristicsReport {
        let mut report = HeuristicsReport::default();

        for name in SPOOFABLE_HEADERS {
            if headers.contains_key(name) {
                report
                    .warnings
                    .push(format!("Spoofable proxy header present: {name}"));
            }
        }

        match headers.get("content-type") {
            None => report.errors.push("Missing content-type header".to_string()),
            Some(value) if !value.to_lowercase().contains("application/json") => report
                .errors
                .push("Invalid content type: expected application/json".to_string()),
            Some(_) => {}
        }

        match headers.get("user-agent") {
            None => report.warnings.push("Missing user-agent header".to_string()),
            Some(agent) => {
                let agent = agent.to_lowercase();
                if let Some(tool) = SUSPICIOUS_USER_AGENTS.iter().find(|tool| agent.contains(*tool)) {
                    report
                        .warnings
                        .push(format!("Suspicious user agent signature: {tool}"));
                }
            }
        }

        for name in UNEXPECTED_SECURITY_HEADERS {
            if headers.contains_key(name) {
                report
                    .warnings
                    .push(format!("Unexpected security header present: {name}"));
            }
        }

        if let Some(length) = headers.get("content-length") {
            let length = length.trim();
            match length.parse::<u64>() {
                Ok(_) if !length.bytes().all(|b| b.is_ascii_digit()) => report
                    .errors
                    .push("Invalid content-length header".to_string()),
                Ok(bytes) if bytes > MAX_PAYLOAD_BYTES as u64 => report.errors.push(format!(
                    "Content-length exceeds maximum of {MAX_PAYLOAD_BYTES} bytes"
                )),
                Ok(_) => {}
                Err(_) => report
                    .errors
                    .push("Invalid content-length header".to_string()),
            }
        }

        report
    }
}
