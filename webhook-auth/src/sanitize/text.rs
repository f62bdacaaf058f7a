//! String and key cleaning.

use std::sync::LazyLock;

use regex::Regex;

/// Appended to strings cut at the configured maximum length.
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// Replaces dangerous keywords inside otherwise retained strings.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Longest key name kept after cleaning.
pub const MAX_KEY_LENGTH: usize = 100;

const DANGEROUS_CHARS: [char; 5] = ['<', '>', '"', '\'', '&'];

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static JAVASCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid javascript pattern"));

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)data:[^,;\s]*(?:;[^,;\s]*)*;base64,[a-z0-9+/=]*").expect("valid data uri pattern")
});

static DANGEROUS_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)script|onload|onerror|onclick|settimeout|setinterval|eval\s*\(|function\s*\(",
    )
    .expect("valid keyword pattern")
});

/// Clean an untrusted string value.
///
/// Truncates, strips control characters, markup, script/data URIs and the characters
/// `<>"'&`, then redacts dangerous keywords in place.
pub fn clean_string(input: &str, max_length: usize) -> String {
    let mut value = match input.char_indices().nth(max_length) {
        Some((cut, _)) => format!("{}{}", &input[..cut], TRUNCATION_MARKER),
        None => input.to_string(),
    };

    value.retain(|c| !is_stripped_control(c));

    let value = HTML_TAG.replace_all(&value, "");
    let value = JAVASCRIPT_URI.replace_all(&value, "");
    let value = DATA_URI.replace_all(&value, "");

    let mut value = value.into_owned();
    value.retain(|c| !DANGEROUS_CHARS.contains(&c));

    DANGEROUS_KEYWORDS
        .replace_all(&value, REDACTION_MARKER)
        .into_owned()
}

/// Clean an object key: drop dangerous and control characters, collapse whitespace
/// runs to `_` and cap the length.
pub fn clean_key(key: &str) -> String {
    let stripped: String = key
        .chars()
        .filter(|c| !DANGEROUS_CHARS.contains(c) && !(c.is_control() && !c.is_whitespace()))
        .collect();

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_KEY_LENGTH)
        .collect()
}

// Tabs and line breaks survive; they are common in commit messages and descriptions.
fn is_stripped_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}
