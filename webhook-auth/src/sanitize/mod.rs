//! Recursive payload sanitization.
//!
//! Rewrites an untrusted [`serde_json::Value`] into a new [`SanitizedValue`] tree whose
//! size is bounded by [`SanitizationOptions`]. The input is never modified.

mod text;
mod value;

pub use text::{clean_key, clean_string, MAX_KEY_LENGTH, REDACTION_MARKER, TRUNCATION_MARKER};
pub use value::SanitizedValue;

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Number, Value};
use tracing::debug;

/// Returned in place of any value nested deeper than `max_depth`.
pub const DEPTH_PLACEHOLDER: &str = "[Max depth exceeded]";

/// Keys that are always dropped, compared case-insensitively.
pub const BUILTIN_BLOCKED_KEYS: [&str; 4] = ["__proto__", "constructor", "prototype", "eval"];

/// Bounds applied by [`PayloadSanitizer`].
#[derive(Debug, Clone)]
pub struct SanitizationOptions {
    pub max_depth: usize,
    pub max_string_length: usize,
    pub max_array_length: usize,
    pub max_object_keys: usize,
    /// When set, only these keys survive (at every level).
    pub allowed_keys: Option<Vec<String>>,
    /// Dropped in addition to [`BUILTIN_BLOCKED_KEYS`].
    pub blocked_keys: Vec<String>,
}

impl Default for SanitizationOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_string_length: 10_000,
            max_array_length: 1000,
            max_object_keys: 100,
            allowed_keys: None,
            blocked_keys: Vec::new(),
        }
    }
}

/// Sanitizer configured once and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct PayloadSanitizer {
    options: SanitizationOptions,
    blocked: HashSet<String>,
    allowed: Option<HashSet<String>>,
}

impl Default for PayloadSanitizer {
    fn default() -> Self {
        Self::new(SanitizationOptions::default())
    }
}

impl PayloadSanitizer {
    pub fn new(options: SanitizationOptions) -> Self {
        let blocked = BUILTIN_BLOCKED_KEYS
            .iter()
            .map(|key| key.to_string())
            .chain(options.blocked_keys.iter().map(|key| key.to_lowercase()))
            .collect();
        let allowed = options
            .allowed_keys
            .as_ref()
            .map(|keys| keys.iter().cloned().collect());

        Self {
            options,
            blocked,
            allowed,
        }
    }

    pub fn options(&self) -> &SanitizationOptions {
        &self.options
    }

    /// Sanitize a whole payload.
    pub fn sanitize(&self, value: &Value) -> SanitizedValue {
        self.sanitize_at(value, 0)
    }

    /// Sanitize `value` found at nesting level `depth`.
    pub fn sanitize_at(&self, value: &Value, depth: usize) -> SanitizedValue {
        if depth > self.options.max_depth {
            return SanitizedValue::String(DEPTH_PLACEHOLDER.to_string());
        }

        match value {
            Value::Null => SanitizedValue::Null,
            Value::Bool(b) => SanitizedValue::Bool(*b),
            Value::Number(n) => sanitize_number(n),
            Value::String(s) => {
                SanitizedValue::String(clean_string(s, self.options.max_string_length))
            }
            Value::Array(items) => self.sanitize_array(items, depth),
            Value::Object(map) => self.sanitize_object(map, depth),
        }
    }

    fn sanitize_array(&self, items: &[Value], depth: usize) -> SanitizedValue {
        if items.len() > self.options.max_array_length {
            debug!(
                "Truncating array of {} elements to {}",
                items.len(),
                self.options.max_array_length
            );
        }

        SanitizedValue::Array(
            items
                .iter()
                .take(self.options.max_array_length)
                .map(|item| self.sanitize_at(item, depth + 1))
                .collect(),
        )
    }

    fn sanitize_object(&self, map: &Map<String, Value>, depth: usize) -> SanitizedValue {
        let mut sanitized = BTreeMap::new();

        for (key, value) in map {
            if sanitized.len() >= self.options.max_object_keys {
                debug!(
                    "Dropping keys beyond the first {} of an object with {}",
                    self.options.max_object_keys,
                    map.len()
                );
                break;
            }

            if self.is_blocked(key) {
                debug!("Dropping blocked key");
                continue;
            }
            if let Some(allowed) = &self.allowed {
                if !allowed.contains(key) {
                    continue;
                }
            }

            let cleaned = clean_key(key);
            if cleaned.is_empty() || self.is_blocked(&cleaned) {
                continue;
            }

            if !sanitized.contains_key(&cleaned) {
                let value = self.sanitize_at(value, depth + 1);
                sanitized.insert(cleaned, value);
            }
        }

        SanitizedValue::Object(sanitized)
    }

    fn is_blocked(&self, key: &str) -> bool {
        self.blocked.contains(&key.to_lowercase())
    }
}

fn sanitize_number(n: &Number) -> SanitizedValue {
    if n.is_f64() {
        SanitizedValue::number(n.as_f64().unwrap_or(0.0))
    } else {
        SanitizedValue::Number(n.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(depth: usize, leaf: Value) -> Value {
        (0..depth).fold(leaf, |inner, _| json!({ "n": inner }))
    }

    #[test]
    fn test_scalars() {
        let sanitizer = PayloadSanitizer::default();
        assert_eq!(sanitizer.sanitize(&json!(null)), SanitizedValue::Null);
        assert_eq!(sanitizer.sanitize(&json!(true)), SanitizedValue::Bool(true));
        assert_eq!(sanitizer.sanitize(&json!(42)), SanitizedValue::Number(42.into()));
        assert_eq!(sanitizer.sanitize(&json!(1.25)).as_f64(), Some(1.25));
    }

    #[test]
    fn test_prototype_pollution_keys_are_dropped() {
        let sanitizer = PayloadSanitizer::default();
        let input = json!({
            "__proto__": {"x": 1},
            "Constructor": {},
            "PROTOTYPE": 1,
            "eval": "x",
            "name": "<script>alert(1)</script>"
        });

        let output = sanitizer.sanitize(&input);
        let map = output.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["name"]);
        assert!(!map["name"].as_str().unwrap().contains("<script"));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let sanitizer = PayloadSanitizer::default();
        let input = json!({"__proto__": 1, "a": "<b>x</b>"});
        let before = input.clone();
        let _ = sanitizer.sanitize(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_depth_placeholder_regardless_of_type() {
        let sanitizer = PayloadSanitizer::default();
        for leaf in [json!(1), json!("s"), json!([1]), json!({"k": 1}), json!(null)] {
            let output = sanitizer.sanitize(&nested(11, leaf));
            let path = vec!["n"; 11].join(".");
            assert_eq!(
                output.get_path(&path),
                Some(&SanitizedValue::String(DEPTH_PLACEHOLDER.to_string()))
            );
        }
    }

    #[test]
    fn test_value_at_max_depth_is_kept() {
        let sanitizer = PayloadSanitizer::default();
        let output = sanitizer.sanitize(&nested(10, json!(7)));
        let path = vec!["n"; 10].join(".");
        assert_eq!(output.get_path(&path), Some(&SanitizedValue::Number(7.into())));
    }

    #[test]
    fn test_very_deep_input_does_not_overflow() {
        let sanitizer = PayloadSanitizer::default();
        let mut input = json!(0);
        for _ in 0..100 {
            input = json!([input]);
        }
        let _ = sanitizer.sanitize(&input);
    }

    #[test]
    fn test_object_key_cap() {
        let sanitizer = PayloadSanitizer::default();
        let input: Map<String, Value> = (0..250).map(|i| (format!("key{i:03}"), json!(i))).collect();

        let output = sanitizer.sanitize(&Value::Object(input));
        assert_eq!(output.as_object().unwrap().len(), 100);
    }

    #[test]
    fn test_array_cap() {
        let sanitizer = PayloadSanitizer::default();
        let input = Value::Array((0..1500).map(|i| json!(i)).collect());
        assert_eq!(sanitizer.sanitize(&input).as_array().unwrap().len(), 1000);
    }

    #[test]
    fn test_custom_bounds() {
        let sanitizer = PayloadSanitizer::new(SanitizationOptions {
            max_depth: 1,
            max_string_length: 4,
            max_array_length: 2,
            max_object_keys: 1,
            ..Default::default()
        });

        assert_eq!(
            sanitizer.sanitize(&json!("abcdef")),
            SanitizedValue::String(format!("abcd{TRUNCATION_MARKER}"))
        );
        assert_eq!(sanitizer.sanitize(&json!([1, 2, 3])).as_array().unwrap().len(), 2);
        let output = sanitizer.sanitize(&json!([[1]]));
        assert_eq!(
            output.as_array().unwrap()[0].as_array().unwrap()[0],
            SanitizedValue::String(DEPTH_PLACEHOLDER.to_string())
        );
        assert_eq!(
            sanitizer.sanitize(&json!({"a": {"b": 1}})).get_path("a.b"),
            Some(&SanitizedValue::String(DEPTH_PLACEHOLDER.to_string()))
        );
    }

    #[test]
    fn test_blocked_and_allowed_keys() {
        let sanitizer = PayloadSanitizer::new(SanitizationOptions {
            blocked_keys: vec!["Password".to_string()],
            ..Default::default()
        });
        let output = sanitizer.sanitize(&json!({"password": "x", "user": "u"}));
        assert!(output.get("password").is_none());
        assert!(output.get("user").is_some());

        let sanitizer = PayloadSanitizer::new(SanitizationOptions {
            allowed_keys: Some(vec!["id".to_string(), "type".to_string()]),
            ..Default::default()
        });
        let output = sanitizer.sanitize(&json!({"id": 1, "type": "t", "extra": true}));
        assert_eq!(output.as_object().unwrap().len(), 2);
        assert!(output.get("extra").is_none());
    }

    #[test]
    fn test_keys_are_cleaned() {
        let sanitizer = PayloadSanitizer::default();
        let output = sanitizer.sanitize(&json!({"first name": 1, "<>": 2, " __proto__ ": 3}));
        let map = output.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["first_name"]);
    }
}
