//! The sanitized JSON value tree handed to business logic.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Number;

/// JSON-compatible value produced by [`super::PayloadSanitizer`].
///
/// This is the only type that crosses from the trust boundary into business logic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SanitizedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<SanitizedValue>),
    Object(BTreeMap<String, SanitizedValue>),
}

impl SanitizedValue {
    /// Number from a float; `NaN` and infinities become `0`.
    pub fn number(value: f64) -> Self {
        SanitizedValue::Number(Number::from_f64(value).unwrap_or_else(|| Number::from(0)))
    }

    /// Member lookup on objects.
    pub fn get(&self, key: &str) -> Option<&SanitizedValue> {
        match self {
            SanitizedValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Lookup by a dot separated path (`data.object`).
    pub fn get_path(&self, path: &str) -> Option<&SanitizedValue> {
        path.split('.')
            .try_fold(self, |value, segment| value.get(segment))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SanitizedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, SanitizedValue>> {
        match self {
            SanitizedValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<SanitizedValue>> {
        match self {
            SanitizedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SanitizedValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SanitizedValue::Null)
    }

    /// JSON type name, used in schema error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SanitizedValue::Null => "null",
            SanitizedValue::Bool(_) => "boolean",
            SanitizedValue::Number(_) => "number",
            SanitizedValue::String(_) => "string",
            SanitizedValue::Array(_) => "array",
            SanitizedValue::Object(_) => "object",
        }
    }
}

impl From<SanitizedValue> for serde_json::Value {
    fn from(value: SanitizedValue) -> Self {
        match value {
            SanitizedValue::Null => serde_json::Value::Null,
            SanitizedValue::Bool(b) => serde_json::Value::Bool(b),
            SanitizedValue::Number(n) => serde_json::Value::Number(n),
            SanitizedValue::String(s) => serde_json::Value::String(s),
            SanitizedValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            SanitizedValue::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}
