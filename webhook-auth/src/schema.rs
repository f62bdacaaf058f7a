//! Per-provider structural schemas applied to sanitized payloads.

use std::collections::HashMap;
use std::fmt;

use crate::providers::canonical_name;
use crate::sanitize::SanitizedValue;

/// JSON type a schema field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    fn matches(&self, value: &SanitizedValue) -> bool {
        matches!(
            (self, value),
            (FieldType::String, SanitizedValue::String(_))
                | (FieldType::Number, SanitizedValue::Number(_))
                | (FieldType::Boolean, SanitizedValue::Bool(_))
                | (FieldType::Object, SanitizedValue::Object(_))
                | (FieldType::Array, SanitizedValue::Array(_))
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        };
        f.write_str(name)
    }
}

/// One field of a provider schema, addressed by a dot separated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub path: String,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldRule {
    pub fn required(path: &str, field_type: FieldType) -> Self {
        Self {
            path: path.to_string(),
            field_type,
            required: true,
        }
    }

    pub fn optional(path: &str, field_type: FieldType) -> Self {
        Self {
            path: path.to_string(),
            field_type,
            required: false,
        }
    }
}

/// Outcome of a schema check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    pub valid: bool,
    /// `field.path: message` entries.
    pub errors: Vec<String>,
}

/// Holds one schema per provider; providers without a schema always pass.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schemas: HashMap<String, Vec<FieldRule>>,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        let mut schemas = HashMap::new();
        schemas.insert(
            "stripe".to_string(),
            vec![
                FieldRule::required("id", FieldType::String),
                FieldRule::required("object", FieldType::String),
                FieldRule::required("type", FieldType::String),
                FieldRule::required("data", FieldType::Object),
                FieldRule::required("data.object", FieldType::Object),
                FieldRule::required("created", FieldType::Number),
            ],
        );
        schemas.insert(
            "clerk".to_string(),
            vec![
                FieldRule::required("type", FieldType::String),
                FieldRule::required("data", FieldType::Object),
                FieldRule::required("object", FieldType::String),
            ],
        );
        schemas.insert(
            "github".to_string(),
            vec![
                FieldRule::optional("action", FieldType::String),
                FieldRule::optional("sender", FieldType::Object),
                FieldRule::optional("repository", FieldType::Object),
            ],
        );
        schemas.insert(
            "paypal".to_string(),
            vec![
                FieldRule::required("id", FieldType::String),
                FieldRule::required("event_type", FieldType::String),
                FieldRule::required("resource", FieldType::Object),
                FieldRule::optional("create_time", FieldType::String),
            ],
        );

        Self { schemas }
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the schema for `provider`.
    pub fn with_schema(mut self, provider: &str, rules: Vec<FieldRule>) -> Self {
        self.schemas.insert(canonical_name(provider), rules);
        self
    }

    /// Check `payload` against the schema registered for `provider`.
    pub fn validate_schema(&self, payload: &SanitizedValue, provider: &str) -> SchemaReport {
        let Some(rules) = self.schemas.get(&canonical_name(provider)) else {
            return SchemaReport {
                valid: true,
                errors: Vec::new(),
            };
        };

        if payload.as_object().is_none() {
            return SchemaReport {
                valid: false,
                errors: vec![format!("(root): expected object, found {}", payload.type_name())],
            };
        }

        let errors: Vec<String> = rules
            .iter()
            .filter_map(|rule| match payload.get_path(&rule.path) {
                None if rule.required => Some(format!("{}: required field missing", rule.path)),
                None => None,
                Some(value) if !rule.field_type.matches(value) => Some(format!(
                    "{}: expected {}, found {}",
                    rule.path,
                    rule.field_type,
                    value.type_name()
                )),
                Some(_) => None,
            })
            .collect();

        SchemaReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}
