//! Recursive schema descriptors and structural validation

use crate::{Record, Result, SluiceError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Recursive structural descriptor for a record.
///
/// A schema is either a scalar type tag or a mapping from field name to a
/// nested schema. Schemas are built once at pipeline-construction time and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    /// Non-empty string value
    Str,
    /// Numeric value
    Number,
    /// Boolean value
    Boolean,
    /// Nested mapping with per-field schemas
    Object(BTreeMap<String, Schema>),
}

impl Schema {
    /// Build an object schema from field/schema pairs.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(
            fields
                .into_iter()
                .map(|(key, schema)| (key.into(), schema))
                .collect(),
        )
    }

    /// Human-readable name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Str => "string",
            Schema::Number => "number",
            Schema::Boolean => "boolean",
            Schema::Object(_) => "object",
        }
    }

    /// Validate a record against this schema, requiring every declared
    /// field to be present (field counts must match exactly).
    pub fn validate_exact(&self, record: &Record) -> Result<()> {
        self.check(record, true)
    }

    /// Validate a record against this schema, allowing declared fields to
    /// be absent. Used for request envelopes where filter fields are
    /// optional by design.
    pub fn validate_subset(&self, record: &Record) -> Result<()> {
        self.check(record, false)
    }

    fn check(&self, record: &Record, exact: bool) -> Result<()> {
        let fields = match self {
            Schema::Object(fields) => fields,
            _ => {
                return Err(SluiceError::Internal(
                    "Top-level schema must be an object".to_string(),
                ))
            }
        };

        // Depth-first, fail-fast: the first violation in sorted field order
        // is the one reported.
        for (key, value) in record {
            let declared = fields.get(key).ok_or_else(|| {
                SluiceError::Validation(format!(
                    "Object contains disallowed field '{}'",
                    key
                ))
            })?;

            match (declared, value) {
                (Schema::Object(_), Value::Object(nested)) => {
                    declared.check(nested, exact)?;
                }
                (Schema::Str, Value::String(text)) => {
                    if text.is_empty() {
                        return Err(SluiceError::Validation(format!(
                            "Field '{}' cannot be empty",
                            key
                        )));
                    }
                }
                (Schema::Number, Value::Number(_)) => {}
                (Schema::Boolean, Value::Bool(_)) => {}
                _ => {
                    return Err(SluiceError::Validation(format!(
                        "Field '{}' should be of type {}",
                        key,
                        declared.type_name()
                    )));
                }
            }
        }

        if exact && record.len() != fields.len() {
            return Err(SluiceError::Validation(
                "Object does not contain all necessary fields".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer_schema() -> Schema {
        Schema::object([
            ("name", Schema::Str),
            ("email", Schema::Str),
            ("password", Schema::Str),
        ])
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_record_accepted() {
        let rec = record(json!({
            "name": "Pitter Black",
            "email": "pblack@email.com",
            "password": "pblack_123"
        }));
        assert!(customer_schema().validate_exact(&rec).is_ok());
    }

    #[test]
    fn test_disallowed_field_rejected() {
        let rec = record(json!({
            "name": "Pitter Black",
            "email": "pblack@email.com",
            "password": "pblack_123",
            "balance": 100
        }));
        let err = customer_schema().validate_exact(&rec).unwrap_err();
        assert!(err.to_string().contains("disallowed field 'balance'"));
    }

    #[test]
    fn test_missing_field_rejected() {
        let rec = record(json!({"name": "Pitter Black", "email": "pblack@email.com"}));
        let err = customer_schema().validate_exact(&rec).unwrap_err();
        assert!(err.to_string().contains("all necessary fields"));
    }

    #[test]
    fn test_missing_field_allowed_in_subset_mode() {
        let rec = record(json!({"name": "Pitter Black"}));
        assert!(customer_schema().validate_subset(&rec).is_ok());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let rec = record(json!({
            "name": "Pitter Black",
            "email": 42,
            "password": "pblack_123"
        }));
        let err = customer_schema().validate_exact(&rec).unwrap_err();
        assert!(err.to_string().contains("'email' should be of type string"));
    }

    #[test]
    fn test_empty_string_rejected() {
        let rec = record(json!({
            "name": "",
            "email": "pblack@email.com",
            "password": "pblack_123"
        }));
        let err = customer_schema().validate_exact(&rec).unwrap_err();
        assert!(err.to_string().contains("'name' cannot be empty"));
    }

    #[test]
    fn test_nested_schema_recursion() {
        let schema = Schema::object([
            (
                "name",
                Schema::object([("first", Schema::Str), ("last", Schema::Str)]),
            ),
            ("phone", Schema::Str),
        ]);
        let good = record(json!({
            "name": {"first": "Pitter", "last": "Black"},
            "phone": "600-732-5190"
        }));
        assert!(schema.validate_exact(&good).is_ok());

        let bad = record(json!({
            "name": {"first": "Pitter", "middle": "X", "last": "Black"},
            "phone": "600-732-5190"
        }));
        let err = schema.validate_exact(&bad).unwrap_err();
        assert!(err.to_string().contains("disallowed field 'middle'"));
    }

    #[test]
    fn test_nested_wrong_shape_rejected() {
        let schema = Schema::object([(
            "name",
            Schema::object([("first", Schema::Str), ("last", Schema::Str)]),
        )]);
        let rec = record(json!({"name": "flat string"}));
        let err = schema.validate_exact(&rec).unwrap_err();
        assert!(err.to_string().contains("'name' should be of type object"));
    }
}
