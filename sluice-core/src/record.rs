//! Record type and projection helpers

use crate::{Result, SluiceError};
use serde_json::{Map, Value};

/// One decoded logical unit flowing through a pipeline.
///
/// Records are key/value mappings with string keys and scalar or
/// nested-mapping values. The underlying map keeps keys sorted, so
/// serializing a record always yields a canonical byte sequence.
pub type Record = Map<String, Value>;

/// Project a record onto an ordered list of field names.
///
/// Fields absent from the record are omitted from the result.
pub fn project(record: &Record, fields: &[String]) -> Record {
    fields
        .iter()
        .filter_map(|key| record.get(key).map(|value| (key.clone(), value.clone())))
        .collect()
}

/// Canonical serialization of a record (sorted keys, no whitespace).
///
/// Used for signing and for exact-match filter comparison.
pub fn canonical_json(record: &Record) -> Result<String> {
    serde_json::to_string(record).map_err(SluiceError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_project_keeps_declared_fields() {
        let rec = record(json!({"id": 1, "name": "alice", "email": "a@e.com"}));
        let projected = project(&rec, &["name".to_string(), "id".to_string()]);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected["name"], json!("alice"));
        assert_eq!(projected["id"], json!(1));
    }

    #[test]
    fn test_project_omits_unknown_fields() {
        let rec = record(json!({"id": 1}));
        let projected = project(&rec, &["id".to_string(), "missing".to_string()]);
        assert_eq!(projected.len(), 1);
        assert!(!projected.contains_key("missing"));
    }

    #[test]
    fn test_canonical_json_is_key_order_independent() {
        let a = record(json!({"b": 2, "a": 1}));
        let mut b = Record::new();
        b.insert("a".to_string(), json!(1));
        b.insert("b".to_string(), json!(2));
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }
}
