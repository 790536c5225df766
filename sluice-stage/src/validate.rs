//! Schema validation stage

use crate::stage::{Stage, Unit};
use sluice_core::{Result, Schema};

/// Validates each record against a fixed schema and passes it through
/// unchanged. Usable as the first or any intermediate record stage.
pub struct ValidateStage {
    schema: Schema,
}

impl ValidateStage {
    /// Create a validation stage owning its schema.
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

impl Stage for ValidateStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let record = unit.into_record()?;
        self.schema.validate_exact(&record)?;
        Ok(vec![Unit::Record(record)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_core::{Record, SluiceError};

    fn stage() -> ValidateStage {
        ValidateStage::new(Schema::object([
            ("name", Schema::Str),
            ("email", Schema::Str),
        ]))
    }

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_record_passes_through_unchanged() {
        let rec = record(json!({"name": "A", "email": "a@e.com"}));
        let out = stage().process(Unit::Record(rec.clone())).unwrap();
        assert_eq!(out, vec![Unit::Record(rec)]);
    }

    #[test]
    fn test_invalid_record_fails_the_stage() {
        let rec = record(json!({"name": "A", "email": "a@e.com", "extra": 1}));
        let err = stage().process(Unit::Record(rec)).unwrap_err();
        assert!(matches!(err, SluiceError::Validation(_)));
    }
}
