//! Request envelope parsing and validation

use serde_json::Value;
use sluice_core::{Record, Result, Schema, SluiceError};
use sluice_stage::RecordFormat;

/// The fixed schema every request envelope is validated against.
///
/// Filter fields are optional (subset validation), so a request may name
/// any subset of the reference record's fields, but nothing outside it.
pub fn request_schema() -> Schema {
    Schema::object([
        (
            "filter",
            Schema::object([
                (
                    "name",
                    Schema::object([("first", Schema::Str), ("last", Schema::Str)]),
                ),
                ("phone", Schema::Str),
                (
                    "address",
                    Schema::object([
                        ("zip", Schema::Str),
                        ("city", Schema::Str),
                        ("country", Schema::Str),
                        ("street", Schema::Str),
                    ]),
                ),
                ("email", Schema::Str),
            ]),
        ),
        (
            "meta",
            Schema::object([("format", Schema::Str), ("archive", Schema::Boolean)]),
        ),
    ])
}

/// A validated request: everything the orchestrator needs to build the
/// response pipeline.
///
/// Construction is the only way to obtain one, so stage selection can
/// never be driven by unvalidated client input.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Exact-match filter over the reference records
    pub filter: Record,
    /// Response format
    pub format: RecordFormat,
    /// Compress the response
    pub archive: bool,
}

impl PipelineRequest {
    /// Validate an untrusted envelope against the fixed schema and extract
    /// the pipeline options.
    pub fn parse(envelope: &Record) -> Result<Self> {
        request_schema().validate_subset(envelope)?;

        let filter = envelope
            .get("filter")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let meta = envelope
            .get("meta")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let format_name = meta.get("format").and_then(Value::as_str).ok_or_else(|| {
            SluiceError::Validation("Request meta must declare a format".to_string())
        })?;
        let format = RecordFormat::parse(format_name).map_err(|_| {
            SluiceError::Validation(format!(
                "Field 'format' should be one of json, csv (got '{}')",
                format_name
            ))
        })?;

        let archive = meta
            .get("archive")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            filter,
            format,
            archive,
        })
    }
}
