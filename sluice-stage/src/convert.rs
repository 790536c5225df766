//! Record-to-bytes format conversion

use crate::stage::{Stage, Unit};
use sluice_core::{project, Result, SluiceError};

/// Default CSV field delimiter.
pub const DEFAULT_DELIMITER: &str = ";";

/// Output format for converted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// One well-formed JSON array across the whole run
    Json,
    /// One delimiter-joined row per record, newline-terminated
    Csv,
}

impl RecordFormat {
    /// Parse a declared format name.
    ///
    /// Unknown names are a construction-time error; stage selection never
    /// dispatches on unvalidated strings.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(RecordFormat::Json),
            "csv" => Ok(RecordFormat::Csv),
            other => Err(SluiceError::Construction(format!(
                "unknown record format '{}'",
                other
            ))),
        }
    }
}

/// Projects each record onto a caller-declared ordered field list and
/// serializes it as JSON or as a delimited row.
///
/// Requested fields absent from a record are silently omitted. With no
/// field list, every field of the record is emitted.
pub struct FormatStage {
    format: RecordFormat,
    fields: Option<Vec<String>>,
    delimiter: String,
    wrote_any: bool,
}

impl FormatStage {
    /// Create a format stage.
    pub fn new(
        format: RecordFormat,
        fields: Option<Vec<String>>,
        delimiter: impl Into<String>,
    ) -> Self {
        Self {
            format,
            fields,
            delimiter: delimiter.into(),
            wrote_any: false,
        }
    }
}

impl Stage for FormatStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let record = unit.into_record()?;

        let bytes = match self.format {
            RecordFormat::Json => {
                let projected = match &self.fields {
                    Some(fields) => project(&record, fields),
                    None => record,
                };
                let mut bytes = Vec::new();
                bytes.push(if self.wrote_any { b',' } else { b'[' });
                serde_json::to_writer(&mut bytes, &projected)?;
                self.wrote_any = true;
                bytes
            }
            RecordFormat::Csv => {
                // Cells keep the caller-declared field order, serialized as
                // JSON scalar text.
                let cells: Vec<String> = match &self.fields {
                    Some(fields) => fields
                        .iter()
                        .filter_map(|key| record.get(key))
                        .map(serde_json::to_string)
                        .collect::<std::result::Result<_, _>>()?,
                    None => record
                        .values()
                        .map(serde_json::to_string)
                        .collect::<std::result::Result<_, _>>()?,
                };
                let mut row = cells.join(&self.delimiter);
                row.push('\n');
                self.wrote_any = true;
                row.into_bytes()
            }
        };

        Ok(vec![Unit::Bytes(bytes)])
    }

    fn close(&mut self) -> Result<Vec<Unit>> {
        match self.format {
            RecordFormat::Json => {
                let tail = if self.wrote_any { b"]".to_vec() } else { b"[]".to_vec() };
                Ok(vec![Unit::Bytes(tail)])
            }
            RecordFormat::Csv => Ok(Vec::new()),
        }
    }
}
