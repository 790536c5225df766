//! The polymorphic stage unit

use sluice_core::{Record, Result, SluiceError};

/// One unit flowing between stages: a logical record or raw bytes.
///
/// Record-shaped stages (validation, crypto) consume and produce records;
/// the format stage converts records to bytes; byte-shaped stages
/// (archiving) consume and produce bytes. Feeding a stage the wrong unit
/// kind is an internal wiring error, caught at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    /// A decoded logical record
    Record(Record),
    /// Raw output bytes
    Bytes(Vec<u8>),
}

impl Unit {
    /// Unwrap a record unit.
    pub fn into_record(self) -> Result<Record> {
        match self {
            Unit::Record(record) => Ok(record),
            Unit::Bytes(_) => Err(SluiceError::Internal(
                "stage expected a record unit, got bytes".to_string(),
            )),
        }
    }

    /// Unwrap a byte unit.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Unit::Bytes(bytes) => Ok(bytes),
            Unit::Record(_) => Err(SluiceError::Internal(
                "stage expected a byte unit, got a record".to_string(),
            )),
        }
    }
}

/// One transformation step in a pipeline.
///
/// A stage consumes zero-or-more input units and produces zero-or-more
/// output units per call; it may fail, which aborts the owning pipeline.
pub trait Stage {
    /// Transform one input unit into zero-or-more output units.
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>>;

    /// Flush any trailing output when the input stream ends.
    fn close(&mut self) -> Result<Vec<Unit>> {
        Ok(Vec::new())
    }
}
