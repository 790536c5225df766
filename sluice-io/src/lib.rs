//! Sluice I/O - File pipelines and reference data
//!
//! This crate provides the file-facing layer of the workspace:
//!
//! - Incremental file conversion (JSON array in, JSON/CSV out, optionally
//!   compressed) driven through a stage pipeline
//! - Loading of the process-wide, read-only reference dataset

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;
pub mod dataset;

// Re-export commonly used types
pub use convert::{convert, convert_file, ConvertOptions, ConvertSummary};
pub use dataset::Dataset;
pub use sluice_core::{Record, RecordDecoder, Result, Schema, SluiceError};
pub use sluice_stage::{Algorithm, FormatStage, Pipeline, RecordFormat, DEFAULT_DELIMITER};
