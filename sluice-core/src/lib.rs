//! Sluice Core - Primitives for streaming record pipelines
//!
//! This crate provides the no-I/O building blocks shared by the rest of the
//! workspace:
//!
//! - Error types
//! - The `Record` type and projection helpers
//! - Recursive schema descriptors and structural validation
//! - The incremental chunk decoder (JSON array split across arbitrary chunks)
//! - Exact-match record filtering

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod decoder;
pub mod error;
pub mod filter;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use decoder::{ChunkBuffer, RecordDecoder};
pub use error::{Result, SluiceError};
pub use filter::matches;
pub use record::{canonical_json, project, Record};
pub use schema::Schema;
