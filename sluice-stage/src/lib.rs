//! Sluice Stage - Pipeline composition and transform stages
//!
//! This crate provides the polymorphic stage unit and the stage
//! implementations a pipeline is assembled from:
//!
//! - The `Stage` trait and `Unit` flowing between stages
//! - Ordered `Pipeline` composition with end-to-end FIFO ordering
//! - Schema validation stage
//! - Symmetric cipher stages (guard/reveal) and signature stages
//! - JSON/CSV format conversion with field projection
//! - Streaming gzip/deflate archiving

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod convert;
pub mod guard;
pub mod pipeline;
pub mod sign;
pub mod stage;
pub mod validate;

// Re-export commonly used types
pub use archive::{Algorithm, ArchiveStage, Direction};
pub use convert::{FormatStage, RecordFormat, DEFAULT_DELIMITER};
pub use guard::{Cipher, GuardStage, RevealStage};
pub use pipeline::Pipeline;
pub use sign::{generate_signing_key, SignStage, Signer, VerifyStage};
pub use sluice_core::{Record, Result, Schema, SluiceError};
pub use stage::{Stage, Unit};
pub use validate::ValidateStage;
