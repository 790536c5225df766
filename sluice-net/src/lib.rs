//! Sluice Net - Connection-scoped pipeline orchestration
//!
//! This crate provides the network surface of the workspace: a TCP server
//! that, for each inbound connection, reads one declarative request
//! envelope, validates it against a fixed schema, assembles a stage
//! pipeline from the validated options, and streams the filtered reference
//! records back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod request;
pub mod server;

// Re-export commonly used types
pub use request::{request_schema, PipelineRequest};
pub use server::{Orchestrator, ServerConfig, VALIDATION_ERROR_PREFIX};
pub use sluice_core::{Result, SluiceError};
pub use sluice_io::Dataset;
