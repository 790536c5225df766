//! Per-connection pipeline orchestration over TCP

use crate::request::PipelineRequest;
use sluice_core::{Result, SluiceError};
use sluice_io::Dataset;
use sluice_stage::{
    Algorithm, ArchiveStage, Direction, FormatStage, Pipeline, Stage, Unit,
    DEFAULT_DELIMITER,
};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Fixed prefix identifying a textual validation-error response.
pub const VALIDATION_ERROR_PREFIX: &str = "Invalid request: ";

const READ_CHUNK: usize = 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// CSV field delimiter for `csv`-format responses
    pub delimiter: String,
    /// Per-connection idle timeout (hardening extension; off by default)
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            idle_timeout: None,
        }
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    AwaitingRequest,
    Validating,
    Streaming,
    Closed,
}

/// Assembles one pipeline per inbound connection from declarative,
/// validated request metadata, and streams the result back.
///
/// Each connection runs on its own thread; the only shared state is the
/// read-only reference dataset behind an `Arc`.
#[derive(Clone)]
pub struct Orchestrator {
    dataset: Arc<Dataset>,
    config: ServerConfig,
}

impl Orchestrator {
    /// Create an orchestrator over the shared reference dataset.
    pub fn new(dataset: Arc<Dataset>, config: ServerConfig) -> Self {
        Self { dataset, config }
    }

    /// Accept connections forever, one handler thread per connection.
    ///
    /// A failed connection never takes the server down: validation errors
    /// are reported to the peer, everything else is logged and isolated to
    /// the owning connection.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, records = self.dataset.len(), "server listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let orchestrator = self.clone();
                    thread::spawn(move || orchestrator.run_connection(stream));
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept connection"),
            }
        }
        Ok(())
    }

    fn run_connection(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        match self.handle_connection(stream) {
            Ok(()) => tracing::debug!(%peer, "connection finished"),
            Err(SluiceError::Cancelled) => {
                tracing::debug!(%peer, "peer went away mid-stream")
            }
            Err(err) => tracing::warn!(%peer, error = %err, "connection failed"),
        }
    }

    /// Drive one connection through the request/response state machine.
    fn handle_connection(&self, mut stream: TcpStream) -> Result<()> {
        let mut state = ConnState::AwaitingRequest;
        tracing::debug!(?state, "connection opened");

        if let Some(timeout) = self.config.idle_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }

        // Single-shot: exactly one request envelope per connection.
        let envelope = match self.read_envelope(&mut stream) {
            Ok(envelope) => envelope,
            Err(SluiceError::Validation(message)) => {
                return self.reject(&mut stream, &message);
            }
            Err(err) => return Err(err),
        };

        state = ConnState::Validating;
        tracing::debug!(?state, "request envelope received");

        let request = match PipelineRequest::parse(&envelope) {
            Ok(request) => request,
            Err(SluiceError::Validation(message)) => {
                return self.reject(&mut stream, &message);
            }
            Err(err) => return Err(err),
        };

        state = ConnState::Streaming;
        tracing::debug!(?state, format = ?request.format, archive = request.archive, "request validated");

        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(FormatStage::new(
            request.format,
            None,
            self.config.delimiter.clone(),
        ))];
        if request.archive {
            stages.push(Box::new(ArchiveStage::new(Direction::Pack, Algorithm::Gzip)));
        }
        let mut pipeline = Pipeline::new(stages);

        for record in self.dataset.matching(&request.filter) {
            for unit in pipeline.push(Unit::Record(record.clone()))? {
                write_or_cancel(&mut stream, &unit.into_bytes()?)?;
            }
        }
        for unit in pipeline.close()? {
            write_or_cancel(&mut stream, &unit.into_bytes()?)?;
        }
        stream.flush()?;
        let _ = stream.shutdown(Shutdown::Both);

        state = ConnState::Closed;
        tracing::debug!(?state, "response streamed");
        Ok(())
    }

    /// Read bytes until one complete JSON object parses.
    ///
    /// Never blocks on more input than the envelope needs: parsing is
    /// retried after every chunk and stops at the first complete value.
    fn read_envelope(&self, stream: &mut TcpStream) -> Result<sluice_core::Record> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let read = stream.read(&mut chunk).map_err(cancel_kind)?;
            if read == 0 {
                // Peer closed without sending a complete envelope.
                if buffer.is_empty() {
                    return Err(SluiceError::Cancelled);
                }
                return Err(SluiceError::Validation(
                    "request is not a complete JSON object".to_string(),
                ));
            }
            buffer.extend_from_slice(&chunk[..read]);

            match serde_json::from_slice::<sluice_core::Record>(&buffer) {
                Ok(envelope) => return Ok(envelope),
                Err(err) if err.is_eof() => continue,
                Err(err) => {
                    return Err(SluiceError::Validation(format!(
                        "request is not valid JSON: {}",
                        err
                    )))
                }
            }
        }
    }

    /// Report a validation failure to the peer and close cleanly.
    fn reject(&self, stream: &mut TcpStream, message: &str) -> Result<()> {
        tracing::debug!(message, "rejecting request");
        write_or_cancel(stream, VALIDATION_ERROR_PREFIX.as_bytes())?;
        write_or_cancel(stream, message.as_bytes())?;
        stream.flush()?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}

fn write_or_cancel(stream: &mut TcpStream, bytes: &[u8]) -> Result<()> {
    stream.write_all(bytes).map_err(cancel_kind)
}

fn cancel_kind(err: std::io::Error) -> SluiceError {
    match err.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::UnexpectedEof => SluiceError::Cancelled,
        _ => SluiceError::Io(err),
    }
}
