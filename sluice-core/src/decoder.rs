//! Incremental decoder for JSON arrays split across arbitrary chunks

use crate::{Record, Result, SluiceError};
use bytes::{Buf, BytesMut};

/// Unconsumed byte remainder retained by a decoder between calls.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    bytes: BytesMut,
}

impl ChunkBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk to the carried remainder.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// View the carried bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Drop the first `count` carried bytes.
    pub fn consume(&mut self, count: usize) {
        self.bytes.advance(count);
    }

    /// Discard everything carried.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// True when nothing is carried.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Incremental decoder turning raw chunks into complete logical records.
///
/// The input is a single top-level JSON array of objects, split across
/// chunks with no alignment guarantees. Each [`feed`](Self::feed) yields the
/// records completed so far and carries the unparsed remainder, so decoding
/// is chunk-boundary-agnostic: any way of splitting a valid byte sequence
/// produces the same ordered record sequence.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    carry: ChunkBuffer,
}

impl RecordDecoder {
    /// Create a decoder with an empty carry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode all records completed by this chunk.
    ///
    /// A chunk completing zero records extends the carry and yields an
    /// empty batch; that is not an error. Malformed JSON after
    /// reconstruction is fatal and aborts the owning pipeline.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Record>> {
        self.carry.extend(chunk);
        let buf = self.carry.as_slice();

        let end = match last_object_end(buf) {
            Some(end) => end,
            None => return Ok(Vec::new()),
        };

        // Reconstruct a standalone array from everything up to and
        // including the last complete object close. A leading separator
        // left over from the previous batch is dropped.
        let mut head = trim_leading(&buf[..end]);
        if head.first() == Some(&b',') {
            head = trim_leading(&head[1..]);
        }
        let mut text = Vec::with_capacity(head.len() + 2);
        if head.first() != Some(&b'[') {
            text.push(b'[');
        }
        text.extend_from_slice(head);
        text.push(b']');

        let records: Vec<Record> = serde_json::from_slice(&text)
            .map_err(|err| SluiceError::Decode(err.to_string()))?;

        // The tail becomes the new carry; the element separator that
        // belonged to this batch is consumed with it.
        let mut cut = end;
        while cut < buf.len() && buf[cut].is_ascii_whitespace() {
            cut += 1;
        }
        if cut < buf.len() && buf[cut] == b',' {
            cut += 1;
        }
        self.carry.consume(cut);

        Ok(records)
    }

    /// Signal end of input.
    ///
    /// Fails with [`SluiceError::IncompleteRecord`] when the carry still
    /// holds part of an unterminated record. The array framing markers and
    /// surrounding whitespace are the only bytes allowed to remain.
    pub fn finish(&mut self) -> Result<()> {
        let clean = self
            .carry
            .as_slice()
            .iter()
            .all(|byte| matches!(byte, b'[' | b']') || byte.is_ascii_whitespace());
        if !clean {
            return Err(SluiceError::IncompleteRecord);
        }
        self.carry.clear();
        Ok(())
    }

    /// Number of bytes currently carried between calls.
    pub fn carry_len(&self) -> usize {
        self.carry.as_slice().len()
    }
}

/// Byte offset just past the close of the last complete top-level object.
///
/// Tracks brace depth, string state, and escapes, so braces inside string
/// values or nested structures never terminate a record early.
fn last_object_end(buf: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_end = None;

    for (idx, &byte) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    last_end = Some(idx + 1);
                }
            }
            _ => {}
        }
    }

    last_end
}

fn trim_leading(buf: &[u8]) -> &[u8] {
    let start = buf
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(buf.len());
    &buf[start..]
}
