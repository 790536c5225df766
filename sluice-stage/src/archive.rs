//! Streaming compression stage

use crate::stage::{Stage, Unit};
use flate2::write::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use sluice_core::{Result, SluiceError};
use std::io::Write;
use std::mem;

/// Whether the stage compresses or decompresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Compress the byte stream
    Pack,
    /// Decompress the byte stream
    Unpack,
}

impl Direction {
    /// Parse a declared mode name; unknown names fail at construction.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "pack" => Ok(Direction::Pack),
            "unpack" => Ok(Direction::Unpack),
            other => Err(SluiceError::Construction(format!(
                "unknown archive mode '{}'",
                other
            ))),
        }
    }
}

/// Compression algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Gzip framing
    Gzip,
    /// Zlib framing (the deflate family's wrapped form)
    Deflate,
}

impl Algorithm {
    /// Parse a declared algorithm name; unknown names fail at construction.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "gzip" => Ok(Algorithm::Gzip),
            "deflate" => Ok(Algorithm::Deflate),
            other => Err(SluiceError::Construction(format!(
                "unknown archive algorithm '{}'",
                other
            ))),
        }
    }
}

enum Codec {
    GzipPack(GzEncoder<Vec<u8>>),
    GzipUnpack(GzDecoder<Vec<u8>>),
    DeflatePack(ZlibEncoder<Vec<u8>>),
    DeflateUnpack(ZlibDecoder<Vec<u8>>),
}

impl Codec {
    fn new(direction: Direction, algorithm: Algorithm) -> Self {
        let buf = Vec::new();
        match (direction, algorithm) {
            (Direction::Pack, Algorithm::Gzip) => {
                Codec::GzipPack(GzEncoder::new(buf, Compression::default()))
            }
            (Direction::Unpack, Algorithm::Gzip) => Codec::GzipUnpack(GzDecoder::new(buf)),
            (Direction::Pack, Algorithm::Deflate) => {
                Codec::DeflatePack(ZlibEncoder::new(buf, Compression::default()))
            }
            (Direction::Unpack, Algorithm::Deflate) => {
                Codec::DeflateUnpack(ZlibDecoder::new(buf))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Codec::GzipPack(codec) => codec.write_all(data),
            Codec::GzipUnpack(codec) => codec.write_all(data),
            Codec::DeflatePack(codec) => codec.write_all(data),
            Codec::DeflateUnpack(codec) => codec.write_all(data),
        }
    }

    /// Take whatever output the codec has produced so far.
    fn drain(&mut self) -> Vec<u8> {
        match self {
            Codec::GzipPack(codec) => mem::take(codec.get_mut()),
            Codec::GzipUnpack(codec) => mem::take(codec.get_mut()),
            Codec::DeflatePack(codec) => mem::take(codec.get_mut()),
            Codec::DeflateUnpack(codec) => mem::take(codec.get_mut()),
        }
    }

    fn finish(self) -> std::io::Result<Vec<u8>> {
        match self {
            Codec::GzipPack(codec) => codec.finish(),
            Codec::GzipUnpack(codec) => codec.finish(),
            Codec::DeflatePack(codec) => codec.finish(),
            Codec::DeflateUnpack(codec) => codec.finish(),
        }
    }
}

/// Wraps the byte end of a pipeline in a streaming compressor or
/// decompressor.
///
/// Each `process` call forwards whatever the underlying codec has produced
/// so far; `close` finishes the codec and flushes the tail. Invalid
/// mode/algorithm combinations fail when the stage is built, before any
/// data flows.
pub struct ArchiveStage {
    codec: Option<Codec>,
}

impl ArchiveStage {
    /// Create an archive stage for the given direction and algorithm.
    pub fn new(direction: Direction, algorithm: Algorithm) -> Self {
        Self {
            codec: Some(Codec::new(direction, algorithm)),
        }
    }

    /// Build from untrusted option strings, validating both before
    /// construction.
    pub fn from_options(mode: &str, algorithm: &str) -> Result<Self> {
        Ok(Self::new(Direction::parse(mode)?, Algorithm::parse(algorithm)?))
    }

    fn codec_mut(&mut self) -> Result<&mut Codec> {
        self.codec
            .as_mut()
            .ok_or_else(|| SluiceError::Internal("archive stage already closed".to_string()))
    }
}

impl Stage for ArchiveStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let bytes = unit.into_bytes()?;
        let codec = self.codec_mut()?;
        codec.write(&bytes)?;
        let ready = codec.drain();
        if ready.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![Unit::Bytes(ready)])
        }
    }

    fn close(&mut self) -> Result<Vec<Unit>> {
        let codec = self
            .codec
            .take()
            .ok_or_else(|| SluiceError::Internal("archive stage already closed".to_string()))?;
        let tail = codec.finish()?;
        if tail.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![Unit::Bytes(tail)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump(stage: &mut ArchiveStage, input: &[u8], chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for piece in input.chunks(chunk.max(1)) {
            for unit in stage.process(Unit::Bytes(piece.to_vec())).unwrap() {
                out.extend(unit.into_bytes().unwrap());
            }
        }
        for unit in stage.close().unwrap() {
            out.extend(unit.into_bytes().unwrap());
        }
        out
    }

    #[test]
    fn test_gzip_pack_unpack_round_trip() {
        let input = b"line one\nline two\nline two\nline two\n".repeat(40);

        let mut pack = ArchiveStage::new(Direction::Pack, Algorithm::Gzip);
        let packed = pump(&mut pack, &input, 7);
        assert!(packed.len() < input.len());

        let mut unpack = ArchiveStage::new(Direction::Unpack, Algorithm::Gzip);
        let unpacked = pump(&mut unpack, &packed, 5);
        assert_eq!(unpacked, input);
    }

    #[test]
    fn test_deflate_pack_unpack_round_trip() {
        let input = b"payload;payload;payload\n".repeat(25);

        let mut pack = ArchiveStage::new(Direction::Pack, Algorithm::Deflate);
        let packed = pump(&mut pack, &input, 11);

        let mut unpack = ArchiveStage::new(Direction::Unpack, Algorithm::Deflate);
        let unpacked = pump(&mut unpack, &packed, 3);
        assert_eq!(unpacked, input);
    }

    #[test]
    fn test_invalid_options_fail_at_construction() {
        assert!(matches!(
            ArchiveStage::from_options("pack", "lzma").err(),
            Some(SluiceError::Construction(_))
        ));
        assert!(matches!(
            ArchiveStage::from_options("sideways", "gzip").err(),
            Some(SluiceError::Construction(_))
        ));
        assert!(ArchiveStage::from_options("unpack", "deflate").is_ok());
    }

    #[test]
    fn test_record_input_is_a_wiring_error() {
        let mut stage = ArchiveStage::new(Direction::Pack, Algorithm::Gzip);
        let err = stage
            .process(Unit::Record(sluice_core::Record::new()))
            .unwrap_err();
        assert!(matches!(err, SluiceError::Internal(_)));
    }
}
