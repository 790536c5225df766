//! Incremental file conversion through a stage pipeline

use sluice_core::{RecordDecoder, Result};
use sluice_stage::{
    Algorithm, ArchiveStage, Direction, FormatStage, Pipeline, RecordFormat, Stage, Unit,
    DEFAULT_DELIMITER,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Options shaping a file conversion run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Output format
    pub format: RecordFormat,
    /// Ordered field projection; `None` keeps every field
    pub fields: Option<Vec<String>>,
    /// CSV field delimiter
    pub delimiter: String,
    /// Compress the output with this algorithm
    pub archive: Option<Algorithm>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: RecordFormat::Csv,
            fields: None,
            delimiter: DEFAULT_DELIMITER.to_string(),
            archive: None,
        }
    }
}

/// Outcome of a conversion run.
#[derive(Debug, Clone, Copy)]
pub struct ConvertSummary {
    /// Number of records pushed through the pipeline
    pub records: usize,
}

/// Stream a JSON-array input through `[FormatStage, ArchiveStage?]` into
/// the output.
///
/// Input is read in fixed-size chunks with no alignment assumptions; each
/// decoded record is fully flushed to the sink before the next chunk is
/// read, so memory use stays bounded by the chunk and record sizes.
pub fn convert<R: Read, W: Write>(
    mut input: R,
    output: W,
    opts: &ConvertOptions,
) -> Result<ConvertSummary> {
    let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(FormatStage::new(
        opts.format,
        opts.fields.clone(),
        opts.delimiter.clone(),
    ))];
    if let Some(algorithm) = opts.archive {
        stages.push(Box::new(ArchiveStage::new(Direction::Pack, algorithm)));
    }
    let mut pipeline = Pipeline::new(stages);

    let mut decoder = RecordDecoder::new();
    let mut writer = BufWriter::new(output);
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut records = 0usize;

    loop {
        let read = input.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        for record in decoder.feed(&chunk[..read])? {
            records += 1;
            for unit in pipeline.push(Unit::Record(record))? {
                writer.write_all(&unit.into_bytes()?)?;
            }
        }
    }

    decoder.finish()?;
    for unit in pipeline.close()? {
        writer.write_all(&unit.into_bytes()?)?;
    }
    writer.flush()?;

    tracing::debug!(records, "file conversion finished");
    Ok(ConvertSummary { records })
}

/// Convert one file into another.
pub fn convert_file(
    input: &Path,
    output: &Path,
    opts: &ConvertOptions,
) -> Result<ConvertSummary> {
    let reader = BufReader::new(File::open(input)?);
    let writer = File::create(output)?;
    convert(reader, writer, opts)
}
