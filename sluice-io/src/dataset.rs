//! Process-wide read-only reference dataset

use sluice_core::{matches, Record, RecordDecoder, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// The reference record set shared by every connection.
///
/// Constructed once at startup and shared immutably (wrap in `Arc`); there
/// is no mutation path, so no locking is needed.
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Load a JSON-array dataset through the incremental decoder.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut decoder = RecordDecoder::new();
        let mut records = Vec::new();
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            records.extend(decoder.feed(&chunk[..read])?);
        }
        decoder.finish()?;

        Ok(Self { records })
    }

    /// Load a dataset file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let dataset = Self::from_reader(BufReader::new(File::open(path)?))?;
        tracing::info!(
            records = dataset.len(),
            path = %path.display(),
            "reference dataset loaded"
        );
        Ok(dataset)
    }

    /// Number of reference records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All reference records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records whose filter-keyed subset matches the filter exactly.
    pub fn matching<'a>(&'a self, filter: &Record) -> Vec<&'a Record> {
        self.records
            .iter()
            .filter(|entry| matches(entry, filter))
            .collect()
    }
}
