//! Sluice CLI - Command-line tool for record-stream pipelines
//!
//! This binary provides command-line interfaces for:
//! - convert: JSON array → JSON/CSV, optionally compressed
//! - guard: encrypt sensitive fields and wrap records in envelopes
//! - reveal: unwrap envelopes and decrypt the guarded fields
//! - serve: run the TCP pipeline orchestrator over a reference dataset

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use sluice_core::RecordDecoder;
use sluice_io::{convert_file, ConvertOptions, Dataset};
use sluice_net::{Orchestrator, ServerConfig};
use sluice_stage::{
    Algorithm, Cipher, FormatStage, GuardStage, Pipeline, RecordFormat, RevealStage, Stage, Unit,
    DEFAULT_DELIMITER,
};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const CHUNK_SIZE: usize = 8192;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Streaming JSON record pipeline tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON array file to JSON/CSV, optionally compressed
    Convert {
        /// Input file (JSON array of records)
        input: PathBuf,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        /// Fields to keep, in output order (default: all, record order)
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
        /// CSV field delimiter
        #[arg(long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,
        /// Compress the output with this algorithm
        #[arg(long, value_enum)]
        archive: Option<ArchiveArg>,
        /// Show progress spinner while converting
        #[arg(long)]
        progress: bool,
    },
    /// Encrypt sensitive fields and wrap each record in an envelope
    Guard {
        /// Input file (JSON array of records)
        input: PathBuf,
        /// Output file (JSON array of envelopes)
        #[arg(short, long)]
        output: PathBuf,
        /// Fields to encrypt
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// Passphrase the cipher key is derived from
        #[arg(long)]
        passphrase: String,
        /// Key-derivation salt
        #[arg(long)]
        salt: String,
        /// Producer label recorded in the envelope metadata
        #[arg(long, default_value = "cli")]
        source: String,
    },
    /// Decrypt guarded envelopes back into plain records
    Reveal {
        /// Input file (JSON array of envelopes)
        input: PathBuf,
        /// Output file (JSON array of records)
        #[arg(short, long)]
        output: PathBuf,
        /// Fields to decrypt
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// Passphrase the cipher key is derived from
        #[arg(long)]
        passphrase: String,
        /// Key-derivation salt
        #[arg(long)]
        salt: String,
    },
    /// Serve filtered reference records over TCP
    Serve {
        /// Reference dataset file (JSON array of records)
        dataset: PathBuf,
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
        /// CSV field delimiter for csv-format responses
        #[arg(long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,
        /// Drop connections idle for this many seconds
        #[arg(long)]
        idle_timeout_secs: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for RecordFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => RecordFormat::Json,
            FormatArg::Csv => RecordFormat::Csv,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ArchiveArg {
    Gzip,
    Deflate,
}

impl From<ArchiveArg> for Algorithm {
    fn from(arg: ArchiveArg) -> Self {
        match arg {
            ArchiveArg::Gzip => Algorithm::Gzip,
            ArchiveArg::Deflate => Algorithm::Deflate,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            format,
            fields,
            delimiter,
            archive,
            progress,
        } => {
            handle_convert(input, output, format, fields, delimiter, archive, progress)?;
        }
        Commands::Guard {
            input,
            output,
            fields,
            passphrase,
            salt,
            source,
        } => {
            handle_guard(input, output, fields, passphrase, salt, source)?;
        }
        Commands::Reveal {
            input,
            output,
            fields,
            passphrase,
            salt,
        } => {
            handle_reveal(input, output, fields, passphrase, salt)?;
        }
        Commands::Serve {
            dataset,
            addr,
            delimiter,
            idle_timeout_secs,
        } => {
            handle_serve(dataset, addr, delimiter, idle_timeout_secs)?;
        }
    }

    Ok(())
}

fn handle_convert(
    input: PathBuf,
    output: PathBuf,
    format: FormatArg,
    fields: Option<Vec<String>>,
    delimiter: String,
    archive: Option<ArchiveArg>,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let opts = ConvertOptions {
        format: format.into(),
        fields,
        delimiter,
        archive: archive.map(Into::into),
    };

    let mut progress_bar = show_progress.then(|| create_spinner("Converting records"));
    let summary = convert_file(&input, &output, &opts)?;
    let elapsed = start.elapsed();
    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!(
            "Converted {} records in {:.2?}",
            summary.records, elapsed
        ));
    }

    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Converted to {} (records: {}, elapsed: {:.2?})",
        output.display(),
        summary.records,
        elapsed
    )?;
    Ok(())
}

fn handle_guard(
    input: PathBuf,
    output: PathBuf,
    fields: Vec<String>,
    passphrase: String,
    salt: String,
    source: String,
) -> Result<(), Box<dyn Error>> {
    let cipher = Cipher::derive(passphrase.as_bytes(), salt.as_bytes())?;
    let records = run_record_pipeline(
        &input,
        &output,
        vec![
            Box::new(GuardStage::new(cipher, fields, source)),
            Box::new(FormatStage::new(
                RecordFormat::Json,
                None,
                DEFAULT_DELIMITER.to_string(),
            )),
        ],
    )?;

    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Guarded {} records into {}",
        records,
        output.display()
    )?;
    Ok(())
}

fn handle_reveal(
    input: PathBuf,
    output: PathBuf,
    fields: Vec<String>,
    passphrase: String,
    salt: String,
) -> Result<(), Box<dyn Error>> {
    let cipher = Cipher::derive(passphrase.as_bytes(), salt.as_bytes())?;
    let records = run_record_pipeline(
        &input,
        &output,
        vec![
            Box::new(RevealStage::new(cipher, fields)),
            Box::new(FormatStage::new(
                RecordFormat::Json,
                None,
                DEFAULT_DELIMITER.to_string(),
            )),
        ],
    )?;

    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Revealed {} records into {}",
        records,
        output.display()
    )?;
    Ok(())
}

fn handle_serve(
    dataset: PathBuf,
    addr: String,
    delimiter: String,
    idle_timeout_secs: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let dataset = Arc::new(Dataset::from_path(&dataset)?);
    let config = ServerConfig {
        delimiter,
        idle_timeout: idle_timeout_secs.map(Duration::from_secs),
    };

    let listener = TcpListener::bind(&addr)?;
    Orchestrator::new(dataset, config).serve(listener)?;
    Ok(())
}

/// Stream a JSON-array file through the given stages into the output file.
fn run_record_pipeline(
    input: &Path,
    output: &Path,
    stages: Vec<Box<dyn Stage>>,
) -> Result<usize, Box<dyn Error>> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut pipeline = Pipeline::new(stages);
    let mut decoder = RecordDecoder::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut records = 0usize;

    loop {
        let read = reader.read(&mut chunk)?;
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
    Ok(records)
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
