//! csvnest-convert: Rebuild nested JSON from flattened CSV
//!
//! Usage:
//!   # Read from file, output to stdout
//!   csvnest-convert people.csv
//!
//!   # Read from stdin, pretty-print
//!   cat people.csv | csvnest-convert --pretty
//!
//!   # Fetch remote CSV with `-` separated columns, write JSON Lines to a file
//!   csvnest-convert --url https://example.com/people.csv --delimiter - --jsonl -o people.jsonl

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use csvnest::{read_records, Converter, CsvReader, FlatRecord, KeyConvention, OutputFormat, ReaderConfig, RecordWriter};
use std::fs::File;
use std::io::{stdin, stdout, BufWriter, Write};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "csvnest-convert")]
#[command(about = "Rebuild nested JSON from flattened CSV", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE", conflicts_with = "url")]
    input: Option<String>,

    /// Fetch the CSV from a URL instead of a file
    #[arg(long)]
    url: Option<String>,

    /// Delimiter between column name segments (default: ".")
    #[arg(long, short = 'd')]
    delimiter: Option<String>,

    /// Segment position of the array index (default: 1)
    #[arg(long)]
    index_pos: Option<usize>,

    /// Pretty-print the JSON array
    #[arg(long, conflicts_with = "jsonl")]
    pretty: bool,

    /// Write one JSON object per line instead of an array
    #[arg(long)]
    jsonl: bool,

    /// Output file (use stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// Total HTTP timeout in seconds for --url (default: 10)
    #[arg(long, requires = "url")]
    timeout: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Build config
    let mut convention = KeyConvention::default();
    if let Some(delimiter) = args.delimiter.clone() {
        convention.delimiter = delimiter;
    }
    if let Some(index_pos) = args.index_pos {
        convention.index_pos = index_pos;
    }

    let mut records = load_records(&args)?;
    info!(records = records.len(), "loaded CSV");

    let nested = Converter::new(convention)
        .to_maps(&mut records)
        .context("Failed to convert CSV")?;

    let format = if args.jsonl {
        OutputFormat::JsonLines
    } else if args.pretty {
        OutputFormat::Pretty
    } else {
        OutputFormat::Compact
    };

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {}", path))?,
        )),
        None => Box::new(BufWriter::new(stdout())),
    };

    let mut writer = RecordWriter::new(output, format);
    writer.write_records(&nested).context("Failed to write JSON")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}

/// Read records from the URL, file or stdin named by the arguments
fn load_records(args: &Args) -> Result<Vec<FlatRecord>> {
    if let Some(url) = &args.url {
        let mut config = ReaderConfig::default();
        if let Some(secs) = args.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        let reader = CsvReader::new(config).context("Failed to build HTTP client")?;
        return reader
            .from_url(url)
            .with_context(|| format!("Failed to fetch CSV from {}", url));
    }

    if let Some(path) = &args.input {
        let reader = CsvReader::new(ReaderConfig::default()).context("Failed to build CSV reader")?;
        return reader
            .from_path(path)
            .with_context(|| format!("Failed to read CSV file: {}", path));
    }

    read_records(stdin().lock()).context("Failed to read CSV from stdin")
}
