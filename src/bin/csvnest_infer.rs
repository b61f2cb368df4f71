//! csvnest-infer: Show the nested structure implied by CSV column names
//!
//! Prints `{"group": ["sub_field", ...]}` for the first data row, with `[]`
//! for plain columns.
//!
//! Usage:
//!   # Read from file, output to stdout
//!   csvnest-infer people.csv
//!
//!   # Read from stdin with compact output
//!   cat people.csv | csvnest-infer --compact

use anyhow::{Context, Result};
use clap::Parser;
use csvnest::{read_records, Converter, KeyConvention};
use std::fs::File;
use std::io::{stdin, BufReader, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "csvnest-infer")]
#[command(about = "Infer nested structure from flattened CSV headers", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Delimiter between column name segments (default: ".")
    #[arg(long, short = 'd')]
    delimiter: Option<String>,

    /// Segment position of the array index (default: 1)
    #[arg(long)]
    index_pos: Option<usize>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Create reader based on input source
    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?,
        ))
    } else {
        Box::new(stdin())
    };

    let records = read_records(reader).context("Failed to read CSV")?;

    let mut convention = KeyConvention::default();
    if let Some(delimiter) = args.delimiter {
        convention.delimiter = delimiter;
    }
    if let Some(index_pos) = args.index_pos {
        convention.index_pos = index_pos;
    }

    let structure = Converter::new(convention)
        .infer_structure(&records)
        .context("CSV has a header but no data rows")?;

    let output = if args.compact {
        serde_json::to_string(&structure)?
    } else {
        serde_json::to_string_pretty(&structure)?
    };

    println!("{}", output);

    Ok(())
}
