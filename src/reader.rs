//! CSV input
//!
//! Reads CSV from a file, any `Read` source or an HTTP(S) URL into
//! `FlatRecord`s. The first row is the header; every value is trimmed.

use crate::error::{Error, Result};
use crate::types::FlatRecord;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Settings for fetching remote CSV
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// End-to-end request timeout
    pub timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Use this client instead of building one from the timeouts
    pub client: Option<Client>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            client: None,
        }
    }
}

/// Reads CSV into flat records
pub struct CsvReader {
    client: Client,
}

impl CsvReader {
    pub fn new(config: ReaderConfig) -> Result<Self> {
        let client = match config.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(config.timeout)
                .connect_timeout(config.connect_timeout)
                .build()?,
        };
        Ok(CsvReader { client })
    }

    /// Read CSV from a local file
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<FlatRecord>> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading CSV file");
        let file = File::open(path)?;
        read_records(BufReader::new(file))
    }

    /// Read CSV from any source, such as stdin or an in-memory buffer
    pub fn from_reader<R: Read>(&self, reader: R) -> Result<Vec<FlatRecord>> {
        read_records(reader)
    }

    /// Fetch CSV from a URL; anything but `200 OK` is an error
    pub fn from_url(&self, url: &str) -> Result<Vec<FlatRecord>> {
        debug!(url, "fetching CSV");
        let response = self.client.get(url).send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        read_records(response)
    }
}

/// Read CSV from any source; an empty source yields no records
pub fn read_records<R: Read>(reader: R) -> Result<Vec<FlatRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        let record: FlatRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        records.push(record);
    }

    debug!(records = records.len(), columns = headers.len(), "read CSV");
    Ok(records)
}
