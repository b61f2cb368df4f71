use crate::error::Result;
use crate::types::NestedRecord;
use std::io::Write;

/// Layout of the JSON written by `RecordWriter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Single-line JSON array
    #[default]
    Compact,
    /// Indented JSON array
    Pretty,
    /// One JSON object per line
    JsonLines,
}

/// Writes nested records as JSON to any output
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        RecordWriter { writer, format }
    }

    pub fn write_records(&mut self, records: &[NestedRecord]) -> Result<()> {
        match self.format {
            OutputFormat::Compact => {
                serde_json::to_writer(&mut self.writer, records)?;
                writeln!(self.writer)?;
            }
            OutputFormat::Pretty => {
                serde_json::to_writer_pretty(&mut self.writer, records)?;
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                for record in records {
                    serde_json::to_writer(&mut self.writer, record)?;
                    writeln!(self.writer)?;
                }
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize records into a compact JSON array string
pub fn to_json_string(records: &[NestedRecord]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}
