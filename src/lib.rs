//! # csvnest - Nested data from flat CSV
//!
//! Rebuilds arrays of objects that were flattened into delimited CSV column
//! names such as `company.0.name`, `company.1.name`.
//!
//! ## Modules
//!
//! - **nest**: Structure inference and record reassembly
//! - **decode**: Map nested records onto typed `serde` targets
//! - **reader**: Read CSV from files, readers and URLs
//! - **template**: JSON column templates
//!
//! ## Quick Start
//!
//! ```rust
//! use csvnest::{read_records, Converter};
//!
//! # fn main() -> csvnest::Result<()> {
//! let csv = "name,company.0.name,company.0.city,company.1.name,company.1.city\n\
//!            Alice,Acme,Berlin,Globex,Paris\n";
//!
//! let mut records = read_records(csv.as_bytes())?;
//! let json = Converter::default().to_json(&mut records)?;
//!
//! assert_eq!(
//!     json,
//!     r#"[{"name":"Alice","company":[{"name":"Acme","city":"Berlin"},{"name":"Globex","city":"Paris"}]}]"#
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The structure is inferred from the first record only; rows are expected
//! to share its columns.

pub mod converter;
pub mod decode;
pub mod error;
pub mod nest;
pub mod reader;
pub mod template;
pub mod types;

// Re-export commonly used types for convenience
pub use converter::Converter;
pub use decode::{Decoder, Timestamp};
pub use error::{Error, Result};
pub use nest::{FieldShape, OutputFormat, RecordAssembler, RecordWriter, StructureDescriptor};
pub use reader::{read_records, CsvReader, ReaderConfig};
pub use template::{Template, TemplateKey};
pub use types::{FlatRecord, KeyConvention, NestedRecord, NestedValue, SubObject};

/// Main entry point: read CSV from `reader` and rebuild nested records
pub fn convert_csv<R: std::io::Read>(reader: R, convention: KeyConvention) -> Result<Vec<NestedRecord>> {
    let mut records = read_records(reader)?;
    Converter::new(convention).to_maps(&mut records)
}
