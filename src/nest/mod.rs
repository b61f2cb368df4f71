//! Nesting - rebuild arrays and objects from flattened CSV columns
//!
//! This module recovers the nesting that was flattened into delimited
//! column names such as `company.0.name`.
//!
//! ## Structure first
//!
//! The column layout is analysed once per batch with `StructureDescriptor`
//! and then applied to every row by `RecordAssembler`. Rows are assumed to
//! share the example row's layout.

pub mod structure;
pub mod assembler;
pub mod writer;

pub use structure::{FieldShape, StructureDescriptor};
pub use assembler::{RecordAssembler, strip_quotes};
pub use writer::{OutputFormat, RecordWriter, to_json_string};

/// Log capture shared by the nesting tests
#[cfg(test)]
pub(crate) mod test_log {
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a subscriber at `level` and return what it logged
    pub(crate) fn capture(level: tracing::Level, f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(level)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }
}
