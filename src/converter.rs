use crate::decode::Decoder;
use crate::error::{Error, Result};
use crate::nest::{strip_quotes, to_json_string, RecordAssembler, StructureDescriptor};
use crate::types::{FlatRecord, KeyConvention, NestedRecord};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Converts batches of flat CSV records into nested output
pub struct Converter {
    convention: KeyConvention,
    decoder: Decoder,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(KeyConvention::default())
    }
}

impl Converter {
    pub fn new(convention: KeyConvention) -> Self {
        Converter {
            convention: convention.normalized(),
            decoder: Decoder::default(),
        }
    }

    /// Replace the decoder used by `to_struct`
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn convention(&self) -> &KeyConvention {
        &self.convention
    }

    /// Infer the structure of a batch from its first record
    pub fn infer_structure(&self, records: &[FlatRecord]) -> Result<StructureDescriptor> {
        let example = records.first().ok_or(Error::EmptyBatch)?;
        Ok(StructureDescriptor::infer(example, &self.convention))
    }

    /// Rebuild nested records from a batch
    ///
    /// Quote characters are stripped from the values of `records` in place
    /// before the structure is inferred.
    pub fn to_maps(&self, records: &mut [FlatRecord]) -> Result<Vec<NestedRecord>> {
        if records.is_empty() {
            return Err(Error::EmptyBatch);
        }

        strip_quotes(records);

        let structure = self.infer_structure(records)?;
        debug!(
            records = records.len(),
            fields = structure.len(),
            "converting batch"
        );

        let assembler = RecordAssembler::new(structure);
        Ok(assembler.assemble_all(records))
    }

    /// Rebuild a batch and serialize it as a compact JSON array
    pub fn to_json(&self, records: &mut [FlatRecord]) -> Result<String> {
        let nested = self.to_maps(records)?;
        to_json_string(&nested)
    }

    /// Rebuild a batch and decode every record into `T`
    pub fn to_struct<T: DeserializeOwned>(&self, records: &mut [FlatRecord]) -> Result<Vec<T>> {
        let nested = self.to_maps(records)?;
        self.decoder.decode_all(&nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{LenientScalars, Timestamp};
    use crate::types::NestedValue;
    use serde::Deserialize;

    fn record(pairs: &[(&str, &str)]) -> FlatRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_batch() {
        let converter = Converter::default();

        assert!(matches!(converter.to_maps(&mut []), Err(Error::EmptyBatch)));
        assert!(matches!(converter.to_json(&mut []), Err(Error::EmptyBatch)));
        assert!(matches!(
            converter.to_struct::<serde_json::Value>(&mut []),
            Err(Error::EmptyBatch)
        ));
    }

    #[test]
    fn test_to_maps_strips_quotes_in_place() {
        let mut records = vec![record(&[("id", "\"5\""), ("a.0.x", "\"q\"")])];

        let nested = Converter::default().to_maps(&mut records).unwrap();

        assert_eq!(nested[0]["id"], NestedValue::from("5"));
        assert_eq!(nested[0]["a"].as_array().unwrap()[0]["x"], "q");
        assert_eq!(records[0]["id"], "5");
    }

    #[test]
    fn test_to_json() {
        let mut records = vec![
            record(&[("name", "Alice"), ("company.0.name", "Acme"), ("company.1.name", "Globex")]),
            record(&[("name", "Bob"), ("company.0.name", "Initech")]),
        ];

        let json = Converter::default().to_json(&mut records).unwrap();

        assert_eq!(
            json,
            r#"[{"name":"Alice","company":[{"name":"Acme"},{"name":"Globex"}]},{"name":"Bob","company":[{"name":"Initech"}]}]"#
        );
    }

    #[test]
    fn test_custom_convention() {
        let mut records = vec![record(&[("company-0-name", "Acme"), ("company-name-0", "x")])];

        let nested = Converter::new(KeyConvention::new("-", 1))
            .to_maps(&mut records)
            .unwrap();

        assert!(nested[0]["company"].as_array().is_some());
        assert_eq!(nested[0]["company-name-0"], NestedValue::from("x"));
    }

    #[test]
    fn test_to_struct() {
        #[derive(Debug, Deserialize)]
        struct Job {
            title: String,
            years: u32,
        }

        #[derive(Debug, Deserialize)]
        struct Person {
            name: String,
            #[serde(rename = "joined")]
            joined_at: Timestamp,
            jobs: Vec<Job>,
        }

        let mut records = vec![record(&[
            ("name", "Alice"),
            ("joined", "2019-05-04T10:00:00Z"),
            ("jobs.0.title", "Engineer"),
            ("jobs.0.years", "\"3\""),
        ])];

        let converter = Converter::default()
            .with_decoder(Decoder::new().with_rule(LenientScalars));
        let people: Vec<Person> = converter.to_struct(&mut records).unwrap();

        assert_eq!(people.len(), 1);
        assert_eq!(people[0].name, "Alice");
        assert_eq!(people[0].joined_at.to_rfc3339(), "2019-05-04T10:00:00+00:00");
        assert_eq!(people[0].jobs[0].title, "Engineer");
        assert_eq!(people[0].jobs[0].years, 3);
    }
}
