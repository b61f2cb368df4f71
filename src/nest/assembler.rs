//! Record reassembly using a pre-computed structure
//!
//! `RecordAssembler` walks a `StructureDescriptor` for every record, so
//! each row is rebuilt without re-examining its column names.

use crate::nest::structure::{FieldShape, StructureDescriptor};
use crate::types::{FlatRecord, KeyConvention, NestedRecord, NestedValue, SubObject};
use tracing::debug;

/// Remove every `"` from every value in the batch.
///
/// Upstream CSV readers can leave quoting artifacts behind. The records are
/// modified in place.
pub fn strip_quotes(records: &mut [FlatRecord]) {
    for record in records.iter_mut() {
        for value in record.values_mut() {
            if value.contains('"') {
                *value = value.replace('"', "");
            }
        }
    }
}

/// Rebuilds nested records from flat ones using a shared structure
pub struct RecordAssembler {
    structure: StructureDescriptor,
}

impl RecordAssembler {
    pub fn new(structure: StructureDescriptor) -> Self {
        RecordAssembler { structure }
    }

    /// Create an assembler by inferring the structure from an example record
    ///
    /// # Example
    /// ```rust
    /// use csvnest::nest::RecordAssembler;
    /// use csvnest::{FlatRecord, KeyConvention};
    ///
    /// let mut row = FlatRecord::new();
    /// row.insert("name".into(), "Alice".into());
    /// row.insert("pets.0.kind".into(), "cat".into());
    ///
    /// let assembler = RecordAssembler::from_example(&row, &KeyConvention::default());
    /// let nested = assembler.assemble(&row);
    /// assert_eq!(nested["pets"].as_array().unwrap()[0]["kind"], "cat");
    /// ```
    pub fn from_example(example: &FlatRecord, convention: &KeyConvention) -> Self {
        Self::new(StructureDescriptor::infer(example, convention))
    }

    pub fn structure(&self) -> &StructureDescriptor {
        &self.structure
    }

    /// Rebuild a single record
    pub fn assemble(&self, record: &FlatRecord) -> NestedRecord {
        let mut nested = NestedRecord::with_capacity(self.structure.len());

        for (group, shape) in self.structure.iter() {
            let value = match shape {
                // Missing scalars degrade to an empty string
                FieldShape::Scalar => NestedValue::Scalar(
                    record.get(group).cloned().unwrap_or_default(),
                ),
                FieldShape::Array { sub_fields } => {
                    NestedValue::Array(self.assemble_array(group, sub_fields, record))
                }
            };
            nested.insert(group.to_string(), value);
        }

        nested
    }

    /// Rebuild every record, preserving input order
    pub fn assemble_all(&self, records: &[FlatRecord]) -> Vec<NestedRecord> {
        let nested: Vec<NestedRecord> = records.iter().map(|r| self.assemble(r)).collect();

        // Counting scans every column against the structure
        if tracing::enabled!(tracing::Level::DEBUG) {
            let dropped = records
                .iter()
                .flat_map(|r| r.keys())
                .filter(|column| !self.structure.covers(column))
                .count();
            if dropped > 0 {
                debug!(dropped, "ignored values from columns absent in the example record");
            }
        }

        debug!(records = nested.len(), "assembled records");
        nested
    }

    fn assemble_array(&self, group: &str, sub_fields: &[String], record: &FlatRecord) -> Vec<SubObject> {
        let convention = self.structure.convention();
        let Some(first) = sub_fields.first() else {
            return Vec::new();
        };

        // Only the first sub-field decides how many entries exist
        let mut length = 0;
        while record.contains_key(&convention.compose(group, length, first)) {
            length += 1;
        }

        let mut entries = vec![SubObject::with_capacity(sub_fields.len()); length];

        // Each sub-field stops at its own first gap; later indices stay unset
        for sub_field in sub_fields {
            for (index, entry) in entries.iter_mut().enumerate() {
                let Some(value) = record.get(&convention.compose(group, index, sub_field)) else {
                    break;
                };
                entry.insert(sub_field.clone(), value.clone());
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> FlatRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn entry(pairs: &[(&str, &str)]) -> SubObject {
        record(pairs)
    }

    #[test]
    fn test_scalar_passthrough() {
        let row = record(&[("id", "1"), ("name", "Alice")]);
        let assembler = RecordAssembler::from_example(&row, &KeyConvention::default());

        let nested = assembler.assemble(&row);

        assert_eq!(nested.len(), 2);
        assert_eq!(nested["id"], NestedValue::from("1"));
        assert_eq!(nested["name"], NestedValue::from("Alice"));
    }

    #[test]
    fn test_array_grouping() {
        let row = record(&[("a.0.x", "1"), ("a.0.y", "2"), ("a.1.x", "3"), ("a.1.y", "4")]);
        let assembler = RecordAssembler::from_example(&row, &KeyConvention::default());

        let nested = assembler.assemble(&row);

        assert_eq!(
            nested["a"],
            NestedValue::Array(vec![
                entry(&[("x", "1"), ("y", "2")]),
                entry(&[("x", "3"), ("y", "4")]),
            ])
        );
    }

    #[test]
    fn test_missing_scalar_is_empty() {
        let example = record(&[("id", "1"), ("name", "Alice")]);
        let assembler = RecordAssembler::from_example(&example, &KeyConvention::default());

        let nested = assembler.assemble(&record(&[("id", "2")]));

        assert_eq!(nested["name"], NestedValue::from(""));
    }

    #[test]
    fn test_ragged_array_uses_own_length() {
        let example = record(&[("a.0.x", "1"), ("a.1.x", "2")]);
        let assembler = RecordAssembler::from_example(&example, &KeyConvention::default());

        let nested = assembler.assemble(&record(&[("a.0.x", "9")]));

        assert_eq!(nested["a"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_length_comes_from_first_sub_field() {
        let example = record(&[("a.0.x", "1"), ("a.0.y", "2")]);
        let assembler = RecordAssembler::from_example(&example, &KeyConvention::default());

        // y has an entry at index 1 but x does not
        let nested = assembler.assemble(&record(&[("a.0.x", "1"), ("a.0.y", "2"), ("a.1.y", "3")]));

        assert_eq!(nested["a"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_non_first_sub_field_stops_at_first_gap() {
        let example = record(&[("a.0.x", "1"), ("a.0.y", "2")]);
        let assembler = RecordAssembler::from_example(&example, &KeyConvention::default());

        let row = record(&[
            ("a.0.x", "1"),
            ("a.1.x", "2"),
            ("a.2.x", "3"),
            ("a.0.y", "a"),
            ("a.2.y", "c"),
        ]);
        let nested = assembler.assemble(&row);

        assert_eq!(
            nested["a"],
            NestedValue::Array(vec![
                entry(&[("x", "1"), ("y", "a")]),
                entry(&[("x", "2")]),
                entry(&[("x", "3")]),
            ])
        );
    }

    #[test]
    fn test_unknown_columns_are_dropped() {
        let example = record(&[("id", "1")]);
        let assembler = RecordAssembler::from_example(&example, &KeyConvention::default());

        let nested = assembler.assemble(&record(&[("id", "2"), ("extra", "x")]));

        assert_eq!(nested.len(), 1);
        assert!(!nested.contains_key("extra"));
    }

    #[test]
    fn test_assemble_all_preserves_order() {
        let rows: Vec<FlatRecord> = (0..5)
            .map(|i| {
                let id = i.to_string();
                record(&[("id", id.as_str())])
            })
            .collect();
        let assembler = RecordAssembler::from_example(&rows[0], &KeyConvention::default());

        let nested = assembler.assemble_all(&rows);

        let ids: Vec<&str> = nested.iter().map(|r| r["id"].as_scalar().unwrap()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_strip_quotes() {
        let mut rows = vec![record(&[("a", "\"5\""), ("b", "say \"hi\"")])];

        strip_quotes(&mut rows);

        assert_eq!(rows[0]["a"], "5");
        assert_eq!(rows[0]["b"], "say hi");
    }

    #[test]
    fn test_dropped_columns_logged_only_at_debug() {
        let rows = vec![
            record(&[("id", "1")]),
            record(&[("id", "2"), ("email", "b@example.com")]),
        ];
        let assembler = RecordAssembler::from_example(&rows[0], &KeyConvention::default());

        let debug = crate::nest::test_log::capture(tracing::Level::DEBUG, || {
            assembler.assemble_all(&rows);
        });
        assert!(debug.contains("dropped=1"), "{debug}");

        let info = crate::nest::test_log::capture(tracing::Level::INFO, || {
            assert_eq!(assembler.assemble_all(&rows).len(), 2);
        });
        assert!(!info.contains("dropped"), "{info}");
    }
}
