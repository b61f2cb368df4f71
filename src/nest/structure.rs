//! Structure inference for flattened CSV headers
//!
//! A `StructureDescriptor` is computed once from an example record and then
//! reused for every row of the batch, so reassembly makes no decisions about
//! which columns belong together.

use crate::types::{FlatRecord, KeyConvention};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

/// Shape of a single output field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// Copied through from the column of the same name
    Scalar,
    /// Rebuilt from indexed columns; sub-fields in first-seen order
    Array { sub_fields: Vec<String> },
}

impl FieldShape {
    /// Sub-field names, empty for scalars
    pub fn sub_fields(&self) -> &[String] {
        match self {
            FieldShape::Scalar => &[],
            FieldShape::Array { sub_fields } => sub_fields,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldShape::Array { .. })
    }
}

/// Group key -> field shape, in the order keys appeared in the example
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureDescriptor {
    fields: IndexMap<String, FieldShape>,
    convention: KeyConvention,
}

impl StructureDescriptor {
    /// Infer the structure implied by the column names of `example`
    ///
    /// # Arguments
    /// * `example` - Representative record, normally the first row of a batch
    /// * `convention` - Delimiter and index position used to split keys
    ///
    /// An empty example produces an empty descriptor.
    pub fn infer(example: &FlatRecord, convention: &KeyConvention) -> Self {
        let mut descriptor = StructureDescriptor {
            fields: IndexMap::new(),
            convention: convention.clone(),
        };

        for key in example.keys() {
            descriptor.register_key(key);
        }

        debug!(
            fields = descriptor.fields.len(),
            arrays = descriptor.fields.values().filter(|s| s.is_array()).count(),
            "inferred record structure"
        );

        descriptor
    }

    fn register_key(&mut self, key: &str) {
        let delimiter = self.convention.delimiter.as_str();
        let index_pos = self.convention.index_pos;
        let parts: Vec<&str> = key.split(delimiter).collect();

        if parts.len() <= index_pos {
            self.register_scalar(key);
            return;
        }

        // A non-numeric segment means the delimiter is just part of the name
        if parts[index_pos].parse::<usize>().is_err() {
            self.register_scalar(key);
            return;
        }

        let group = parts[..index_pos].join(delimiter);
        let sub_field = parts[index_pos + 1..].join(delimiter);
        self.register_sub_field(group, sub_field);
    }

    fn register_scalar(&mut self, key: &str) {
        // Never downgrade an array group that shares this name
        match self.fields.get(key) {
            Some(FieldShape::Array { .. }) => {
                warn!(column = key, "scalar column shadowed by array group");
            }
            Some(FieldShape::Scalar) => {}
            None => {
                self.fields.insert(key.to_string(), FieldShape::Scalar);
            }
        }
    }

    fn register_sub_field(&mut self, group: String, sub_field: String) {
        match self.fields.get_mut(&group) {
            Some(FieldShape::Array { sub_fields }) => {
                if !sub_fields.contains(&sub_field) {
                    sub_fields.push(sub_field);
                }
            }
            Some(shape) => {
                warn!(column = group.as_str(), "scalar column shadowed by array group");
                *shape = FieldShape::Array {
                    sub_fields: vec![sub_field],
                };
            }
            None => {
                self.fields.insert(
                    group,
                    FieldShape::Array {
                        sub_fields: vec![sub_field],
                    },
                );
            }
        }
    }

    /// Get the shape for a group key
    pub fn get(&self, group: &str) -> Option<&FieldShape> {
        self.fields.get(group)
    }

    /// Iterate group keys and shapes in inference order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldShape)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn convention(&self) -> &KeyConvention {
        &self.convention
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a flat column is consumed by this structure
    pub fn covers(&self, column: &str) -> bool {
        if matches!(self.fields.get(column), Some(FieldShape::Scalar)) {
            return true;
        }

        self.fields.iter().any(|(group, shape)| {
            let FieldShape::Array { sub_fields } = shape else {
                return false;
            };
            let Some(rest) = column
                .strip_prefix(group.as_str())
                .and_then(|r| r.strip_prefix(self.convention.delimiter.as_str()))
            else {
                return false;
            };
            let Some((index, sub_field)) = rest.split_once(self.convention.delimiter.as_str()) else {
                return false;
            };
            index.parse::<usize>().is_ok() && sub_fields.iter().any(|s| s == sub_field)
        })
    }
}

/// Serializes as `{"group": ["sub", ...]}` with `[]` for scalars
impl Serialize for StructureDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (group, shape) in &self.fields {
            map.serialize_entry(group, shape.sub_fields())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(keys: &[&str]) -> FlatRecord {
        keys.iter()
            .map(|k| (k.to_string(), String::from("v")))
            .collect()
    }

    #[test]
    fn test_scalar_keys() {
        let example = record(&["id", "name"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        assert_eq!(descriptor.len(), 2);
        assert_eq!(descriptor.get("id"), Some(&FieldShape::Scalar));
        assert_eq!(descriptor.get("name"), Some(&FieldShape::Scalar));
    }

    #[test]
    fn test_array_keys_group_sub_fields_in_order() {
        let example = record(&["id", "company.0.name", "company.0.city", "company.1.name", "company.1.city"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        assert_eq!(descriptor.len(), 2);
        assert_eq!(
            descriptor.get("company").unwrap().sub_fields(),
            &["name".to_string(), "city".to_string()]
        );

        let groups: Vec<&str> = descriptor.iter().map(|(g, _)| g).collect();
        assert_eq!(groups, vec!["id", "company"]);
    }

    #[test]
    fn test_non_numeric_segment_is_scalar() {
        let example = record(&["a.b.c"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        assert_eq!(descriptor.get("a.b.c"), Some(&FieldShape::Scalar));
        assert!(descriptor.get("a").is_none());
    }

    #[test]
    fn test_negative_index_is_scalar() {
        let example = record(&["a.-1.x"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        assert_eq!(descriptor.get("a.-1.x"), Some(&FieldShape::Scalar));
    }

    #[test]
    fn test_leading_zero_index_is_array() {
        let example = record(&["a.00.x"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        assert!(descriptor.get("a").unwrap().is_array());
    }

    #[test]
    fn test_deeper_index_position_and_custom_delimiter() {
        let example = record(&["user-address-0-street-name", "user-address-0-zip"]);
        let convention = KeyConvention::new("-", 2);
        let descriptor = StructureDescriptor::infer(&example, &convention);

        assert_eq!(
            descriptor.get("user-address").unwrap().sub_fields(),
            &["street-name".to_string(), "zip".to_string()]
        );
    }

    #[test]
    fn test_short_key_is_scalar() {
        let example = record(&["a.0"]);
        let convention = KeyConvention::new(".", 2);
        let descriptor = StructureDescriptor::infer(&example, &convention);

        assert_eq!(descriptor.get("a.0"), Some(&FieldShape::Scalar));
    }

    #[test]
    fn test_array_wins_over_scalar_of_same_name() {
        let first = StructureDescriptor::infer(&record(&["a", "a.0.x"]), &KeyConvention::default());
        let second = StructureDescriptor::infer(&record(&["a.0.x", "a"]), &KeyConvention::default());

        assert_eq!(first.get("a").unwrap().sub_fields(), &["x".to_string()]);
        assert_eq!(second.get("a").unwrap().sub_fields(), &["x".to_string()]);
    }

    #[test]
    fn test_shadowed_scalar_is_logged() {
        for keys in [["a", "a.0.x"], ["a.0.x", "a"]] {
            let output = crate::nest::test_log::capture(tracing::Level::WARN, || {
                StructureDescriptor::infer(&record(&keys), &KeyConvention::default());
            });

            assert!(output.contains("scalar column shadowed by array group"), "{keys:?}: {output}");
            assert!(output.contains("column=\"a\"") || output.contains("column=a"), "{output}");
        }
    }

    #[test]
    fn test_empty_example() {
        let descriptor = StructureDescriptor::infer(&FlatRecord::new(), &KeyConvention::default());
        assert!(descriptor.is_empty());
    }

    #[test]
    fn test_inference_is_idempotent() {
        let example = record(&["a.0.x", "a.0.y", "a.1.y", "a.1.x", "b"]);
        let convention = KeyConvention::default();

        assert_eq!(
            StructureDescriptor::infer(&example, &convention),
            StructureDescriptor::infer(&example, &convention)
        );
    }

    #[test]
    fn test_covers() {
        let example = record(&["id", "a.0.x", "a.0.y"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        assert!(descriptor.covers("id"));
        assert!(descriptor.covers("a.7.y"));
        assert!(!descriptor.covers("a.0.z"));
        assert!(!descriptor.covers("extra"));
    }

    #[test]
    fn test_serialize() {
        let example = record(&["id", "a.0.x", "a.0.y"]);
        let descriptor = StructureDescriptor::infer(&example, &KeyConvention::default());

        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"id":[],"a":["x","y"]}"#);
    }
}
