use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One CSV row: column name -> raw value, in header order
pub type FlatRecord = IndexMap<String, String>;

/// One entry of a reconstructed array: sub-field name -> value
pub type SubObject = IndexMap<String, String>;

/// A reconstructed record: group key -> scalar or array value
pub type NestedRecord = IndexMap<String, NestedValue>;

/// The value stored under a group key after reassembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NestedValue {
    /// Plain column copied through
    Scalar(String),

    /// Ordered entries rebuilt from `group.<i>.<sub>` columns
    Array(Vec<SubObject>),
}

impl NestedValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            NestedValue::Scalar(s) => Some(s),
            NestedValue::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[SubObject]> {
        match self {
            NestedValue::Array(items) => Some(items),
            NestedValue::Scalar(_) => None,
        }
    }
}

impl From<&str> for NestedValue {
    fn from(value: &str) -> Self {
        NestedValue::Scalar(value.to_string())
    }
}

/// How flat column names encode array nesting
///
/// With the defaults, `company.0.name` splits into group `company`,
/// index `0` and sub-field `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConvention {
    /// Separator between key segments
    pub delimiter: String,

    /// Segment offset where the numeric array index is expected
    pub index_pos: usize,
}

impl KeyConvention {
    pub fn new(delimiter: impl Into<String>, index_pos: usize) -> Self {
        KeyConvention {
            delimiter: delimiter.into(),
            index_pos,
        }
        .normalized()
    }

    /// Replace unusable settings with the defaults.
    ///
    /// An empty delimiter would split every key into characters, and an
    /// index at position 0 would leave the group key empty.
    pub fn normalized(mut self) -> Self {
        let defaults = KeyConvention::default();
        if self.delimiter.is_empty() {
            self.delimiter = defaults.delimiter;
        }
        if self.index_pos == 0 {
            self.index_pos = defaults.index_pos;
        }
        self
    }

    /// Build the flat column name for one array entry field
    pub fn compose(&self, group: &str, index: usize, sub_field: &str) -> String {
        format!(
            "{group}{d}{index}{d}{sub_field}",
            d = self.delimiter
        )
    }
}

impl Default for KeyConvention {
    fn default() -> Self {
        KeyConvention {
            delimiter: String::from("."),
            index_pos: 1,
        }
    }
}
