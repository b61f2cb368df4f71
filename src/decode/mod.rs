//! Typed decoding of nested records
//!
//! `Decoder` maps `NestedRecord`s onto any `serde::Deserialize` type.
//! Field names follow the target's serde attributes
//! (`#[serde(rename = "...")]`).
//!
//! Every scalar in a record is text. When the target asks for something else,
//! the decoder consults its `DecodeRule`s. The first rule that recognises the
//! `(target, source)` pair supplies the converted value. Without a matching
//! rule the raw text is handed to the target unchanged.
//!
//! ```rust
//! use csvnest::decode::{Decoder, LenientScalars, Timestamp};
//! use csvnest::{NestedRecord, NestedValue};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Event {
//!     name: String,
//!     attendees: u32,
//!     at: Timestamp,
//! }
//!
//! let mut record = NestedRecord::new();
//! record.insert("name".into(), NestedValue::from("launch"));
//! record.insert("attendees".into(), NestedValue::from("12"));
//! record.insert("at".into(), NestedValue::from("2024-03-01T09:30:00Z"));
//!
//! let decoder = Decoder::new().with_rule(LenientScalars);
//! let event: Event = decoder.decode_record(&record).unwrap();
//! assert_eq!(event.attendees, 12);
//! ```

pub mod rules;

use crate::error::{Error, Result};
use crate::types::{NestedRecord, NestedValue, SubObject};
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::forward_to_deserialize_any;
use std::fmt;

pub use rules::{DateFormat, LenientScalars, Rfc3339Timestamps, Timestamp};

/// What the target type asked for when a scalar was decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Char,
    Str,
    /// A newtype struct, identified by its type name
    Named(&'static str),
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Bool => f.write_str("bool"),
            TargetKind::Signed => f.write_str("signed integer"),
            TargetKind::Unsigned => f.write_str("unsigned integer"),
            TargetKind::Float => f.write_str("float"),
            TargetKind::Char => f.write_str("char"),
            TargetKind::Str => f.write_str("string"),
            TargetKind::Named(name) => f.write_str(name),
        }
    }
}

/// A converted scalar produced by a rule
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn visit<'de, V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        match self {
            Scalar::Bool(b) => visitor.visit_bool(b),
            Scalar::Signed(n) => visitor.visit_i64(n),
            Scalar::Unsigned(n) => visitor.visit_u64(n),
            Scalar::Float(n) => visitor.visit_f64(n),
            Scalar::Text(s) => visitor.visit_string(s),
        }
    }

    fn visit_newtype<'de, V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        match self {
            Scalar::Bool(b) => {
                let inner = <bool as IntoDeserializer<'de, DecodeError>>::into_deserializer(b);
                visitor.visit_newtype_struct(inner)
            }
            Scalar::Signed(n) => {
                let inner = <i64 as IntoDeserializer<'de, DecodeError>>::into_deserializer(n);
                visitor.visit_newtype_struct(inner)
            }
            Scalar::Unsigned(n) => {
                let inner = <u64 as IntoDeserializer<'de, DecodeError>>::into_deserializer(n);
                visitor.visit_newtype_struct(inner)
            }
            Scalar::Float(n) => {
                let inner = <f64 as IntoDeserializer<'de, DecodeError>>::into_deserializer(n);
                visitor.visit_newtype_struct(inner)
            }
            Scalar::Text(s) => {
                let inner = <String as IntoDeserializer<'de, DecodeError>>::into_deserializer(s);
                visitor.visit_newtype_struct(inner)
            }
        }
    }
}

/// A conversion from record text into a richer target type
pub trait DecodeRule: Send + Sync {
    /// Return `None` when this rule does not handle the pair.
    fn convert(&self, target: TargetKind, source: &str) -> Option<std::result::Result<Scalar, DecodeError>>;
}

/// Error raised while decoding a single record
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{0}")]
    Message(String),
    #[error("cannot convert {value:?} into {target}: {reason}")]
    Conversion {
        target: TargetKind,
        value: String,
        reason: String,
    },
}

impl DecodeError {
    pub fn conversion(target: TargetKind, value: &str, reason: impl fmt::Display) -> Self {
        DecodeError::Conversion {
            target,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodeError::Message(msg.to_string())
    }
}

/// Decodes nested records into typed values
pub struct Decoder {
    rules: Vec<Box<dyn DecodeRule>>,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            rules: vec![Box::new(Rfc3339Timestamps)],
        }
    }
}

impl Decoder {
    /// Decoder with the RFC 3339 timestamp rule installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder without any conversion rules
    pub fn without_rules() -> Self {
        Decoder { rules: Vec::new() }
    }

    /// Append a rule; earlier rules take precedence
    pub fn with_rule(mut self, rule: impl DecodeRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn decode_record<T: DeserializeOwned>(&self, record: &NestedRecord) -> std::result::Result<T, DecodeError> {
        T::deserialize(RecordDeserializer {
            record,
            rules: &self.rules,
        })
    }

    /// Decode every record, failing the whole batch on the first error
    pub fn decode_all<T: DeserializeOwned>(&self, records: &[NestedRecord]) -> Result<Vec<T>> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.decode_record(record)
                    .map_err(|source| Error::Decode { index, source })
            })
            .collect()
    }
}

type Rules<'a> = &'a [Box<dyn DecodeRule>];

static EMPTY_VALUE: NestedValue = NestedValue::Scalar(String::new());

struct RecordDeserializer<'a> {
    record: &'a NestedRecord,
    rules: Rules<'a>,
}

impl<'de, 'a> Deserializer<'de> for RecordDeserializer<'a> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        let rules = self.rules;
        let entries = self
            .record
            .iter()
            .map(|(key, value)| (key.as_str(), ValueDeserializer { value, rules }));
        MapDeserializer::new(entries).deserialize_any(visitor)
    }

    /// Fields the record lacks are decoded from empty text
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, DecodeError> {
        let rules = self.rules;
        let record = self.record;
        let present = record
            .iter()
            .map(|(key, value)| (key.as_str(), ValueDeserializer { value, rules }));
        let absent = fields
            .iter()
            .copied()
            .filter(move |field| !record.contains_key(*field))
            .map(move |field| (field, ValueDeserializer { value: &EMPTY_VALUE, rules }));
        MapDeserializer::new(present.chain(absent)).deserialize_any(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

struct ValueDeserializer<'a> {
    value: &'a NestedValue,
    rules: Rules<'a>,
}

impl<'de, 'a> IntoDeserializer<'de, DecodeError> for ValueDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'a> ValueDeserializer<'a> {
    fn scalar(&self) -> Option<ScalarDeserializer<'a>> {
        match self.value {
            NestedValue::Scalar(s) => Some(ScalarDeserializer {
                value: s,
                rules: self.rules,
            }),
            NestedValue::Array(_) => None,
        }
    }
}

// Scalars keep the target's type hint; arrays always present a sequence
macro_rules! delegate_to_scalar {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
                match self.scalar() {
                    Some(scalar) => scalar.$method(visitor),
                    None => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for ValueDeserializer<'a> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        match self.value {
            NestedValue::Scalar(s) => visitor.visit_str(s),
            NestedValue::Array(items) => {
                let rules = self.rules;
                let entries = items.iter().map(|entry| EntryDeserializer { entry, rules });
                SeqDeserializer::new(entries).deserialize_any(visitor)
            }
        }
    }

    delegate_to_scalar! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_unit
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        match self.scalar() {
            Some(scalar) => scalar.deserialize_option(visitor),
            None => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, DecodeError> {
        match self.scalar() {
            Some(scalar) => scalar.deserialize_newtype_struct(name, visitor),
            None => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, DecodeError> {
        match self.scalar() {
            Some(scalar) => scalar.deserialize_enum(name, variants, visitor),
            None => self.deserialize_any(visitor),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        match self.scalar() {
            Some(scalar) => scalar.deserialize_seq(visitor),
            None => self.deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf unit_struct tuple tuple_struct map struct identifier
    }
}

struct EntryDeserializer<'a> {
    entry: &'a SubObject,
    rules: Rules<'a>,
}

impl<'de, 'a> IntoDeserializer<'de, DecodeError> for EntryDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de, 'a> Deserializer<'de> for EntryDeserializer<'a> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        let rules = self.rules;
        let fields = self
            .entry
            .iter()
            .map(|(key, value)| (key.as_str(), ScalarDeserializer { value, rules }));
        MapDeserializer::new(fields).deserialize_any(visitor)
    }

    /// Sub-fields missing from a partial entry are decoded from empty text
    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, DecodeError> {
        let rules = self.rules;
        let entry = self.entry;
        let present = entry
            .iter()
            .map(|(key, value)| (key.as_str(), ScalarDeserializer { value, rules }));
        let absent = fields
            .iter()
            .copied()
            .filter(move |field| !entry.contains_key(*field))
            .map(move |field| (field, ScalarDeserializer { value: "", rules }));
        MapDeserializer::new(present.chain(absent)).deserialize_any(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier
    }
}

struct ScalarDeserializer<'a> {
    value: &'a str,
    rules: Rules<'a>,
}

impl<'a> ScalarDeserializer<'a> {
    fn convert(&self, target: TargetKind) -> std::result::Result<Option<Scalar>, DecodeError> {
        for rule in self.rules {
            if let Some(result) = rule.convert(target, self.value) {
                return result.map(Some);
            }
        }
        Ok(None)
    }
}

impl<'de, 'a> IntoDeserializer<'de, DecodeError> for ScalarDeserializer<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_hinted {
    ($($method:ident => $kind:expr),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
                match self.convert($kind)? {
                    Some(scalar) => scalar.visit(visitor),
                    None => visitor.visit_str(self.value),
                }
            }
        )*
    };
}

impl<'de, 'a> Deserializer<'de> for ScalarDeserializer<'a> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        visitor.visit_str(self.value)
    }

    deserialize_hinted! {
        deserialize_bool => TargetKind::Bool,
        deserialize_i8 => TargetKind::Signed,
        deserialize_i16 => TargetKind::Signed,
        deserialize_i32 => TargetKind::Signed,
        deserialize_i64 => TargetKind::Signed,
        deserialize_u8 => TargetKind::Unsigned,
        deserialize_u16 => TargetKind::Unsigned,
        deserialize_u32 => TargetKind::Unsigned,
        deserialize_u64 => TargetKind::Unsigned,
        deserialize_f32 => TargetKind::Float,
        deserialize_f64 => TargetKind::Float,
        deserialize_char => TargetKind::Char,
        deserialize_str => TargetKind::Str,
        deserialize_string => TargetKind::Str,
    }

    /// Empty text is a missing value
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        if self.value.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    /// Empty text is an empty sequence
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        if self.value.is_empty() {
            SeqDeserializer::new(std::iter::empty::<ScalarDeserializer<'a>>()).deserialize_any(visitor)
        } else {
            visitor.visit_str(self.value)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, DecodeError> {
        match self.convert(TargetKind::Named(name))? {
            Some(scalar) => scalar.visit_newtype(visitor),
            None => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, DecodeError> {
        let unit_variant = <&'a str as IntoDeserializer<'de, DecodeError>>::into_deserializer(self.value);
        unit_variant.deserialize_enum(name, variants, visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf unit_struct tuple tuple_struct map struct identifier
    }
}
