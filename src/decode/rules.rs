//! Built-in decode rules
//!
//! Date/time handling reuses the format-detection approach of a
//! pre-compiled regex guarding a stricter parse.

use super::{DecodeError, DecodeRule, Scalar, TargetKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserialize, Deserializer, Unexpected, Visitor};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

static RFC3339_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$").unwrap()
});

/// A point in time decoded from record text
///
/// Only canonical UTC text (`2024-03-01T09:30:00Z`, the form it serializes
/// to) is accepted directly. Any other spelling, including RFC 3339 with an
/// offset, needs a rule such as `Rfc3339Timestamps` or `DateFormat` to
/// rewrite it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Type name seen by decode rules as `TargetKind::Named`
    pub const NAME: &'static str = "Timestamp";

    /// Parse any RFC 3339 text, converting the offset to UTC
    pub fn parse_rfc3339(text: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| Timestamp(dt.with_timezone(&Utc)))
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&canonical_text(self.0))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(Self::NAME, TimestampVisitor)
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a UTC timestamp such as 2024-03-01T09:30:00Z")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
        Timestamp::parse_rfc3339(v)
            .filter(|ts| canonical_text(ts.0) == v)
            .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, deserializer: D) -> Result<Timestamp, D::Error> {
        deserializer.deserialize_str(self)
    }
}

fn canonical_text(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn canonical(dt: DateTime<Utc>) -> Scalar {
    Scalar::Text(canonical_text(dt))
}

/// Decodes RFC 3339 text with any offset into `Timestamp` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339Timestamps;

impl DecodeRule for Rfc3339Timestamps {
    fn convert(&self, target: TargetKind, source: &str) -> Option<Result<Scalar, DecodeError>> {
        if target != TargetKind::Named(Timestamp::NAME) || !RFC3339_REGEX.is_match(source) {
            return None;
        }

        Some(
            DateTime::parse_from_rfc3339(source)
                .map(|dt| canonical(dt.with_timezone(&Utc)))
                .map_err(|e| DecodeError::conversion(target, source, e)),
        )
    }
}

/// Decodes `Timestamp` fields written in a custom chrono format
///
/// Formats without a time component are read as midnight UTC.
#[derive(Debug, Clone)]
pub struct DateFormat {
    format: String,
}

impl DateFormat {
    pub fn new(format: impl Into<String>) -> Self {
        DateFormat {
            format: format.into(),
        }
    }
}

impl DecodeRule for DateFormat {
    fn convert(&self, target: TargetKind, source: &str) -> Option<Result<Scalar, DecodeError>> {
        if target != TargetKind::Named(Timestamp::NAME) {
            return None;
        }

        let naive = NaiveDateTime::parse_from_str(source, &self.format).ok().or_else(|| {
            NaiveDate::parse_from_str(source, &self.format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

        Some(Ok(canonical(Utc.from_utc_datetime(&naive))))
    }
}

/// Parses numeric and boolean targets from text
///
/// Empty text becomes zero or `false`, matching how missing columns
/// degrade to empty strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientScalars;

impl LenientScalars {
    fn parse_bool(text: &str) -> Option<bool> {
        match text {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
            _ => None,
        }
    }
}

impl DecodeRule for LenientScalars {
    fn convert(&self, target: TargetKind, source: &str) -> Option<Result<Scalar, DecodeError>> {
        let text = source.trim();
        let result = match target {
            TargetKind::Bool if text.is_empty() => Ok(Scalar::Bool(false)),
            TargetKind::Bool => Self::parse_bool(text)
                .map(Scalar::Bool)
                .ok_or_else(|| DecodeError::conversion(target, source, "not a boolean")),
            TargetKind::Signed if text.is_empty() => Ok(Scalar::Signed(0)),
            TargetKind::Signed => text
                .parse::<i64>()
                .map(Scalar::Signed)
                .map_err(|e| DecodeError::conversion(target, source, e)),
            TargetKind::Unsigned if text.is_empty() => Ok(Scalar::Unsigned(0)),
            TargetKind::Unsigned => text
                .parse::<u64>()
                .map(Scalar::Unsigned)
                .map_err(|e| DecodeError::conversion(target, source, e)),
            TargetKind::Float if text.is_empty() => Ok(Scalar::Float(0.0)),
            TargetKind::Float => text
                .parse::<f64>()
                .map(Scalar::Float)
                .map_err(|e| DecodeError::conversion(target, source, e)),
            _ => return None,
        };
        Some(result)
    }
}
