//! Metadata value types
//!
//! This module defines `MetadataValue`, the closed tagged union for binding
//! metadata, and `Metadata`, the ordered string-keyed map of such values.
//!
//! ## Canonical Value Model
//!
//! The union has exactly 7 variants:
//! - Null, Bool, Int, Float, String, Timestamp, Map
//!
//! Maps are recursive and keep their keys in deterministic order (`BTreeMap`).
//! There is no handle or opaque-object variant: values a backend could not
//! serialize are unrepresentable by construction, so validation only has to
//! enforce key and nesting rules.
//!
//! ## Timestamp Interchange
//!
//! `Timestamp` values serialize as RFC 3339 text with microsecond precision
//! and a `Z` offset (the canonical form). Deserialization re-detects strings
//! in exactly that form as timestamps, which makes the textual representation
//! round-trip. A plain string that happens to be in precisely the canonical
//! form will come back as a timestamp; anything else stays a string.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered string-keyed metadata map
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Canonical metadata value type
///
/// Different types are never equal under `PartialEq`, even when they carry
/// the same "value": `Int(1) != Float(1.0)`. Query-position comparisons are
/// looser and live in the engine's predicate evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Offset-aware instant, microsecond precision
    Timestamp(DateTime<Utc>),
    /// Nested map with string keys, deterministic key order
    Map(Metadata),
}

impl MetadataValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::Null => "Null",
            MetadataValue::Bool(_) => "Bool",
            MetadataValue::Int(_) => "Int",
            MetadataValue::Float(_) => "Float",
            MetadataValue::String(_) => "String",
            MetadataValue::Timestamp(_) => "Timestamp",
            MetadataValue::Map(_) => "Map",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }

    /// Check if this is a nested map
    pub fn is_map(&self) -> bool {
        matches!(self, MetadataValue::Map(_))
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a timestamp if this is a Timestamp value
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            MetadataValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Get as a nested map if this is a Map value
    pub fn as_map(&self) -> Option<&Metadata> {
        match self {
            MetadataValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

// ============================================================================
// Canonical timestamp text
// ============================================================================

/// Render an instant in the canonical interchange form
///
/// RFC 3339, microsecond precision, `Z` offset. This is the textual format
/// adapters that serialize bindings store and exchange.
pub fn canonical_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a string that is exactly in the canonical timestamp form
///
/// Returns `None` for anything that does not re-render to the same text,
/// so ordinary strings never get misread as instants.
pub fn parse_canonical_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(text).ok()?.with_timezone(&Utc);
    if canonical_timestamp(parsed) == text {
        Some(parsed)
    } else {
        None
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Int(i)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        MetadataValue::Int(i as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(t: DateTime<Utc>) -> Self {
        MetadataValue::Timestamp(t)
    }
}

impl From<Metadata> for MetadataValue {
    fn from(m: Metadata) -> Self {
        MetadataValue::Map(m)
    }
}

impl From<()> for MetadataValue {
    fn from(_: ()) -> Self {
        MetadataValue::Null
    }
}

// ============================================================================
// Serde: natural JSON with canonical timestamp strings
// ============================================================================

impl Serialize for MetadataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetadataValue::Null => serializer.serialize_unit(),
            MetadataValue::Bool(b) => serializer.serialize_bool(*b),
            MetadataValue::Int(i) => serializer.serialize_i64(*i),
            MetadataValue::Float(f) => serializer.serialize_f64(*f),
            MetadataValue::String(s) => serializer.serialize_str(s),
            MetadataValue::Timestamp(t) => serializer.serialize_str(&canonical_timestamp(*t)),
            MetadataValue::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct MetadataValueVisitor;

impl<'de> Visitor<'de> for MetadataValueVisitor {
    type Value = MetadataValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("null, bool, number, string, or map")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        if let Ok(i) = i64::try_from(v) {
            Ok(MetadataValue::Int(i))
        } else {
            Ok(MetadataValue::Float(v as f64))
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        match parse_canonical_timestamp(v) {
            Some(t) => Ok(MetadataValue::Timestamp(t)),
            None => Ok(MetadataValue::String(v.to_string())),
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = Metadata::new();
        while let Some((key, value)) = access.next_entry::<String, MetadataValue>()? {
            map.insert(key, value);
        }
        Ok(MetadataValue::Map(map))
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(MetadataValueVisitor)
    }
}
