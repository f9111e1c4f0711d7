//! Metadata validation and normalization
//!
//! Validation enforces the structural rules of the metadata model. It runs
//! before any store mutation, so a failure leaves adapters and caches
//! untouched.
//!
//! Normalization converts `Timestamp` values to their canonical textual form
//! for adapters that persist bindings as text or bytes. The reference engine
//! keeps typed instants internally and only validates. Both operations are
//! pure: the input map is never mutated.

use crate::error::{Error, Result};
use crate::value::{canonical_timestamp, Metadata, MetadataValue};

/// Maximum nesting depth for metadata maps
///
/// A flat map is depth 1. A map whose value is another map is depth 2, and
/// so on. Depth beyond this limit fails validation.
pub const MAX_NESTING_DEPTH: usize = 10;

/// Validate a metadata map without modifying it
///
/// Rules:
/// - every key, at every nesting level, is a non-empty string
/// - nesting does not exceed [`MAX_NESTING_DEPTH`] levels
///
/// # Errors
///
/// Returns [`Error::InvalidMetadata`] naming the offending key or depth.
pub fn validate_metadata(metadata: &Metadata) -> Result<()> {
    validate_level(metadata, 1)
}

/// Validate, then return a normalized copy of a metadata map
///
/// Normalization renders every `Timestamp` value (at any depth) into its
/// canonical RFC 3339 string. Scalars and structure are otherwise unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidMetadata`] if validation fails; nothing is
/// returned partially normalized.
pub fn normalize_metadata(metadata: &Metadata) -> Result<Metadata> {
    validate_metadata(metadata)?;
    Ok(normalize_level(metadata))
}

fn validate_level(metadata: &Metadata, depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::InvalidMetadata(format!(
            "nesting exceeds {} levels",
            MAX_NESTING_DEPTH
        )));
    }
    for (key, value) in metadata {
        if key.is_empty() {
            return Err(Error::InvalidMetadata(
                "metadata keys must be non-empty strings".to_string(),
            ));
        }
        if let MetadataValue::Map(nested) = value {
            validate_level(nested, depth + 1)?;
        }
    }
    Ok(())
}

fn normalize_level(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect()
}

fn normalize_value(value: &MetadataValue) -> MetadataValue {
    match value {
        MetadataValue::Timestamp(t) => MetadataValue::String(canonical_timestamp(*t)),
        MetadataValue::Map(nested) => MetadataValue::Map(normalize_level(nested)),
        other => other.clone(),
    }
}
