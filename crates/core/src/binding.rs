//! Binding: the immutable relationship record
//!
//! A `Binding` connects two entities, identified by `(type, id)` pairs, under
//! a relationship type label, with versioned metadata.
//!
//! ## Invariants
//!
//! - Identity fields (`id`, both endpoints, `binding_type`) never change
//!   after creation.
//! - Any metadata change produces a *new* `Binding` value with the same
//!   identity fields and `created_at`, and a strictly advanced `updated_at`.
//!   Metadata mutation is copy-on-write, never in place.
//!
//! ## Interchange
//!
//! `BindingRecord` is the field-complete textual representation used by
//! adapters that serialize bindings. Timestamps are RFC 3339 with offset and
//! microsecond precision; binding timestamps are truncated to microseconds at
//! creation so the round-trip is lossless in every field.

use crate::error::{Error, Result};
use crate::metadata::validate_metadata;
use crate::value::{canonical_timestamp, Metadata};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque unique identifier of a binding
///
/// Generated on creation (UUID v4 text); immutable afterwards. Wrapped in a
/// newtype so ids cannot be confused with entity ids or type labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(String);

impl BindingId {
    /// Generate a fresh unique id
    pub fn generate() -> Self {
        BindingId(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id (e.g. read back from an adapter)
    pub fn new(id: impl Into<String>) -> Self {
        BindingId(id.into())
    }

    /// View as &str
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BindingId {
    fn from(id: &str) -> Self {
        BindingId(id.to_string())
    }
}

impl From<String> for BindingId {
    fn from(id: String) -> Self {
        BindingId(id)
    }
}

/// Current instant, truncated to microsecond precision
///
/// The interchange format carries microseconds, so bindings never hold
/// sub-microsecond precision that would be lost on round-trip.
pub(crate) fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

/// Immutable relationship record between two entities
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    id: BindingId,
    from_type: String,
    from_id: String,
    to_type: String,
    to_id: String,
    binding_type: String,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Binding {
    /// Create a new binding with a fresh id and current timestamps
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if the metadata fails validation;
    /// nothing is constructed in that case.
    pub fn create(
        from_type: impl Into<String>,
        from_id: impl Into<String>,
        to_type: impl Into<String>,
        to_id: impl Into<String>,
        binding_type: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Binding> {
        validate_metadata(&metadata)?;
        let now = now_micros();
        Ok(Binding {
            id: BindingId::generate(),
            from_type: from_type.into(),
            from_id: from_id.into(),
            to_type: to_type.into(),
            to_id: to_id.into(),
            binding_type: binding_type.into(),
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The binding's unique id
    pub fn id(&self) -> &BindingId {
        &self.id
    }

    /// Source endpoint entity type
    pub fn from_type(&self) -> &str {
        &self.from_type
    }

    /// Source endpoint entity id
    pub fn from_id(&self) -> &str {
        &self.from_id
    }

    /// Target endpoint entity type
    pub fn to_type(&self) -> &str {
        &self.to_type
    }

    /// Target endpoint entity id
    pub fn to_id(&self) -> &str {
        &self.to_id
    }

    /// Relationship type label
    pub fn binding_type(&self) -> &str {
        &self.binding_type
    }

    /// Metadata map
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Creation instant
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last-update instant
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Copy-on-write metadata
    // =========================================================================

    /// Replace the metadata wholesale, producing a new binding value
    ///
    /// Identity fields and `created_at` are unchanged; `updated_at` strictly
    /// advances even within a single clock tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if the new metadata is invalid.
    pub fn with_metadata(&self, metadata: Metadata) -> Result<Binding> {
        validate_metadata(&metadata)?;
        let mut updated = self.clone();
        updated.metadata = metadata;
        updated.updated_at = self.advanced_update_instant();
        Ok(updated)
    }

    /// Shallow key-wise merge into the current metadata
    ///
    /// New keys are added, existing keys overwritten; nested maps are
    /// replaced, not merged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if the merged map is invalid.
    pub fn merge_metadata(&self, partial: Metadata) -> Result<Binding> {
        let mut merged = self.metadata.clone();
        merged.extend(partial);
        self.with_metadata(merged)
    }

    fn advanced_update_instant(&self) -> DateTime<Utc> {
        let now = now_micros();
        if now > self.updated_at {
            now
        } else {
            self.updated_at
                .checked_add_signed(Duration::microseconds(1))
                .unwrap_or(self.updated_at)
        }
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    /// Exact directional endpoint match
    pub fn connects(&self, from_type: &str, from_id: &str, to_type: &str, to_id: &str) -> bool {
        self.from_type == from_type
            && self.from_id == from_id
            && self.to_type == to_type
            && self.to_id == to_id
    }

    /// True if the entity matches either endpoint
    pub fn involves(&self, entity_type: &str, entity_id: &str) -> bool {
        (self.from_type == entity_type && self.from_id == entity_id)
            || (self.to_type == entity_type && self.to_id == entity_id)
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Build the reverse binding: endpoints swapped, fresh id
    ///
    /// The relationship type and metadata are preserved unless overridden;
    /// `created_at` is preserved, `updated_at` is fresh.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if an override metadata map is
    /// invalid.
    pub fn reverse(
        &self,
        new_type: Option<&str>,
        new_metadata: Option<Metadata>,
    ) -> Result<Binding> {
        let metadata = match new_metadata {
            Some(m) => {
                validate_metadata(&m)?;
                m
            }
            None => self.metadata.clone(),
        };
        Ok(Binding {
            id: BindingId::generate(),
            from_type: self.to_type.clone(),
            from_id: self.to_id.clone(),
            to_type: self.from_type.clone(),
            to_id: self.from_id.clone(),
            binding_type: new_type.unwrap_or(&self.binding_type).to_string(),
            metadata,
            created_at: self.created_at,
            updated_at: now_micros(),
        })
    }

    // =========================================================================
    // Interchange
    // =========================================================================

    /// Render the field-complete interchange representation
    pub fn to_record(&self) -> BindingRecord {
        BindingRecord {
            id: self.id.as_str().to_string(),
            from_type: self.from_type.clone(),
            from_id: self.from_id.clone(),
            to_type: self.to_type.clone(),
            to_id: self.to_id.clone(),
            binding_type: self.binding_type.clone(),
            metadata: self.metadata.clone(),
            created_at: canonical_timestamp(self.created_at),
            updated_at: canonical_timestamp(self.updated_at),
        }
    }

    /// Rebuild a binding from its interchange representation
    ///
    /// # Errors
    ///
    /// Returns a wrapped persistence error if a timestamp field does not
    /// parse, and [`Error::InvalidMetadata`] if the metadata is invalid.
    pub fn from_record(record: BindingRecord) -> Result<Binding> {
        validate_metadata(&record.metadata)?;
        let created_at = parse_record_instant("created_at", &record.created_at)?;
        let updated_at = parse_record_instant("updated_at", &record.updated_at)?;
        Ok(Binding {
            id: BindingId::new(record.id),
            from_type: record.from_type,
            from_id: record.from_id,
            to_type: record.to_type,
            to_id: record.to_id,
            binding_type: record.binding_type,
            metadata: record.metadata,
            created_at,
            updated_at,
        })
    }
}

fn parse_record_instant(field: &str, text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            Error::persistence_msg("decode_record", format!("bad {} '{}': {}", field, text, e))
        })
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -[{}]-> {}:{} ({})",
            self.from_type, self.from_id, self.binding_type, self.to_type, self.to_id, self.id
        )
    }
}

/// Field-complete textual representation of a binding
///
/// The interchange format for adapters that store bindings as text or bytes.
/// Timestamps are RFC 3339 with offset; the `type` field name is preserved on
/// the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingRecord {
    /// Binding id
    pub id: String,
    /// Source endpoint type
    #[serde(rename = "fromType")]
    pub from_type: String,
    /// Source endpoint id
    #[serde(rename = "fromId")]
    pub from_id: String,
    /// Target endpoint type
    #[serde(rename = "toType")]
    pub to_type: String,
    /// Target endpoint id
    #[serde(rename = "toId")]
    pub to_id: String,
    /// Relationship type label
    #[serde(rename = "type")]
    pub binding_type: String,
    /// Metadata map
    pub metadata: Metadata,
    /// Creation instant, RFC 3339
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Last-update instant, RFC 3339
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}
