//! Core types and contracts for Bindery
//!
//! This crate defines the foundational model used throughout the system:
//! - Binding: immutable relationship record with versioned metadata
//! - BindingId: opaque unique binding identifier
//! - MetadataValue / Metadata: closed tagged union and ordered map
//! - Metadata validation and normalization rules
//! - Entity / EntityRef: opaque endpoints and the extraction capability
//! - QueryCriteria: composable, immutable query description
//! - CriteriaTransformer: the backend conversion protocol
//! - PersistenceAdapter: the backend boundary contract
//! - Error: the error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod binding;
pub mod criteria;
pub mod entity;
pub mod error;
pub mod metadata;
pub mod transform;
pub mod value;

// Re-export commonly used types at the crate root
pub use adapter::{OperationKind, PendingOperation, PersistenceAdapter};
pub use binding::{Binding, BindingId, BindingRecord};
pub use criteria::{
    Direction, FieldRef, Operand, Operator, OrderBy, QueryCriteria, WhereCondition,
};
pub use entity::{identity_handle, short_type_name, Entity, EntityRef};
pub use error::{BoxedCause, Error, Result};
pub use metadata::{normalize_metadata, validate_metadata, MAX_NESTING_DEPTH};
pub use transform::{CriteriaTransformer, EntityDirection};
pub use value::{canonical_timestamp, parse_canonical_timestamp, Metadata, MetadataValue};
