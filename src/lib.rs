//! Bindery - embedded relationship store for typed entity bindings
//!
//! Bindery records typed, metadata-rich relationships ("bindings") between
//! opaque entities and queries them through a storage-agnostic criteria
//! model executed by pluggable backends.
//!
//! # Quick Start
//!
//! ```
//! use bindery::{Bindery, EntityRef, Metadata, MemoryAdapter, MetadataValue};
//!
//! # fn main() -> bindery::Result<()> {
//! let mut bindery = Bindery::new(MemoryAdapter::new());
//!
//! let user = EntityRef::new("User", "u1");
//! let org = EntityRef::new("Org", "o1");
//!
//! let mut metadata = Metadata::new();
//! metadata.insert("role".into(), MetadataValue::String("owner".into()));
//! bindery.bind(&user, &org, "member_of", metadata)?;
//!
//! let members = bindery
//!     .query()
//!     .binding_type("member_of")
//!     .where_eq("role", "owner")
//!     .all()?;
//! assert_eq!(members.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `bindery-core`: the data model (bindings, metadata, criteria), the
//!   transformer protocol, and the persistence contract
//! - `bindery-engine`: the reference in-process indexed adapter whose
//!   filter/order/paginate semantics define correctness for every backend
//! - `bindery-api`: the facade and the session consistency layer that
//!   bridges read-after-write visibility gaps

// Re-export the public API
pub use bindery_api::{Bindery, QueryBuilder, Session, SessionConfig, SessionQueryBuilder};
pub use bindery_core::{
    canonical_timestamp, normalize_metadata, parse_canonical_timestamp, validate_metadata,
    Binding, BindingId, BindingRecord, CriteriaTransformer, Direction, Entity, EntityDirection,
    EntityRef, Error, FieldRef, Metadata, MetadataValue, Operand, Operator, OperationKind,
    OrderBy, PendingOperation, PersistenceAdapter, QueryCriteria, Result, WhereCondition,
    MAX_NESTING_DEPTH,
};
pub use bindery_engine::{CompiledQuery, MemoryAdapter, PredicateTransformer};
