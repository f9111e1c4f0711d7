//! The persistence adapter contract
//!
//! `PersistenceAdapter` is the backend boundary: entity identity/type
//! extraction, metadata validation/normalization, CRUD, and criteria
//! execution/counting. Every backend, from the reference in-process engine
//! to network stores, implements this trait; correctness is defined by the
//! reference engine's filtering/ordering/pagination semantics.
//!
//! ## Mutation and concurrency
//!
//! Mutating methods take `&mut self`: the store is single-writer and carries
//! no internal locking. A caller embedding an adapter in a multi-threaded
//! runtime serializes mutating access itself (one session per logical unit
//! of work, or external mutual exclusion).
//!
//! ## Visibility
//!
//! `wait_for_visibility` is the one designated extension point for backends
//! with write-to-read latency. The default is an immediate-visibility no-op;
//! an eventually-consistent adapter overrides it with its own polling or
//! refresh strategy. No timeout or cancellation primitive exists for that
//! wait today.

use crate::binding::{Binding, BindingId};
use crate::criteria::QueryCriteria;
use crate::entity::Entity;
use crate::error::Result;
use crate::value::Metadata;
use chrono::{DateTime, Utc};

/// Kind of a pending session operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// A binding was created
    Create,
    /// A binding was deleted
    Delete,
}

/// A write the session has issued but not yet confirmed visible
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    /// What happened
    pub kind: OperationKind,
    /// The binding the operation touched
    pub id: BindingId,
    /// When the session issued it
    pub at: DateTime<Utc>,
}

impl PendingOperation {
    /// Record a create
    pub fn create(id: BindingId, at: DateTime<Utc>) -> Self {
        PendingOperation {
            kind: OperationKind::Create,
            id,
            at,
        }
    }

    /// Record a delete
    pub fn delete(id: BindingId, at: DateTime<Utc>) -> Self {
        PendingOperation {
            kind: OperationKind::Delete,
            id,
            at,
        }
    }
}

/// Backend contract for storing and querying bindings
pub trait PersistenceAdapter {
    /// Derive an entity's id
    ///
    /// The reference engine never fails here (it falls back to an
    /// identity-derived handle); adapters that require durable identity may
    /// return `EntityExtraction`.
    ///
    /// # Errors
    ///
    /// Returns `EntityExtraction` if no id can be derived.
    fn extract_entity_id(&self, entity: &dyn Entity) -> Result<String>;

    /// Derive an entity's type name
    ///
    /// # Errors
    ///
    /// Returns `EntityExtraction` if no type name can be derived.
    fn extract_entity_type(&self, entity: &dyn Entity) -> Result<String>;

    /// Validate a metadata map and return the adapter's normalized form
    ///
    /// Pure: the input is never mutated. Serializing adapters render
    /// timestamps to canonical text; the reference engine keeps typed
    /// instants and returns the map unchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` before any store mutation occurs.
    fn validate_and_normalize_metadata(&self, metadata: &Metadata) -> Result<Metadata>;

    /// Insert a new binding
    ///
    /// # Errors
    ///
    /// Returns a `Persistence` error for a duplicate id, and
    /// `InvalidMetadata` if the binding's metadata fails validation. A
    /// failure leaves the store and indexes untouched.
    fn store(&mut self, binding: Binding) -> Result<()>;

    /// Look up a binding by id
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error on backend failure.
    fn find(&self, id: &BindingId) -> Result<Option<Binding>>;

    /// All bindings with the entity at either endpoint
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error on backend failure.
    fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Binding>>;

    /// All bindings connecting two entities in the given direction
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error on backend failure.
    fn find_between_entities(
        &self,
        from_type: &str,
        from_id: &str,
        to_type: &str,
        to_id: &str,
        binding_type: Option<&str>,
    ) -> Result<Vec<Binding>>;

    /// Execute criteria with full filter/order/paginate semantics
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error on backend failure.
    fn execute_query(&self, criteria: &QueryCriteria) -> Result<Vec<Binding>>;

    /// Count criteria matches, ignoring `limit`/`offset`
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error on backend failure.
    fn count(&self, criteria: &QueryCriteria) -> Result<usize>;

    /// Replace a binding's metadata, producing a new value at the same key
    ///
    /// # Errors
    ///
    /// Returns `BindingNotFound` if the id is absent, `InvalidMetadata` if
    /// the new metadata fails validation.
    fn update_metadata(&mut self, id: &BindingId, metadata: Metadata) -> Result<Binding>;

    /// Delete a binding by id
    ///
    /// # Errors
    ///
    /// Returns `BindingNotFound` if the id is absent.
    fn delete(&mut self, id: &BindingId) -> Result<()>;

    /// Delete every binding involving an entity; returns the removed count
    ///
    /// Best-effort per matched id: a concurrently-removed id is skipped,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error on backend failure.
    fn delete_by_entity(&mut self, entity_type: &str, entity_id: &str) -> Result<usize>;

    /// Block until the given pending operations are visible to queries
    ///
    /// Default: immediate visibility, nothing to wait for. Adapters with
    /// write-to-read latency override this with polling or a backend-native
    /// refresh call.
    ///
    /// # Errors
    ///
    /// Returns a wrapped `Persistence` error if visibility cannot be
    /// confirmed.
    fn wait_for_visibility(&mut self, pending: &[PendingOperation]) -> Result<()> {
        let _ = pending;
        Ok(())
    }
}
