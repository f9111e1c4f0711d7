//! Facade: the convenience surface over any adapter
//!
//! The facade is syntactic sugar over the persistence contract. Every call
//! desugars to exactly one adapter call pattern:
//!
//! | Facade call | Adapter equivalent |
//! |-------------|--------------------|
//! | `bind(from, to, t, meta)` | extract + validate + `store(Binding)` |
//! | `unbind(id)` | `delete(id)` |
//! | `find(id)` | `find(id)` |
//! | `query().all()` | `execute_query(criteria)` |
//! | `query().count()` | `count(criteria)` |
//!
//! There is no caching and no visibility bridging here; for read-after-write
//! guarantees over an eventually-consistent adapter, use a
//! [`Session`](crate::Session).

use bindery_core::{
    Binding, BindingId, Direction, Entity, Metadata, MetadataValue, Operand, Operator,
    PersistenceAdapter, QueryCriteria, Result, WhereCondition,
};
use tracing::debug;

/// Convenience surface over a [`PersistenceAdapter`]
pub struct Bindery<A: PersistenceAdapter> {
    adapter: A,
}

impl<A: PersistenceAdapter> Bindery<A> {
    /// Wrap an adapter
    pub fn new(adapter: A) -> Self {
        Bindery { adapter }
    }

    /// Borrow the underlying adapter
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Recover the underlying adapter
    pub fn into_inner(self) -> A {
        self.adapter
    }

    /// Upgrade this facade into a session over the same adapter
    pub fn into_session(self) -> crate::Session<A> {
        crate::Session::new(self.adapter)
    }

    /// Create and store a binding between two entities
    ///
    /// Identity and type are extracted through the adapter; metadata is
    /// validated and normalized through the adapter before anything is
    /// stored.
    ///
    /// # Errors
    ///
    /// Propagates extraction, validation, and store failures; nothing is
    /// stored when any step fails.
    pub fn bind(
        &mut self,
        from: &dyn Entity,
        to: &dyn Entity,
        binding_type: &str,
        metadata: Metadata,
    ) -> Result<Binding> {
        let from_type = self.adapter.extract_entity_type(from)?;
        let from_id = self.adapter.extract_entity_id(from)?;
        let to_type = self.adapter.extract_entity_type(to)?;
        let to_id = self.adapter.extract_entity_id(to)?;
        let metadata = self.adapter.validate_and_normalize_metadata(&metadata)?;

        let binding = Binding::create(from_type, from_id, to_type, to_id, binding_type, metadata)?;
        debug!(id = %binding.id(), %binding_type, "binding entities");
        self.adapter.store(binding.clone())?;
        Ok(binding)
    }

    /// Remove a binding by id
    ///
    /// # Errors
    ///
    /// Returns `BindingNotFound` if the id is absent.
    pub fn unbind(&mut self, id: &BindingId) -> Result<()> {
        self.adapter.delete(id)
    }

    /// Look up a binding by id
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn find(&self, id: &BindingId) -> Result<Option<Binding>> {
        self.adapter.find(id)
    }

    /// All bindings involving an entity at either endpoint
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn find_by_entity(&self, entity: &dyn Entity) -> Result<Vec<Binding>> {
        let entity_type = self.adapter.extract_entity_type(entity)?;
        let entity_id = self.adapter.extract_entity_id(entity)?;
        self.adapter.find_by_entity(&entity_type, &entity_id)
    }

    /// All bindings connecting two entities in the given direction
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn find_between(
        &self,
        from: &dyn Entity,
        to: &dyn Entity,
        binding_type: Option<&str>,
    ) -> Result<Vec<Binding>> {
        let from_type = self.adapter.extract_entity_type(from)?;
        let from_id = self.adapter.extract_entity_id(from)?;
        let to_type = self.adapter.extract_entity_type(to)?;
        let to_id = self.adapter.extract_entity_id(to)?;
        self.adapter
            .find_between_entities(&from_type, &from_id, &to_type, &to_id, binding_type)
    }

    /// Replace a binding's metadata
    ///
    /// # Errors
    ///
    /// Returns `BindingNotFound` if the id is absent, `InvalidMetadata` on
    /// validation failure.
    pub fn update_metadata(&mut self, id: &BindingId, metadata: Metadata) -> Result<Binding> {
        let metadata = self.adapter.validate_and_normalize_metadata(&metadata)?;
        self.adapter.update_metadata(id, metadata)
    }

    /// Start a fluent query against the adapter
    pub fn query(&self) -> QueryBuilder<'_, A> {
        QueryBuilder {
            adapter: &self.adapter,
            criteria: QueryCriteria::new(),
        }
    }
}

/// Fluent query surface executing against an adapter
///
/// Criteria methods mirror [`QueryCriteria`]'s persistent builder; the
/// terminal methods hand the finished criteria to the adapter.
pub struct QueryBuilder<'a, A: PersistenceAdapter> {
    adapter: &'a A,
    criteria: QueryCriteria,
}

impl<'a, A: PersistenceAdapter> QueryBuilder<'a, A> {
    /// Filter by source endpoint
    pub fn from_entity(mut self, entity: &dyn Entity) -> Result<Self> {
        let entity_type = self.adapter.extract_entity_type(entity)?;
        let entity_id = self.adapter.extract_entity_id(entity)?;
        self.criteria = self
            .criteria
            .from_entity(bindery_core::EntityRef::new(entity_type, entity_id));
        Ok(self)
    }

    /// Filter by target endpoint
    pub fn to_entity(mut self, entity: &dyn Entity) -> Result<Self> {
        let entity_type = self.adapter.extract_entity_type(entity)?;
        let entity_id = self.adapter.extract_entity_id(entity)?;
        self.criteria = self
            .criteria
            .to_entity(bindery_core::EntityRef::new(entity_type, entity_id));
        Ok(self)
    }

    /// Filter by binding type
    pub fn binding_type(mut self, binding_type: impl Into<String>) -> Self {
        self.criteria = self.criteria.binding_type(binding_type);
        self
    }

    /// Equality shorthand
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.criteria = self.criteria.where_eq(field, value);
        self
    }

    /// Condition with an explicit operator
    pub fn where_op(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        operand: Operand,
    ) -> Self {
        self.criteria = self.criteria.where_op(field, operator, operand);
        self
    }

    /// `field in (values)`
    pub fn where_in(mut self, field: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        self.criteria = self.criteria.where_in(field, values);
        self
    }

    /// `field not_in (values)`
    pub fn where_not_in(mut self, field: impl Into<String>, values: Vec<MetadataValue>) -> Self {
        self.criteria = self.criteria.where_not_in(field, values);
        self
    }

    /// Inclusive range condition
    pub fn where_between(
        mut self,
        field: impl Into<String>,
        min: impl Into<MetadataValue>,
        max: impl Into<MetadataValue>,
    ) -> Self {
        self.criteria = self.criteria.where_between(field, min, max);
        self
    }

    /// Presence condition
    pub fn where_exists(mut self, field: impl Into<String>) -> Self {
        self.criteria = self.criteria.where_exists(field);
        self
    }

    /// Null-or-absent condition
    pub fn where_null(mut self, field: impl Into<String>) -> Self {
        self.criteria = self.criteria.where_null(field);
        self
    }

    /// Present-and-non-null condition
    pub fn where_not_null(mut self, field: impl Into<String>) -> Self {
        self.criteria = self.criteria.where_not_null(field);
        self
    }

    /// Add an OR-group of AND-ed conditions
    pub fn or_where(mut self, group: Vec<WhereCondition>) -> Self {
        self.criteria = self.criteria.or_where(group);
        self
    }

    /// Add an order-by clause
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.criteria = self.criteria.order_by(field, direction);
        self
    }

    /// Cap the result count
    pub fn limit(mut self, limit: usize) -> Self {
        self.criteria = self.criteria.limit(limit);
        self
    }

    /// Skip leading results
    pub fn offset(mut self, offset: usize) -> Self {
        self.criteria = self.criteria.offset(offset);
        self
    }

    /// The criteria built so far
    pub fn criteria(&self) -> &QueryCriteria {
        &self.criteria
    }

    /// Execute and return all matches
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn all(self) -> Result<Vec<Binding>> {
        self.adapter.execute_query(&self.criteria)
    }

    /// Execute and return the first match
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn first(self) -> Result<Option<Binding>> {
        let narrowed = self.criteria.limit(1);
        Ok(self.adapter.execute_query(&narrowed)?.into_iter().next())
    }

    /// Count matches, ignoring pagination
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn count(self) -> Result<usize> {
        self.adapter.count(&self.criteria)
    }
}
