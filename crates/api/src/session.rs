//! Session consistency layer
//!
//! A `Session` wraps any adapter with a local write-through cache and a
//! pending-operation tracker, so a query issued immediately after a write
//! always observes that write, even when the backing adapter has
//! write-to-read latency.
//!
//! ## Lifecycle
//!
//! open (binds/unbinds/queries accepted, operations tracked)
//! -> flushed (every pending operation confirmed visible; tracker empty)
//! -> closed (cache and tracker cleared; the value stays usable)
//!
//! ## Merging
//!
//! The local cache is itself a reference engine instance, so the cache scan
//! evaluates criteria with exactly the adapter's semantics. A session query
//! runs the criteria against both, unions the result sets, de-duplicates by
//! id with the cache copy winning over a stale adapter copy, re-applies the
//! ordering clauses, and only then slices pagination.

use bindery_core::{
    Binding, BindingId, Entity, Metadata, PendingOperation, PersistenceAdapter, QueryCriteria,
    Result,
};
use bindery_engine::{dedup_by_id, sort_bindings, MemoryAdapter};
use chrono::Utc;
use tracing::debug;

/// Session tuning knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// Confirm visibility of each operation as it happens instead of
    /// accumulating a pending list for `flush`
    pub eager_flush: bool,
}

/// Caching overlay providing read-after-write visibility over an adapter
pub struct Session<A: PersistenceAdapter> {
    adapter: A,
    cache: MemoryAdapter,
    pending: Vec<PendingOperation>,
    config: SessionConfig,
}

impl<A: PersistenceAdapter> Session<A> {
    /// Open a session over an adapter with default configuration
    pub fn new(adapter: A) -> Self {
        Session::with_config(adapter, SessionConfig::default())
    }

    /// Open a session with explicit configuration
    pub fn with_config(adapter: A, config: SessionConfig) -> Self {
        Session {
            adapter,
            cache: MemoryAdapter::new(),
            pending: Vec::new(),
            config,
        }
    }

    /// Borrow the backing adapter
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Recover the backing adapter, dropping cache and tracker
    pub fn into_inner(self) -> A {
        self.adapter
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a binding, write it through, and track the operation
    ///
    /// Identity extraction and metadata validation go through the backing
    /// adapter, so the session stores exactly what the adapter accepts.
    ///
    /// # Errors
    ///
    /// Propagates extraction, validation, and store failures; the cache is
    /// only written after the adapter accepts the binding.
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
        self.adapter.store(binding.clone())?;
        self.cache.store(binding.clone())?;
        debug!(id = %binding.id(), %binding_type, "session bound entities");

        let operation = PendingOperation::create(binding.id().clone(), Utc::now());
        self.track(operation)?;
        Ok(binding)
    }

    /// Delete a binding, tolerating an adapter that no longer has it
    ///
    /// The binding is resolved from the cache first, the adapter second.
    /// An adapter `BindingNotFound` is swallowed (idempotent delete); any
    /// other adapter error surfaces. Cache removal happens regardless of
    /// the adapter outcome.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures other than not-found.
    pub fn unbind(&mut self, id: &BindingId) -> Result<()> {
        let resolved = match self.cache.find(id)? {
            Some(binding) => Some(binding),
            None => self.adapter.find(id)?,
        };
        debug!(id = %id, known = resolved.is_some(), "session unbinding");

        let outcome = match self.adapter.delete(id) {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        };

        // Cache removal always happens, even when the adapter failed.
        if self.cache.find(id)?.is_some() {
            self.cache.delete(id)?;
        }
        outcome?;

        let operation = PendingOperation::delete(id.clone(), Utc::now());
        self.track(operation)?;
        Ok(())
    }

    fn track(&mut self, operation: PendingOperation) -> Result<()> {
        if self.config.eager_flush {
            self.adapter
                .wait_for_visibility(std::slice::from_ref(&operation))
        } else {
            self.pending.push(operation);
            Ok(())
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Start a fluent query merging cache and adapter results
    pub fn query(&self) -> SessionQueryBuilder<'_, A> {
        SessionQueryBuilder {
            session: self,
            criteria: QueryCriteria::new(),
        }
    }

    /// Execute criteria against cache and adapter, merged and de-duplicated
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn execute(&self, criteria: &QueryCriteria) -> Result<Vec<Binding>> {
        let merged = self.merged_results(criteria)?;
        let offset = criteria.offset.unwrap_or(0);
        let limit = criteria.limit.unwrap_or(usize::MAX);
        Ok(merged.into_iter().skip(offset).take(limit).collect())
    }

    /// Count criteria matches over the merged, de-duplicated set
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn count(&self, criteria: &QueryCriteria) -> Result<usize> {
        Ok(self.merged_results(criteria)?.len())
    }

    /// Pagination applies to the merged set, so the sub-queries run
    /// unpaged and the slice happens after union + dedup + ordering.
    fn merged_results(&self, criteria: &QueryCriteria) -> Result<Vec<Binding>> {
        let mut unpaged = criteria.clone();
        unpaged.limit = None;
        unpaged.offset = None;

        // Cache first: on duplicate ids the cache copy wins.
        let mut merged = self.cache.execute_query(&unpaged)?;
        merged.extend(self.adapter.execute_query(&unpaged)?);
        let mut merged = dedup_by_id(merged);
        sort_bindings(&mut merged, &criteria.order_by);
        Ok(merged)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Wait until every pending operation is visible, then clear the tracker
    ///
    /// For an adapter with immediate visibility this is a no-op. The cache
    /// stays intact for future query merging; the tracker is cleared only
    /// after the adapter confirms.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's visibility failure; the tracker is left
    /// untouched in that case.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        match self.adapter.wait_for_visibility(&pending) {
            Ok(()) => {
                debug!(count = pending.len(), "session flushed");
                Ok(())
            }
            Err(error) => {
                self.pending = pending;
                Err(error)
            }
        }
    }

    /// Drop cache entries and pending operations without touching the adapter
    pub fn clear(&mut self) {
        self.cache.clear();
        self.pending.clear();
    }

    /// Flush, then clear
    ///
    /// # Errors
    ///
    /// Propagates the flush failure; nothing is cleared in that case.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.clear();
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// True if pending operations exist
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The operations issued but not yet confirmed visible
    pub fn pending_operations(&self) -> &[PendingOperation] {
        &self.pending
    }

    /// All cache contents, in insertion order (for tests and debugging)
    pub fn tracked_bindings(&self) -> Vec<Binding> {
        self.cache.all()
    }
}

/// Fluent query surface executing against a session's merged view
pub struct SessionQueryBuilder<'a, A: PersistenceAdapter> {
    session: &'a Session<A>,
    criteria: QueryCriteria,
}

impl<'a, A: PersistenceAdapter> SessionQueryBuilder<'a, A> {
    /// Filter by source endpoint, extracting through the adapter
    ///
    /// # Errors
    ///
    /// Propagates extraction failures.
    pub fn from_entity(mut self, entity: &dyn Entity) -> Result<Self> {
        let entity_type = self.session.adapter.extract_entity_type(entity)?;
        let entity_id = self.session.adapter.extract_entity_id(entity)?;
        self.criteria = self
            .criteria
            .from_entity(bindery_core::EntityRef::new(entity_type, entity_id));
        Ok(self)
    }

    /// Filter by target endpoint, extracting through the adapter
    ///
    /// # Errors
    ///
    /// Propagates extraction failures.
    pub fn to_entity(mut self, entity: &dyn Entity) -> Result<Self> {
        let entity_type = self.session.adapter.extract_entity_type(entity)?;
        let entity_id = self.session.adapter.extract_entity_id(entity)?;
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
    pub fn where_eq(
        mut self,
        field: impl Into<String>,
        value: impl Into<bindery_core::MetadataValue>,
    ) -> Self {
        self.criteria = self.criteria.where_eq(field, value);
        self
    }

    /// Add an OR-group of AND-ed conditions
    pub fn or_where(mut self, group: Vec<bindery_core::WhereCondition>) -> Self {
        self.criteria = self.criteria.or_where(group);
        self
    }

    /// Add an order-by clause
    pub fn order_by(
        mut self,
        field: impl Into<String>,
        direction: bindery_core::Direction,
    ) -> Self {
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

    /// Execute against the merged cache + adapter view
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn all(self) -> Result<Vec<Binding>> {
        self.session.execute(&self.criteria)
    }

    /// First result of the merged view
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn first(self) -> Result<Option<Binding>> {
        let narrowed = self.criteria.limit(1);
        Ok(self.session.execute(&narrowed)?.into_iter().next())
    }

    /// Count over the merged, de-duplicated set
    ///
    /// # Errors
    ///
    /// Propagates adapter failures.
    pub fn count(self) -> Result<usize> {
        self.session.count(&self.criteria)
    }
}
