//! Reference indexed adapter
//!
//! `MemoryAdapter` is the in-process implementation of the persistence
//! contract and the semantic reference for every other backend: filtering,
//! ordering, and pagination behave here exactly as the contract requires,
//! and remote adapters must reproduce this behavior.
//!
//! ## Storage layout
//!
//! - main store: binding id to the binding plus its insertion sequence
//! - `by_seq`: insertion-order walk of the store
//! - `entity_index`: `(entity_type, entity_id)` to the ordered set of
//!   insertion sequences covering *both* endpoints of every binding
//! - `type_index`: binding type to the ordered set of insertion sequences
//!
//! Every stored binding appears in both indexes under its current field
//! values and only there; deleting the last member of an index entry removes
//! the entry itself so memory stays bounded.
//!
//! ## Concurrency
//!
//! Single-writer, no internal locking. Mutating methods take `&mut self`;
//! callers embedding the adapter in a multi-threaded runtime serialize
//! access themselves.

use crate::query::dedup_by_id;
use crate::transformer::{CompiledQuery, PredicateTransformer};
use bindery_core::{
    identity_handle, short_type_name, validate_metadata, Binding, BindingId, Entity, Error,
    Metadata, PersistenceAdapter, QueryCriteria, Result,
};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

struct StoredBinding {
    seq: u64,
    binding: Binding,
}

/// In-process indexed binding store
#[derive(Default)]
pub struct MemoryAdapter {
    store: FxHashMap<BindingId, StoredBinding>,
    by_seq: BTreeMap<u64, BindingId>,
    entity_index: FxHashMap<(String, String), BTreeSet<u64>>,
    type_index: FxHashMap<String, BTreeSet<u64>>,
    next_seq: u64,
}

impl MemoryAdapter {
    /// Create an empty adapter
    pub fn new() -> Self {
        MemoryAdapter::default()
    }

    /// Number of stored bindings
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All bindings in insertion order
    pub fn all(&self) -> Vec<Binding> {
        self.by_seq
            .values()
            .filter_map(|id| self.store.get(id).map(|stored| stored.binding.clone()))
            .collect()
    }

    /// Drop every binding and index entry
    pub fn clear(&mut self) {
        self.store.clear();
        self.by_seq.clear();
        self.entity_index.clear();
        self.type_index.clear();
    }

    /// Diagnostic: verify the index invariant
    ///
    /// True when every sequence reachable from either index resolves to a
    /// stored binding carrying those field values, and every stored binding
    /// is reachable from both indexes under its current field values.
    pub fn index_is_consistent(&self) -> bool {
        for ((entity_type, entity_id), seqs) in &self.entity_index {
            if seqs.is_empty() {
                return false;
            }
            for seq in seqs {
                match self.by_seq.get(seq).and_then(|id| self.store.get(id)) {
                    Some(stored) => {
                        if !stored.binding.involves(entity_type, entity_id) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
        }
        for (binding_type, seqs) in &self.type_index {
            if seqs.is_empty() {
                return false;
            }
            for seq in seqs {
                match self.by_seq.get(seq).and_then(|id| self.store.get(id)) {
                    Some(stored) => {
                        if stored.binding.binding_type() != binding_type {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
        }
        for stored in self.store.values() {
            let b = &stored.binding;
            let from = (b.from_type().to_string(), b.from_id().to_string());
            let to = (b.to_type().to_string(), b.to_id().to_string());
            let in_from = self
                .entity_index
                .get(&from)
                .is_some_and(|seqs| seqs.contains(&stored.seq));
            let in_to = self
                .entity_index
                .get(&to)
                .is_some_and(|seqs| seqs.contains(&stored.seq));
            let in_type = self
                .type_index
                .get(b.binding_type())
                .is_some_and(|seqs| seqs.contains(&stored.seq));
            if !in_from || !in_to || !in_type {
                return false;
            }
        }
        true
    }

    // =========================================================================
    // Index maintenance
    // =========================================================================

    fn index(&mut self, seq: u64, binding: &Binding) {
        self.entity_index
            .entry((binding.from_type().to_string(), binding.from_id().to_string()))
            .or_default()
            .insert(seq);
        self.entity_index
            .entry((binding.to_type().to_string(), binding.to_id().to_string()))
            .or_default()
            .insert(seq);
        self.type_index
            .entry(binding.binding_type().to_string())
            .or_default()
            .insert(seq);
    }

    fn unindex(&mut self, seq: u64, binding: &Binding) {
        let from = (binding.from_type().to_string(), binding.from_id().to_string());
        let to = (binding.to_type().to_string(), binding.to_id().to_string());
        remove_index_entry(&mut self.entity_index, &from, seq);
        remove_index_entry(&mut self.entity_index, &to, seq);
        remove_index_entry(&mut self.type_index, binding.binding_type(), seq);
    }

    fn remove_by_id(&mut self, id: &BindingId) -> Option<Binding> {
        let stored = self.store.remove(id)?;
        self.by_seq.remove(&stored.seq);
        self.unindex(stored.seq, &stored.binding);
        Some(stored.binding)
    }

    // =========================================================================
    // Query pipeline
    // =========================================================================

    /// Index-assisted candidate narrowing for from/to/type filters
    ///
    /// Entity index entries cover either endpoint, so this yields a
    /// superset; the compiled entity predicates re-filter exactly.
    fn narrowed_seqs(&self, criteria: &QueryCriteria) -> Vec<u64> {
        let mut sets: Vec<&BTreeSet<u64>> = Vec::new();
        if let Some(from) = &criteria.from {
            match self
                .entity_index
                .get(&(from.entity_type.clone(), from.entity_id.clone()))
            {
                Some(seqs) => sets.push(seqs),
                None => return Vec::new(),
            }
        }
        if let Some(to) = &criteria.to {
            match self
                .entity_index
                .get(&(to.entity_type.clone(), to.entity_id.clone()))
            {
                Some(seqs) => sets.push(seqs),
                None => return Vec::new(),
            }
        }
        if let Some(binding_type) = &criteria.binding_type {
            match self.type_index.get(binding_type) {
                Some(seqs) => sets.push(seqs),
                None => return Vec::new(),
            }
        }

        match sets.split_first() {
            None => self.by_seq.keys().copied().collect(),
            Some((first, rest)) => first
                .iter()
                .filter(|seq| rest.iter().all(|set| set.contains(seq)))
                .copied()
                .collect(),
        }
    }

    fn binding_for_seq(&self, seq: u64) -> Option<&Binding> {
        self.by_seq
            .get(&seq)
            .and_then(|id| self.store.get(id))
            .map(|stored| &stored.binding)
    }

    /// Full pipeline minus the pagination slice
    fn run_pipeline(&self, criteria: &QueryCriteria, compiled: &CompiledQuery) -> Vec<Binding> {
        let mut results: Vec<Binding> = self
            .narrowed_seqs(criteria)
            .into_iter()
            .filter_map(|seq| self.binding_for_seq(seq))
            .filter(|binding| compiled.matches(binding))
            .cloned()
            .collect();

        // OR-groups match against the full unfiltered store, and their
        // matches are unioned in, not intersected.
        if !compiled.or_groups.is_empty() {
            for id in self.by_seq.values() {
                if let Some(stored) = self.store.get(id) {
                    if compiled.matches_any_or_group(&stored.binding) {
                        results.push(stored.binding.clone());
                    }
                }
            }
            results = dedup_by_id(results);
        }

        compiled.sort(&mut results);
        results
    }
}

fn remove_index_entry<K: std::hash::Hash + Eq, Q>(
    index: &mut FxHashMap<K, BTreeSet<u64>>,
    key: &Q,
    seq: u64,
) where
    K: std::borrow::Borrow<Q>,
    Q: std::hash::Hash + Eq + ?Sized,
{
    if let Some(seqs) = index.get_mut(key) {
        seqs.remove(&seq);
        if seqs.is_empty() {
            index.remove(key);
        }
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn extract_entity_id(&self, entity: &dyn Entity) -> Result<String> {
        Ok(entity.entity_id().unwrap_or_else(|| identity_handle(entity)))
    }

    fn extract_entity_type(&self, entity: &dyn Entity) -> Result<String> {
        Ok(entity
            .entity_type()
            .unwrap_or_else(|| short_type_name(entity.nominal_type()).to_string()))
    }

    fn validate_and_normalize_metadata(&self, metadata: &Metadata) -> Result<Metadata> {
        // The reference engine keeps typed instants internally, so
        // normalization is validation plus a copy.
        validate_metadata(metadata)?;
        Ok(metadata.clone())
    }

    fn store(&mut self, binding: Binding) -> Result<()> {
        if self.store.contains_key(binding.id()) {
            return Err(Error::persistence_msg(
                "store",
                format!("duplicate binding id {}", binding.id()),
            ));
        }
        validate_metadata(binding.metadata())?;

        let seq = self.next_seq;
        self.next_seq += 1;
        debug!(id = %binding.id(), seq, "storing binding");

        self.index(seq, &binding);
        self.by_seq.insert(seq, binding.id().clone());
        self.store
            .insert(binding.id().clone(), StoredBinding { seq, binding });
        Ok(())
    }

    fn find(&self, id: &BindingId) -> Result<Option<Binding>> {
        Ok(self.store.get(id).map(|stored| stored.binding.clone()))
    }

    fn find_by_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Binding>> {
        let key = (entity_type.to_string(), entity_id.to_string());
        let Some(seqs) = self.entity_index.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(seqs
            .iter()
            .filter_map(|seq| self.binding_for_seq(*seq))
            .cloned()
            .collect())
    }

    fn find_between_entities(
        &self,
        from_type: &str,
        from_id: &str,
        to_type: &str,
        to_id: &str,
        binding_type: Option<&str>,
    ) -> Result<Vec<Binding>> {
        Ok(self
            .by_seq
            .values()
            .filter_map(|id| self.store.get(id))
            .map(|stored| &stored.binding)
            .filter(|binding| binding.connects(from_type, from_id, to_type, to_id))
            .filter(|binding| binding_type.map_or(true, |t| binding.binding_type() == t))
            .cloned()
            .collect())
    }

    fn execute_query(&self, criteria: &QueryCriteria) -> Result<Vec<Binding>> {
        let compiled = criteria.transform(&PredicateTransformer);
        let results = self.run_pipeline(criteria, &compiled);

        let offset = criteria.offset.unwrap_or(0);
        let limit = criteria.limit.unwrap_or(usize::MAX);
        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    fn count(&self, criteria: &QueryCriteria) -> Result<usize> {
        let compiled = criteria.transform(&PredicateTransformer);
        Ok(self.run_pipeline(criteria, &compiled).len())
    }

    fn update_metadata(&mut self, id: &BindingId, metadata: Metadata) -> Result<Binding> {
        let stored = self
            .store
            .get(id)
            .ok_or_else(|| Error::BindingNotFound(id.clone()))?;

        // Validation happens before any mutation; identity fields are
        // immutable so the indexes stay untouched.
        let updated = stored.binding.with_metadata(metadata)?;
        debug!(id = %id, "replacing binding metadata");

        let seq = stored.seq;
        self.store.insert(
            id.clone(),
            StoredBinding {
                seq,
                binding: updated.clone(),
            },
        );
        Ok(updated)
    }

    fn delete(&mut self, id: &BindingId) -> Result<()> {
        match self.remove_by_id(id) {
            Some(_) => {
                debug!(id = %id, "deleted binding");
                Ok(())
            }
            None => Err(Error::BindingNotFound(id.clone())),
        }
    }

    fn delete_by_entity(&mut self, entity_type: &str, entity_id: &str) -> Result<usize> {
        let key = (entity_type.to_string(), entity_id.to_string());
        let ids: Vec<BindingId> = self
            .entity_index
            .get(&key)
            .map(|seqs| {
                seqs.iter()
                    .filter_map(|seq| self.by_seq.get(seq).cloned())
                    .collect()
            })
            .unwrap_or_default();

        // Best effort per matched id: an id already gone is skipped.
        let mut removed = 0;
        for id in ids {
            if self.remove_by_id(&id).is_some() {
                removed += 1;
            }
        }
        debug!(entity_type, entity_id, removed, "deleted bindings by entity");
        Ok(removed)
    }
}
