//! Criteria transformation: the backend conversion protocol
//!
//! A backend implements one [`CriteriaTransformer`] that turns each abstract
//! criteria node into whatever native fragment the backend executes (an
//! in-process predicate, a remote filter clause, a query-DSL object), plus a
//! merge step that combines the per-node fragments into the final native
//! query. The executing adapter then runs that native structure and wraps
//! rows back into `Binding` values.
//!
//! Dispatch is double: each node exposes `transform(&transformer)` that
//! delegates to the node-specific transformer method, and
//! [`QueryCriteria::transform`] walks every node in declaration order before
//! handing the fragments to `combine_filters`.
//!
//! Nodes carry no hidden memoization state; transforms recompute on each
//! call. Pagination (`limit`/`offset`) does not pass through the
//! transformer: the executing adapter applies it after `combine_filters`.

use crate::criteria::{OrderBy, QueryCriteria, WhereCondition};
use crate::entity::EntityRef;

/// Which endpoint an entity filter applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityDirection {
    /// Source endpoint (`fromType`/`fromId`)
    From,
    /// Target endpoint (`toType`/`toId`)
    To,
}

/// Backend conversion protocol for criteria nodes
///
/// `Fragment` is the per-node native representation; `Output` is the
/// combined native query.
pub trait CriteriaTransformer {
    /// Per-node native representation
    type Fragment;
    /// Combined native query
    type Output;

    /// Convert an endpoint filter
    fn transform_entity(&self, entity: &EntityRef, direction: EntityDirection) -> Self::Fragment;

    /// Convert the binding-type filter
    fn transform_binding_type(&self, binding_type: &str) -> Self::Fragment;

    /// Convert a single WHERE condition
    fn transform_where(&self, condition: &WhereCondition) -> Self::Fragment;

    /// Convert an OR-group of AND-ed conditions
    ///
    /// The fragment must preserve additive-union semantics: the group
    /// matches against the full unfiltered candidate set and its matches
    /// are unioned into the AND-filtered results.
    fn transform_or_group(&self, group: &[WhereCondition]) -> Self::Fragment;

    /// Convert an order-by clause
    fn transform_order_by(&self, clause: &OrderBy) -> Self::Fragment;

    /// Merge per-node fragments into the final native query
    ///
    /// Fragments arrive in criteria declaration order: entity filters,
    /// binding type, WHERE conditions, OR-groups, order-by clauses.
    fn combine_filters(&self, fragments: Vec<Self::Fragment>) -> Self::Output;
}

impl EntityRef {
    /// Double dispatch into [`CriteriaTransformer::transform_entity`]
    pub fn transform<T: CriteriaTransformer>(
        &self,
        transformer: &T,
        direction: EntityDirection,
    ) -> T::Fragment {
        transformer.transform_entity(self, direction)
    }
}

impl WhereCondition {
    /// Double dispatch into [`CriteriaTransformer::transform_where`]
    pub fn transform<T: CriteriaTransformer>(&self, transformer: &T) -> T::Fragment {
        transformer.transform_where(self)
    }
}

impl OrderBy {
    /// Double dispatch into [`CriteriaTransformer::transform_order_by`]
    pub fn transform<T: CriteriaTransformer>(&self, transformer: &T) -> T::Fragment {
        transformer.transform_order_by(self)
    }
}

impl QueryCriteria {
    /// Convert the whole criteria into a backend-native query
    ///
    /// Walks every node in declaration order and delegates the merge to
    /// [`CriteriaTransformer::combine_filters`]. `limit`/`offset` are left
    /// for the executing adapter.
    pub fn transform<T: CriteriaTransformer>(&self, transformer: &T) -> T::Output {
        let mut fragments = Vec::new();
        if let Some(from) = &self.from {
            fragments.push(from.transform(transformer, EntityDirection::From));
        }
        if let Some(to) = &self.to {
            fragments.push(to.transform(transformer, EntityDirection::To));
        }
        if let Some(binding_type) = &self.binding_type {
            fragments.push(transformer.transform_binding_type(binding_type));
        }
        for condition in &self.conditions {
            fragments.push(condition.transform(transformer));
        }
        for group in &self.or_groups {
            fragments.push(transformer.transform_or_group(group));
        }
        for clause in &self.order_by {
            fragments.push(clause.transform(transformer));
        }
        transformer.combine_filters(fragments)
    }
}
