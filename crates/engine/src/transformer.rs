//! In-process predicate transformer
//!
//! `PredicateTransformer` is the reference `CriteriaTransformer`: it turns
//! each criteria node into a boxed binding predicate (or a retained order-by
//! clause) and combines them into a [`CompiledQuery`] the indexed adapter
//! executes. It doubles as the conformance model for remote backends, which
//! produce their own native fragments through the same protocol.

use crate::query::{eval_condition, sort_bindings};
use bindery_core::{
    Binding, CriteriaTransformer, EntityDirection, EntityRef, FieldRef, Operand, Operator,
    OrderBy, WhereCondition,
};

/// A compiled binding predicate
pub type Predicate = Box<dyn Fn(&Binding) -> bool>;

/// One transformed criteria node
pub enum QueryFragment {
    /// AND-ed filter: entity, binding-type, or WHERE condition
    Filter(Predicate),
    /// An OR-group: matches are unioned into the filtered results
    OrGroup(Predicate),
    /// A retained order-by clause
    Order(OrderBy),
}

/// The engine-native query: predicates plus ordering
///
/// `limit`/`offset` stay on the criteria; the executing adapter applies
/// them after the pipeline.
#[derive(Default)]
pub struct CompiledQuery {
    /// Sequential AND filters, in criteria declaration order
    pub filters: Vec<Predicate>,
    /// OR-group predicates, each the conjunction of its conditions
    pub or_groups: Vec<Predicate>,
    /// Order-by clauses, in declaration order
    pub order_by: Vec<OrderBy>,
}

impl CompiledQuery {
    /// True if a binding passes every AND filter
    pub fn matches(&self, binding: &Binding) -> bool {
        self.filters.iter().all(|filter| filter(binding))
    }

    /// True if a binding matches any OR-group
    pub fn matches_any_or_group(&self, binding: &Binding) -> bool {
        self.or_groups.iter().any(|group| group(binding))
    }

    /// Sort bindings by the compiled order-by clauses
    pub fn sort(&self, bindings: &mut [Binding]) {
        sort_bindings(bindings, &self.order_by);
    }
}

/// Reference transformer producing in-process predicates
pub struct PredicateTransformer;

/// Pre-parse a condition so its predicate resolves the field once
fn compile_condition(condition: &WhereCondition) -> (FieldRef, Operator, Operand) {
    (
        FieldRef::parse(&condition.field),
        condition.operator,
        condition.operand.clone(),
    )
}

impl CriteriaTransformer for PredicateTransformer {
    type Fragment = QueryFragment;
    type Output = CompiledQuery;

    fn transform_entity(&self, entity: &EntityRef, direction: EntityDirection) -> QueryFragment {
        let entity = entity.clone();
        QueryFragment::Filter(Box::new(move |binding| match direction {
            EntityDirection::From => {
                binding.from_type() == entity.entity_type && binding.from_id() == entity.entity_id
            }
            EntityDirection::To => {
                binding.to_type() == entity.entity_type && binding.to_id() == entity.entity_id
            }
        }))
    }

    fn transform_binding_type(&self, binding_type: &str) -> QueryFragment {
        let binding_type = binding_type.to_string();
        QueryFragment::Filter(Box::new(move |binding| {
            binding.binding_type() == binding_type
        }))
    }

    fn transform_where(&self, condition: &WhereCondition) -> QueryFragment {
        let (field, operator, operand) = compile_condition(condition);
        QueryFragment::Filter(Box::new(move |binding| {
            eval_condition(&field, operator, &operand, binding)
        }))
    }

    fn transform_or_group(&self, group: &[WhereCondition]) -> QueryFragment {
        let compiled: Vec<(FieldRef, Operator, Operand)> =
            group.iter().map(compile_condition).collect();
        QueryFragment::OrGroup(Box::new(move |binding| {
            compiled
                .iter()
                .all(|(field, operator, operand)| eval_condition(field, *operator, operand, binding))
        }))
    }

    fn transform_order_by(&self, clause: &OrderBy) -> QueryFragment {
        QueryFragment::Order(clause.clone())
    }

    fn combine_filters(&self, fragments: Vec<QueryFragment>) -> CompiledQuery {
        let mut compiled = CompiledQuery::default();
        for fragment in fragments {
            match fragment {
                QueryFragment::Filter(predicate) => compiled.filters.push(predicate),
                QueryFragment::OrGroup(predicate) => compiled.or_groups.push(predicate),
                QueryFragment::Order(clause) => compiled.order_by.push(clause),
            }
        }
        compiled
    }
}
