//! Condition evaluation, value comparison, ordering, de-duplication
//!
//! These functions define the reference query semantics. The indexed
//! adapter, the compiled predicate set, and the session layer's merged
//! results all evaluate through here, so every surface reproduces the same
//! filtering and ordering behavior.
//!
//! ## Comparison rules
//!
//! - `Int` and `Float` compare numerically across the two variants.
//! - Strings compare lexicographically, timestamps chronologically.
//! - Values of incomparable types never satisfy an ordering operator, and
//!   order-by treats them as ties.
//! - An absent field sorts before any present value.
//!
//! ## Absence rules
//!
//! `Ne` and `NotIn` match when the field is absent (absent is "not that
//! value"); presence itself is tested with the explicit `Exists`, `Null`,
//! and `NotNull` operators. `Null` matches absent-or-null, `NotNull`
//! matches present-and-non-null.

use bindery_core::{
    Binding, Direction, FieldRef, MetadataValue, Operand, Operator, OrderBy, WhereCondition,
};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

/// Compare two metadata values, if they are comparable
pub fn compare_values(a: &MetadataValue, b: &MetadataValue) -> Option<Ordering> {
    match (a, b) {
        (MetadataValue::Null, MetadataValue::Null) => Some(Ordering::Equal),
        (MetadataValue::Bool(x), MetadataValue::Bool(y)) => Some(x.cmp(y)),
        (MetadataValue::Int(x), MetadataValue::Int(y)) => Some(x.cmp(y)),
        (MetadataValue::Float(x), MetadataValue::Float(y)) => x.partial_cmp(y),
        (MetadataValue::Int(x), MetadataValue::Float(y)) => (*x as f64).partial_cmp(y),
        (MetadataValue::Float(x), MetadataValue::Int(y)) => x.partial_cmp(&(*y as f64)),
        (MetadataValue::String(x), MetadataValue::String(y)) => Some(x.cmp(y)),
        (MetadataValue::Timestamp(x), MetadataValue::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Semantic equality in query position
///
/// `Int(1)` equals `Float(1.0)` here; typed equality on `MetadataValue`
/// itself stays strict. Maps fall back to structural equality.
pub fn values_equal(a: &MetadataValue, b: &MetadataValue) -> bool {
    a == b || compare_values(a, b) == Some(Ordering::Equal)
}

/// Evaluate one WHERE condition against a binding
///
/// The field is pre-resolved by the caller so compiled predicates parse it
/// once. An operand whose shape does not fit the operator never matches.
pub fn eval_condition(
    field: &FieldRef,
    operator: Operator,
    operand: &Operand,
    binding: &Binding,
) -> bool {
    let value = field.resolve(binding);
    match operator {
        Operator::Eq => match (&value, operand) {
            (Some(v), Operand::One(expected)) => values_equal(v, expected),
            _ => false,
        },
        Operator::Ne => match operand {
            Operand::One(expected) => match &value {
                Some(v) => !values_equal(v, expected),
                None => true,
            },
            _ => false,
        },
        Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
            match (&value, operand) {
                (Some(v), Operand::One(expected)) => compare_values(v, expected)
                    .map_or(false, |ord| ordering_satisfies(operator, ord)),
                _ => false,
            }
        }
        Operator::In => match (&value, operand) {
            (Some(v), Operand::Many(set)) => set.iter().any(|candidate| values_equal(v, candidate)),
            _ => false,
        },
        Operator::NotIn => match operand {
            Operand::Many(set) => match &value {
                Some(v) => !set.iter().any(|candidate| values_equal(v, candidate)),
                None => true,
            },
            _ => false,
        },
        Operator::Between => match (&value, operand) {
            (Some(v), Operand::Range(min, max)) => {
                let above_min =
                    matches!(compare_values(v, min), Some(Ordering::Greater | Ordering::Equal));
                let below_max =
                    matches!(compare_values(v, max), Some(Ordering::Less | Ordering::Equal));
                above_min && below_max
            }
            _ => false,
        },
        Operator::Exists => value.is_some(),
        Operator::Null => match &value {
            Some(v) => v.is_null(),
            None => true,
        },
        Operator::NotNull => match &value {
            Some(v) => !v.is_null(),
            None => false,
        },
    }
}

fn ordering_satisfies(operator: Operator, ord: Ordering) -> bool {
    match operator {
        Operator::Gt => ord == Ordering::Greater,
        Operator::Lt => ord == Ordering::Less,
        Operator::Gte => ord != Ordering::Less,
        Operator::Lte => ord != Ordering::Greater,
        _ => false,
    }
}

/// Evaluate a raw condition (parses the field on each call)
pub fn condition_matches(condition: &WhereCondition, binding: &Binding) -> bool {
    let field = FieldRef::parse(&condition.field);
    eval_condition(&field, condition.operator, &condition.operand, binding)
}

/// Evaluate an AND-ed condition group
pub fn group_matches(group: &[WhereCondition], binding: &Binding) -> bool {
    group.iter().all(|condition| condition_matches(condition, binding))
}

/// Sort bindings by the order-by clauses
///
/// Each clause applies in declaration order; ties fall through to the next
/// clause. The sort is stable, so exhausted clauses leave the incoming
/// order, which for the reference pipeline is insertion order.
pub fn sort_bindings(bindings: &mut [Binding], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    let clauses: Vec<(FieldRef, Direction)> = order_by
        .iter()
        .map(|clause| (FieldRef::parse(&clause.field), clause.direction))
        .collect();
    bindings.sort_by(|a, b| {
        for (field, direction) in &clauses {
            let ordering = ordering_with_absent(field.resolve(a).as_ref(), field.resolve(b).as_ref());
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Order two optional field values: absent sorts before any present value
fn ordering_with_absent(a: Option<&MetadataValue>, b: Option<&MetadataValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
    }
}

/// De-duplicate bindings by id, first occurrence wins
pub fn dedup_by_id(bindings: Vec<Binding>) -> Vec<Binding> {
    let mut seen = FxHashSet::default();
    bindings
        .into_iter()
        .filter(|binding| seen.insert(binding.id().clone()))
        .collect()
}
