//! Reference indexed query-execution engine for Bindery
//!
//! This crate implements the persistence contract in process:
//! - `MemoryAdapter`: the indexed store with full filter/order/paginate
//!   semantics; the correctness reference every other backend must match
//! - `PredicateTransformer` / `CompiledQuery`: the reference
//!   `CriteriaTransformer`, compiling criteria into an in-process predicate
//!   set
//! - `query`: the shared evaluation functions (comparison, condition and
//!   group matching, ordering, de-duplication)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod query;
pub mod transformer;

pub use memory::MemoryAdapter;
pub use query::{
    compare_values, condition_matches, dedup_by_id, eval_condition, group_matches, sort_bindings,
    values_equal,
};
pub use transformer::{CompiledQuery, Predicate, PredicateTransformer, QueryFragment};
