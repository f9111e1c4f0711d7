//! Query pipeline semantics
//!
//! Covers the behavior every backend must reproduce: index-assisted
//! narrowing, sequential WHERE filtering, additive OR-union, stable
//! multi-clause ordering, and pagination slicing.

use bindery_core::{
    Binding, Direction, EntityRef, Metadata, MetadataValue, PersistenceAdapter, QueryCriteria,
    WhereCondition,
};
use bindery_engine::MemoryAdapter;

fn meta(entries: &[(&str, MetadataValue)]) -> Metadata {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn store_binding(
    adapter: &mut MemoryAdapter,
    from_id: &str,
    to_id: &str,
    binding_type: &str,
    metadata: Metadata,
) -> Binding {
    let binding =
        Binding::create("User", from_id, "Org", to_id, binding_type, metadata).unwrap();
    adapter.store(binding.clone()).unwrap();
    binding
}

// =============================================================================
// Entity / type narrowing
// =============================================================================

#[test]
fn from_and_type_filters_compose() {
    let mut adapter = MemoryAdapter::new();
    let member = store_binding(&mut adapter, "u1", "o1", "member_of", Metadata::new());
    let _admin = store_binding(&mut adapter, "u1", "o1", "admin_of", Metadata::new());

    let with_type = QueryCriteria::new()
        .from_entity(EntityRef::new("User", "u1"))
        .binding_type("member_of");
    assert_eq!(adapter.execute_query(&with_type).unwrap(), vec![member]);

    let without_type = QueryCriteria::new().from_entity(EntityRef::new("User", "u1"));
    assert_eq!(adapter.execute_query(&without_type).unwrap().len(), 2);
}

#[test]
fn from_and_to_filters_intersect() {
    let mut adapter = MemoryAdapter::new();
    let matching = store_binding(&mut adapter, "u1", "o1", "member_of", Metadata::new());
    store_binding(&mut adapter, "u1", "o2", "member_of", Metadata::new());
    store_binding(&mut adapter, "u2", "o1", "member_of", Metadata::new());

    let criteria = QueryCriteria::new()
        .from_entity(EntityRef::new("User", "u1"))
        .to_entity(EntityRef::new("Org", "o1"));
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![matching]);
}

#[test]
fn unknown_entity_short_circuits_to_empty() {
    let mut adapter = MemoryAdapter::new();
    store_binding(&mut adapter, "u1", "o1", "member_of", Metadata::new());

    let criteria = QueryCriteria::new().from_entity(EntityRef::new("User", "nobody"));
    assert!(adapter.execute_query(&criteria).unwrap().is_empty());
    assert_eq!(adapter.count(&criteria).unwrap(), 0);
}

// =============================================================================
// WHERE conditions
// =============================================================================

#[test]
fn conditions_apply_sequentially() {
    let mut adapter = MemoryAdapter::new();
    let both = store_binding(
        &mut adapter,
        "u1",
        "o1",
        "member_of",
        meta(&[
            ("role", MetadataValue::String("owner".into())),
            ("level", MetadataValue::Int(5)),
        ]),
    );
    store_binding(
        &mut adapter,
        "u2",
        "o1",
        "member_of",
        meta(&[
            ("role", MetadataValue::String("owner".into())),
            ("level", MetadataValue::Int(1)),
        ]),
    );

    let criteria = QueryCriteria::new()
        .where_eq("role", "owner")
        .where_op(
            "level",
            bindery_core::Operator::Gt,
            bindery_core::Operand::One(MetadataValue::Int(3)),
        );
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![both]);
}

#[test]
fn nested_metadata_path_conditions() {
    let mut adapter = MemoryAdapter::new();
    let mut address = Metadata::new();
    address.insert("city".into(), MetadataValue::String("berlin".into()));
    let berlin = store_binding(
        &mut adapter,
        "u1",
        "o1",
        "member_of",
        meta(&[("address", MetadataValue::Map(address))]),
    );
    store_binding(&mut adapter, "u2", "o1", "member_of", Metadata::new());

    let criteria = QueryCriteria::new().where_eq("metadata.address.city", "berlin");
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![berlin]);
}

#[test]
fn well_known_timestamp_fields_are_queryable() {
    let mut adapter = MemoryAdapter::new();
    let first = store_binding(&mut adapter, "u1", "o1", "member_of", Metadata::new());
    let second = store_binding(&mut adapter, "u2", "o1", "member_of", Metadata::new());

    let criteria = QueryCriteria::new().where_between(
        "createdAt",
        MetadataValue::Timestamp(first.created_at()),
        MetadataValue::Timestamp(second.created_at()),
    );
    assert_eq!(adapter.count(&criteria).unwrap(), 2);
}

// =============================================================================
// OR-union semantics
// =============================================================================

#[test]
fn or_group_unions_against_unfiltered_candidates() {
    let mut adapter = MemoryAdapter::new();
    let a = store_binding(&mut adapter, "u1", "o1", "x", Metadata::new());
    let b = store_binding(&mut adapter, "u2", "o2", "y", Metadata::new());

    // AND filter keeps only type=x; the OR-group matches type=y against the
    // full store and unions it in. Both come back.
    let criteria = QueryCriteria::new()
        .binding_type("x")
        .or_where(vec![WhereCondition::eq("type", "y")]);
    let results = adapter.execute_query(&criteria).unwrap();
    assert_eq!(results, vec![a, b]);
}

#[test]
fn or_group_ignores_entity_narrowing() {
    let mut adapter = MemoryAdapter::new();
    let narrowed = store_binding(&mut adapter, "u1", "o1", "member_of", Metadata::new());
    let elsewhere = store_binding(
        &mut adapter,
        "u9",
        "o9",
        "member_of",
        meta(&[("flag", MetadataValue::Bool(true))]),
    );

    let criteria = QueryCriteria::new()
        .from_entity(EntityRef::new("User", "u1"))
        .or_where(vec![WhereCondition::eq("flag", true)]);
    let results = adapter.execute_query(&criteria).unwrap();
    assert_eq!(results, vec![narrowed, elsewhere]);
}

#[test]
fn or_group_matches_deduplicate_by_id() {
    let mut adapter = MemoryAdapter::new();
    let a = store_binding(
        &mut adapter,
        "u1",
        "o1",
        "x",
        meta(&[("flag", MetadataValue::Bool(true))]),
    );

    // Matches both the AND filter and the OR-group; must appear once.
    let criteria = QueryCriteria::new()
        .binding_type("x")
        .or_where(vec![WhereCondition::eq("flag", true)]);
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![a]);
    assert_eq!(adapter.count(&criteria).unwrap(), 1);
}

#[test]
fn multiple_or_groups_union_independently() {
    let mut adapter = MemoryAdapter::new();
    store_binding(&mut adapter, "u1", "o1", "x", Metadata::new());
    let b = store_binding(&mut adapter, "u2", "o1", "y", Metadata::new());
    let c = store_binding(&mut adapter, "u3", "o1", "z", Metadata::new());

    let criteria = QueryCriteria::new()
        .binding_type("missing")
        .or_where(vec![WhereCondition::eq("type", "y")])
        .or_where(vec![WhereCondition::eq("type", "z")]);
    let results = adapter.execute_query(&criteria).unwrap();
    assert_eq!(results, vec![b, c]);
}

#[test]
fn or_group_conditions_are_conjunctive_within_the_group() {
    let mut adapter = MemoryAdapter::new();
    store_binding(
        &mut adapter,
        "u1",
        "o1",
        "x",
        meta(&[("level", MetadataValue::Int(1))]),
    );
    let high = store_binding(
        &mut adapter,
        "u2",
        "o1",
        "x",
        meta(&[("level", MetadataValue::Int(9))]),
    );

    let criteria = QueryCriteria::new()
        .binding_type("nothing")
        .or_where(vec![
            WhereCondition::eq("type", "x"),
            WhereCondition::gt("level", 5i64),
        ]);
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![high]);
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn order_by_with_tie_break_clause() {
    let mut adapter = MemoryAdapter::new();
    let b2 = store_binding(
        &mut adapter,
        "u1",
        "o1",
        "m",
        meta(&[
            ("rank", MetadataValue::Int(1)),
            ("name", MetadataValue::String("b".into())),
        ]),
    );
    let a1 = store_binding(
        &mut adapter,
        "u2",
        "o1",
        "m",
        meta(&[
            ("rank", MetadataValue::Int(1)),
            ("name", MetadataValue::String("a".into())),
        ]),
    );
    let c0 = store_binding(
        &mut adapter,
        "u3",
        "o1",
        "m",
        meta(&[
            ("rank", MetadataValue::Int(0)),
            ("name", MetadataValue::String("c".into())),
        ]),
    );

    let criteria = QueryCriteria::new()
        .order_by("rank", Direction::Asc)
        .order_by("name", Direction::Asc);
    let results = adapter.execute_query(&criteria).unwrap();
    assert_eq!(results, vec![c0, a1, b2]);
}

#[test]
fn exhausted_clauses_fall_back_to_insertion_order() {
    let mut adapter = MemoryAdapter::new();
    let first = store_binding(
        &mut adapter,
        "u1",
        "o1",
        "m",
        meta(&[("rank", MetadataValue::Int(1))]),
    );
    let second = store_binding(
        &mut adapter,
        "u2",
        "o1",
        "m",
        meta(&[("rank", MetadataValue::Int(1))]),
    );

    let criteria = QueryCriteria::new().order_by("rank", Direction::Asc);
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![first.clone(), second.clone()]);

    // Same ranks in descending direction too: insertion order holds
    let criteria = QueryCriteria::new().order_by("rank", Direction::Desc);
    assert_eq!(adapter.execute_query(&criteria).unwrap(), vec![first, second]);
}

#[test]
fn query_is_deterministic_against_unmodified_store() {
    let mut adapter = MemoryAdapter::new();
    for i in 0..20 {
        store_binding(
            &mut adapter,
            &format!("u{}", i % 5),
            "o1",
            if i % 2 == 0 { "even" } else { "odd" },
            meta(&[("n", MetadataValue::Int(i))]),
        );
    }

    let criteria = QueryCriteria::new()
        .binding_type("even")
        .or_where(vec![WhereCondition::gt("n", 15i64)])
        .order_by("n", Direction::Desc);
    let first = adapter.execute_query(&criteria).unwrap();
    let second = adapter.execute_query(&criteria).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Pagination
// =============================================================================

#[test]
fn offset_and_limit_slice_after_ordering() {
    let mut adapter = MemoryAdapter::new();
    for i in 0..10 {
        store_binding(
            &mut adapter,
            &format!("u{}", i),
            "o1",
            "m",
            meta(&[("n", MetadataValue::Int(i))]),
        );
    }

    let criteria = QueryCriteria::new()
        .order_by("n", Direction::Desc)
        .offset(2)
        .limit(3);
    let results = adapter.execute_query(&criteria).unwrap();
    let ns: Vec<i64> = results
        .iter()
        .map(|b| b.metadata().get("n").and_then(|v| v.as_int()).unwrap())
        .collect();
    assert_eq!(ns, vec![7, 6, 5]);
}

#[test]
fn count_ignores_pagination() {
    let mut adapter = MemoryAdapter::new();
    for i in 0..10 {
        store_binding(&mut adapter, &format!("u{}", i), "o1", "m", Metadata::new());
    }

    let criteria = QueryCriteria::new().offset(8).limit(1);
    assert_eq!(adapter.execute_query(&criteria).unwrap().len(), 1);
    assert_eq!(adapter.count(&criteria).unwrap(), 10);
}

#[test]
fn offset_beyond_results_is_empty() {
    let mut adapter = MemoryAdapter::new();
    store_binding(&mut adapter, "u1", "o1", "m", Metadata::new());

    let criteria = QueryCriteria::new().offset(5);
    assert!(adapter.execute_query(&criteria).unwrap().is_empty());
}

// =============================================================================
// Two bindings between the same entities
// =============================================================================

#[test]
fn same_entities_different_types() {
    let mut adapter = MemoryAdapter::new();
    store_binding(&mut adapter, "u1", "o1", "member_of", Metadata::new());
    store_binding(&mut adapter, "u1", "o1", "admin_of", Metadata::new());

    let typed = QueryCriteria::new()
        .from_entity(EntityRef::new("User", "u1"))
        .binding_type("member_of");
    assert_eq!(adapter.execute_query(&typed).unwrap().len(), 1);

    let untyped = QueryCriteria::new().from_entity(EntityRef::new("User", "u1"));
    assert_eq!(adapter.execute_query(&untyped).unwrap().len(), 2);
}
