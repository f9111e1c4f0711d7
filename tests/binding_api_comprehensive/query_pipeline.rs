//! Query semantics through the public facade

use crate::common::meta;
use bindery::{
    Bindery, Direction, EntityRef, Metadata, MemoryAdapter, MetadataValue, QueryCriteria,
    WhereCondition,
};

fn populated() -> Bindery<MemoryAdapter> {
    let mut bindery = Bindery::new(MemoryAdapter::new());
    let org = EntityRef::new("Org", "o1");
    bindery
        .bind(
            &EntityRef::new("User", "u1"),
            &org,
            "member_of",
            meta(&[("level", MetadataValue::Int(1))]),
        )
        .unwrap();
    bindery
        .bind(
            &EntityRef::new("User", "u1"),
            &org,
            "admin_of",
            meta(&[("level", MetadataValue::Int(9))]),
        )
        .unwrap();
    bindery
        .bind(
            &EntityRef::new("User", "u2"),
            &org,
            "member_of",
            meta(&[("level", MetadataValue::Int(5))]),
        )
        .unwrap();
    bindery
}

#[test]
fn typed_and_untyped_queries_from_the_same_entity() {
    let bindery = populated();
    let user = EntityRef::new("User", "u1");

    let typed = bindery
        .query()
        .from_entity(&user)
        .unwrap()
        .binding_type("member_of")
        .all()
        .unwrap();
    assert_eq!(typed.len(), 1);

    let untyped = bindery.query().from_entity(&user).unwrap().all().unwrap();
    assert_eq!(untyped.len(), 2);
}

#[test]
fn or_union_returns_both_branches() {
    let bindery = populated();

    // AND filter keeps member_of; OR-group adds admin_of from the full set
    let results = bindery
        .query()
        .binding_type("member_of")
        .or_where(vec![WhereCondition::eq("type", "admin_of")])
        .all()
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn query_twice_is_identical() {
    let bindery = populated();
    let build = || {
        bindery
            .query()
            .where_between("level", 1i64, 9i64)
            .order_by("level", Direction::Desc)
            .all()
            .unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn ordering_and_pagination_through_the_facade() {
    let bindery = populated();
    let page = bindery
        .query()
        .order_by("level", Direction::Desc)
        .offset(1)
        .limit(1)
        .all()
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(
        page[0].metadata().get("level"),
        Some(&MetadataValue::Int(5))
    );

    // count ignores the slice
    let count = bindery
        .query()
        .order_by("level", Direction::Desc)
        .offset(1)
        .limit(1)
        .count()
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
fn criteria_values_survive_serialization() {
    // A criteria built by one process can be replayed by another
    let criteria = QueryCriteria::new()
        .from_entity(EntityRef::new("User", "u1"))
        .where_eq("level", 9i64)
        .order_by("createdAt", Direction::Asc);

    let json = serde_json::to_string(&criteria).unwrap();
    let replayed: QueryCriteria = serde_json::from_str(&json).unwrap();

    let bindery = populated();
    use bindery::PersistenceAdapter;
    let direct = bindery.adapter().execute_query(&criteria).unwrap();
    let from_wire = bindery.adapter().execute_query(&replayed).unwrap();
    assert_eq!(direct, from_wire);
    assert_eq!(direct.len(), 1);
}

#[test]
fn anonymous_entities_fall_back_to_identity_extraction() {
    struct Document {
        _body: String,
    }
    impl bindery::Entity for Document {}

    let mut bindery = Bindery::new(MemoryAdapter::new());
    let doc = Document {
        _body: "quarterly report".into(),
    };
    let org = EntityRef::new("Org", "o1");

    let binding = bindery
        .bind(&doc, &org, "filed_under", Metadata::new())
        .unwrap();
    assert_eq!(binding.from_type(), "Document");
    assert!(binding.from_id().starts_with("entity-"));

    // The same in-place object resolves to the same identity
    let results = bindery.query().from_entity(&doc).unwrap().all().unwrap();
    assert_eq!(results, vec![binding]);
}
