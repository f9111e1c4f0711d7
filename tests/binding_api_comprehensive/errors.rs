//! Error taxonomy behavior at the public surface

use crate::common::meta;
use bindery::{
    Bindery, BindingId, EntityRef, Error, Metadata, MemoryAdapter, MetadataValue,
    PersistenceAdapter,
};

fn nested(depth: usize) -> Metadata {
    let mut current = meta(&[("leaf", MetadataValue::Int(1))]);
    for _ in 1..depth {
        let mut outer = Metadata::new();
        outer.insert("inner".into(), MetadataValue::Map(current));
        current = outer;
    }
    current
}

#[test]
fn update_metadata_on_missing_id_leaves_store_unchanged() {
    let mut bindery = Bindery::new(MemoryAdapter::new());
    bindery
        .bind(
            &EntityRef::new("User", "u1"),
            &EntityRef::new("Org", "o1"),
            "member_of",
            Metadata::new(),
        )
        .unwrap();
    let before = bindery.adapter().all();

    let err = bindery
        .update_metadata(&BindingId::new("missing"), Metadata::new())
        .unwrap_err();
    assert!(matches!(err, Error::BindingNotFound(_)));
    assert_eq!(bindery.adapter().all(), before);
}

#[test]
fn eleven_levels_of_nesting_is_rejected_and_nothing_stored() {
    let mut bindery = Bindery::new(MemoryAdapter::new());
    let err = bindery
        .bind(
            &EntityRef::new("User", "u1"),
            &EntityRef::new("Org", "o1"),
            "member_of",
            nested(11),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata(_)));
    assert!(bindery.adapter().is_empty());
}

#[test]
fn ten_levels_of_nesting_is_accepted() {
    let mut bindery = Bindery::new(MemoryAdapter::new());
    bindery
        .bind(
            &EntityRef::new("User", "u1"),
            &EntityRef::new("Org", "o1"),
            "member_of",
            nested(10),
        )
        .unwrap();
    assert_eq!(bindery.adapter().len(), 1);
}

#[test]
fn duplicate_store_is_a_wrapped_persistence_error() {
    let mut adapter = MemoryAdapter::new();
    let binding = crate::common::membership("u1", "o1", "member_of");
    adapter.store(binding.clone()).unwrap();

    let err = adapter.store(binding).unwrap_err();
    match err {
        Error::Persistence { operation, .. } => assert_eq!(operation, "store"),
        other => panic!("expected Persistence, got {other:?}"),
    }
}

#[test]
fn unbind_missing_id_is_not_found_at_the_facade() {
    let mut bindery = Bindery::new(MemoryAdapter::new());
    let err = bindery.unbind(&BindingId::new("missing")).unwrap_err();
    assert!(err.is_not_found());
}
