//! Binding model invariants: identity stability and round-trip fidelity

use crate::common::meta;
use bindery::{Binding, BindingRecord, Metadata, MetadataValue};
use proptest::prelude::*;

#[test]
fn identity_survives_metadata_changes() {
    let binding = Binding::create(
        "User",
        "u1",
        "Org",
        "o1",
        "member_of",
        meta(&[("role", MetadataValue::String("viewer".into()))]),
    )
    .unwrap();

    let updated = binding
        .with_metadata(meta(&[("role", MetadataValue::String("owner".into()))]))
        .unwrap();

    assert_eq!(updated.id(), binding.id());
    assert_eq!(updated.from_type(), binding.from_type());
    assert_eq!(updated.from_id(), binding.from_id());
    assert_eq!(updated.to_type(), binding.to_type());
    assert_eq!(updated.to_id(), binding.to_id());
    assert_eq!(updated.binding_type(), binding.binding_type());
    assert_eq!(updated.created_at(), binding.created_at());
    assert!(updated.updated_at() > binding.updated_at());
}

#[test]
fn repeated_updates_keep_advancing_updated_at() {
    let mut binding = Binding::create("User", "u1", "Org", "o1", "t", Metadata::new()).unwrap();
    let mut last = binding.updated_at();
    for i in 0..50 {
        binding = binding
            .merge_metadata(meta(&[("i", MetadataValue::Int(i))]))
            .unwrap();
        assert!(binding.updated_at() > last);
        last = binding.updated_at();
    }
}

#[test]
fn record_roundtrip_via_json_text() {
    let binding = Binding::create(
        "User",
        "u1",
        "Org",
        "o1",
        "member_of",
        meta(&[
            ("role", MetadataValue::String("owner".into())),
            ("level", MetadataValue::Int(3)),
            ("score", MetadataValue::Float(0.5)),
            ("active", MetadataValue::Bool(true)),
            ("cleared", MetadataValue::Null),
        ]),
    )
    .unwrap();

    let json = serde_json::to_string(&binding.to_record()).unwrap();
    let record: BindingRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(Binding::from_record(record).unwrap(), binding);
}

fn scalar_value() -> impl Strategy<Value = MetadataValue> {
    prop_oneof![
        Just(MetadataValue::Null),
        any::<bool>().prop_map(MetadataValue::Bool),
        any::<i64>().prop_map(MetadataValue::Int),
        // Finite floats only: NaN breaks equality by design
        (-1.0e12f64..1.0e12).prop_map(MetadataValue::Float),
        "[a-z0-9 ]{0,12}".prop_map(MetadataValue::String),
    ]
}

proptest! {
    #[test]
    fn record_roundtrip_holds_for_arbitrary_scalar_metadata(
        entries in prop::collection::btree_map("[a-z]{1,8}", scalar_value(), 0..8)
    ) {
        let metadata: Metadata = entries.into_iter().collect();
        let binding =
            Binding::create("User", "u1", "Org", "o1", "member_of", metadata).unwrap();

        let json = serde_json::to_string(&binding.to_record()).unwrap();
        let record: BindingRecord = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(Binding::from_record(record).unwrap(), binding);
    }
}

#[test]
fn reverse_preserves_creation_instant() {
    let binding = Binding::create("User", "u1", "Org", "o1", "member_of", Metadata::new()).unwrap();
    let reversed = binding.reverse(Some("has_member"), None).unwrap();

    assert_ne!(reversed.id(), binding.id());
    assert!(reversed.connects("Org", "o1", "User", "u1"));
    assert_eq!(reversed.created_at(), binding.created_at());
}
