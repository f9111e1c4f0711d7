//! Session consistency through the public API

use crate::common::init_tracing;
use bindery::{EntityRef, Metadata, MemoryAdapter, Session};

fn user(id: &str) -> EntityRef {
    EntityRef::new("User", id)
}

fn org(id: &str) -> EntityRef {
    EntityRef::new("Org", id)
}

#[test]
fn bind_then_query_always_observes_the_write() {
    init_tracing();
    let mut session = Session::new(MemoryAdapter::new());
    let binding = session
        .bind(&user("u1"), &org("o1"), "member_of", Metadata::new())
        .unwrap();

    // No flush in between
    let results = session
        .query()
        .from_entity(&user("u1"))
        .unwrap()
        .binding_type("member_of")
        .all()
        .unwrap();
    assert_eq!(results, vec![binding]);
}

#[test]
fn duplicate_visibility_yields_one_result() {
    let mut session = Session::new(MemoryAdapter::new());
    let binding = session
        .bind(&user("u1"), &org("o1"), "member_of", Metadata::new())
        .unwrap();

    // The reference adapter is immediately visible, so the id exists in
    // both the cache and the adapter; the session returns it exactly once.
    let results = session.query().all().unwrap();
    assert_eq!(results, vec![binding]);
    assert_eq!(session.query().count().unwrap(), 1);
}

#[test]
fn unbind_disappears_from_session_view() {
    let mut session = Session::new(MemoryAdapter::new());
    let keep = session
        .bind(&user("u1"), &org("o1"), "member_of", Metadata::new())
        .unwrap();
    let gone = session
        .bind(&user("u2"), &org("o1"), "member_of", Metadata::new())
        .unwrap();

    session.unbind(gone.id()).unwrap();
    assert_eq!(session.query().all().unwrap(), vec![keep]);
}

#[test]
fn lifecycle_open_flushed_closed() {
    let mut session = Session::new(MemoryAdapter::new());
    session
        .bind(&user("u1"), &org("o1"), "member_of", Metadata::new())
        .unwrap();
    assert!(session.is_dirty());

    session.flush().unwrap();
    assert!(!session.is_dirty());
    assert_eq!(session.tracked_bindings().len(), 1);

    session.close().unwrap();
    assert!(session.tracked_bindings().is_empty());
    assert_eq!(session.query().count().unwrap(), 1); // adapter still answers
}
