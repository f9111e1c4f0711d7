//! End-to-end suite for the binding API
//!
//! Exercises the public surface the way an embedding application would:
//! facade + reference adapter + session, covering the model invariants,
//! query semantics, and consistency behavior.

mod binding_model;
mod errors;
mod query_pipeline;
mod session_behavior;

pub mod common {
    use bindery::{Binding, Metadata, MetadataValue};

    /// Install a fmt subscriber once so failing tests show engine logs
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    pub fn meta(entries: &[(&str, MetadataValue)]) -> Metadata {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    pub fn membership(from_id: &str, to_id: &str, binding_type: &str) -> Binding {
        Binding::create("User", from_id, "Org", to_id, binding_type, Metadata::new()).unwrap()
    }
}
