//! Entities and identity extraction
//!
//! Callers pass opaque, caller-owned objects as binding endpoints. The query
//! model never inspects them directly: adapters resolve each entity to a
//! `(type, id)` pair through the extraction chain defined here.
//!
//! ## Extraction chain
//!
//! The chain is an ordered sequence of typed attempts, not runtime type
//! probing:
//!
//! 1. the [`Entity`] capability methods (`entity_id` / `entity_type`)
//! 2. for the id: an identity-derived opaque handle (never fails)
//! 3. for the type: the entity's nominal Rust type name
//!
//! The identity handle is derived from the object's address, so it is stable
//! only while the object stays in place. Entities that need durable identity
//! implement the capability methods; [`EntityRef`] is the ready-made concrete
//! carrier for an already-resolved pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability interface for binding endpoints
///
/// Both methods default to `None`; implement them to give an entity a
/// durable identity. Extraction falls back per the module-level chain when
/// they are absent.
pub trait Entity {
    /// The entity's unique id within its type, if it has one
    fn entity_id(&self) -> Option<String> {
        None
    }

    /// The entity's type name, if it declares one
    fn entity_type(&self) -> Option<String> {
        None
    }

    /// The entity's nominal Rust type name (fallback for type extraction)
    fn nominal_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Derive a stable opaque handle from an entity's identity
///
/// Used as the final id-extraction fallback so extraction never fails. The
/// handle is the object's address, valid while the object stays in place.
pub fn identity_handle(entity: &dyn Entity) -> String {
    let addr = entity as *const dyn Entity as *const () as usize;
    format!("entity-{:x}", addr)
}

/// Shorten a fully qualified type name to its last path segment
pub fn short_type_name(full: &str) -> &str {
    full.rsplit("::").next().unwrap_or(full)
}

/// A resolved `(type, id)` entity reference
///
/// This is what criteria carry for endpoint filters, and the natural entity
/// to hand to the facade when no richer caller object exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type name
    pub entity_type: String,
    /// Entity id within its type
    pub entity_id: String,
}

impl EntityRef {
    /// Create a reference from a type and id
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        EntityRef {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl Entity for EntityRef {
    fn entity_id(&self) -> Option<String> {
        Some(self.entity_id.clone())
    }

    fn entity_type(&self) -> Option<String> {
        Some(self.entity_type.clone())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
