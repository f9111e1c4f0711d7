//! Error types for bindery
//!
//! This module defines the error taxonomy used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Taxonomy
//!
//! - `EntityExtraction`: identity/type cannot be derived from a caller entity
//! - `InvalidMetadata`: metadata failed validation, before any store mutation
//! - `BindingNotFound`: requested id absent on find/update/delete paths
//! - `Persistence`: wraps any adapter-internal failure, preserving the cause
//!
//! Validation failures are fail-fast and side-effect-free. Adapter-internal
//! failures are always wrapped, never leaked raw, so callers depend only on
//! this taxonomy.

use crate::binding::BindingId;
use thiserror::Error;

/// Result type alias for bindery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause preserved inside [`Error::Persistence`]
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for the binding store
#[derive(Debug, Error)]
pub enum Error {
    /// Entity identity or type could not be derived from a caller-supplied entity
    #[error("entity extraction failed: {0}")]
    EntityExtraction(String),

    /// Metadata failed validation
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Requested binding id does not exist
    #[error("binding not found: {0}")]
    BindingNotFound(BindingId),

    /// Adapter-internal failure, wrapping the original cause
    #[error("persistence failure in {operation}: {source}")]
    Persistence {
        /// The contract operation that failed
        operation: &'static str,
        /// Original cause
        #[source]
        source: BoxedCause,
    },
}

impl Error {
    /// Wrap an adapter-internal failure, preserving the original cause
    pub fn persistence(operation: &'static str, source: impl Into<BoxedCause>) -> Self {
        Error::Persistence {
            operation,
            source: source.into(),
        }
    }

    /// Wrap a plain message as a persistence failure
    pub fn persistence_msg(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Persistence {
            operation,
            source: message.into().into(),
        }
    }

    /// Check whether this is a `BindingNotFound` error
    ///
    /// The session layer uses this to treat delete-of-absent as benign.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BindingNotFound(_))
    }
}
