//! Facade and session layers for Bindery
//!
//! - `Bindery`: the thin convenience surface over any adapter; every call
//!   desugars to exactly one adapter call pattern
//! - `Session`: the consistency layer reconciling not-yet-visible writes
//!   with adapter reads through a local write-through cache and a
//!   pending-operation tracker

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod facade;
pub mod session;

pub use facade::{Bindery, QueryBuilder};
pub use session::{Session, SessionConfig, SessionQueryBuilder};
