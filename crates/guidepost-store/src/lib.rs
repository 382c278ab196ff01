//! # guidepost-store
//!
//! The storage collaborator seam for the scheduling platform.
//!
//! Persistence is owned by a hosted relational database; this crate holds the
//! typed records for its tables, the object-safe [`Store`] trait the services
//! depend on, and two backends: [`MemoryStore`] for tests and offline fixture
//! work, and [`RestStore`] speaking the hosted database's PostgREST dialect.
//!
//! The store is the authority for booking conflicts: an exclusion constraint
//! rejects overlapping inserts, surfaced here as [`StoreError::Conflict`]. An
//! empty result set is data ("no rows"), never an error.
//!
//! ## Modules
//!
//! - [`records`] — row types and insert/update payloads
//! - [`store`] — the `Store` trait
//! - [`memory`] — in-memory backend
//! - [`rest`] — PostgREST-dialect HTTP backend
//! - [`dataset`] — JSON fixture loading for the in-memory backend
//! - [`error`] — error types

pub mod dataset;
pub mod error;
pub mod memory;
pub mod records;
pub mod rest;
pub mod store;

pub use dataset::Dataset;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use store::{BoxFuture, Store};
