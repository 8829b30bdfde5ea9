//! Persistence for rxledger transaction groups.
//!
//! This crate provides:
//! - The [`GroupStore`] trait boundary: atomic group+entries writes,
//!   optimistic concurrency, org-scoped reads
//! - [`InMemoryGroupStore`] implementation for tests, tooling, and embedding
//! - [`GroupQuery`] filters and per-account [`AccountStatistics`]

pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryGroupStore;
pub use query::{AccountStatistics, GroupQuery};
pub use traits::GroupStore;
