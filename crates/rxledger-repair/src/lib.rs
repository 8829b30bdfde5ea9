//! Legacy-repair batch passes for rxledger historical data.
//!
//! Production exports contain groups missing fields (`status`,
//! `funding_type`, `linked_transaction_ids`) and draft groups with no
//! entries at all. This crate provides:
//! - [`RawGroupRecord`]: the tolerant legacy shape and its normalizer
//! - [`FieldBackfill`] / [`EntryBackfill`]: independent, idempotent,
//!   re-runnable passes over a [`GroupStore`](rxledger_store::GroupStore)
//! - [`run_pass`]: the checkpointed batch runner
//!
//! Every pass reports examined/fixed/skipped counts and produces
//! `fixed = 0` on a second run over the same data.

pub mod error;
pub mod passes;
pub mod raw;
pub mod report;

pub use error::{RepairError, RepairResult};
pub use passes::{run_pass, EntryBackfill, FieldBackfill, RepairOutcome, RepairPass};
pub use raw::RawGroupRecord;
pub use report::{RepairCheckpoint, RepairReport};
