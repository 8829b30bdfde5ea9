//! Core ledger logic for rxledger.
//!
//! This crate is the heart of the transaction core. It provides:
//! - [`EntryValidator`]: pure balance and structural checks over entry sets
//! - [`StatusLifecycleManager`]: the draft/confirmed/cancelled state machine,
//!   with balance validation and the status flip in one compare-and-swap
//! - Collaborator trait boundaries ([`SettlementProbe`], [`AccountDirectory`])

pub mod error;
pub mod lifecycle;
pub mod traits;
pub mod validation;

pub use error::LedgerError;
pub use lifecycle::{GroupConfirmed, LifecyclePreview, StatusLifecycleManager};
pub use traits::{AccountDirectory, NoSettlements, SettlementProbe};
pub use validation::{
    AdjustedSide, BalanceState, BalanceSummary, EntryIssue, EntryValidator, IssueKind,
    QuickBalanceFix, ValidationReport,
};
