//! Foundation types for the rxledger transaction core.
//!
//! This crate provides the identity, status, money, and record types used
//! throughout the rxledger system. Every other rxledger crate depends on
//! `rxledger-types`.
//!
//! # Key Types
//!
//! - [`GroupId`] / [`EntryId`] / [`AccountId`] — UUID v7 identifiers
//! - [`TransactionStatus`] — draft / confirmed / cancelled lifecycle states
//! - [`FundingType`] — original vs. extended funding classification
//! - [`TransactionGroup`] / [`EmbeddedEntry`] — the journalized records
//! - [`OperationContext`] — explicit acting-user / organization scope

pub mod account;
pub mod context;
pub mod error;
pub mod id;
pub mod money;
pub mod record;
pub mod status;

pub use account::{AccountInfo, AccountKind, AccountRef};
pub use context::OperationContext;
pub use error::TypeError;
pub use id::{AccountId, CategoryId, EntryId, GroupId, GroupNumber, OrganizationId, UserId};
pub use money::{BALANCE_TOLERANCE, LARGE_AMOUNT_WARNING, MAX_FUNDING_DEPTH};
pub use record::{sequence_violations, EmbeddedEntry, SequenceViolation, TransactionGroup};
pub use status::{FundingType, TransactionStatus};
