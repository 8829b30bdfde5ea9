//! Transaction group and embedded entry records.
//!
//! A [`TransactionGroup`] is one journalized business event owning an ordered
//! set of [`EmbeddedEntry`] debit/credit lines. Entries are an owned child
//! collection keyed by an explicit 1-based `sequence` field (not positional
//! array index), so reordering or deletion never silently corrupts identity.
//!
//! # Invariants
//!
//! - Exactly one of `debit_amount` / `credit_amount` is positive per entry;
//!   neither is negative.
//! - `sequence` values are unique and contiguous starting at 1.
//! - `funding_type` mirrors the presence of `source_transaction_id`.
//! - `status != Draft` implies the entry set is immutable.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::context::OperationContext;
use crate::id::{AccountId, CategoryId, EntryId, GroupId, GroupNumber, UserId};
use crate::status::{FundingType, TransactionStatus};

/// A single debit or credit line item within a transaction group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedEntry {
    pub id: EntryId,
    /// Owning group. Kept explicit so orphan detection survives re-embedding.
    pub group_id: GroupId,
    /// 1-based position, unique and contiguous within the group.
    pub sequence: u32,
    /// Account the line posts to. `None` only on unfinished drafts and
    /// repair-synthesized placeholders.
    pub account: Option<AccountId>,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub description: String,
    pub category: Option<CategoryId>,
    /// Entry-level funding trace: the group this line draws its money from.
    pub source_transaction_id: Option<GroupId>,
    /// Ordered ancestry of the money's origin, oldest first.
    #[serde(default)]
    pub funding_path: Vec<GroupId>,
    pub organization: crate::id::OrganizationId,
    pub created_by: UserId,
    /// Set on entries synthesized by legacy repair so later passes never
    /// mistake them for genuine zero-amount data.
    #[serde(default)]
    pub placeholder: bool,
}

impl EmbeddedEntry {
    /// A debit line.
    pub fn debit(
        ctx: &OperationContext,
        group_id: GroupId,
        sequence: u32,
        account: AccountId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self::line(ctx, group_id, sequence, Some(account), amount, Decimal::ZERO, description)
    }

    /// A credit line.
    pub fn credit(
        ctx: &OperationContext,
        group_id: GroupId,
        sequence: u32,
        account: AccountId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self::line(ctx, group_id, sequence, Some(account), Decimal::ZERO, amount, description)
    }

    fn line(
        ctx: &OperationContext,
        group_id: GroupId,
        sequence: u32,
        account: Option<AccountId>,
        debit_amount: Decimal,
        credit_amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            group_id,
            sequence,
            account,
            debit_amount,
            credit_amount,
            description: description.into(),
            category: None,
            source_transaction_id: None,
            funding_path: Vec::new(),
            organization: ctx.organization,
            created_by: ctx.user,
            placeholder: false,
        }
    }

    /// The amount on whichever side is populated.
    pub fn amount(&self) -> Decimal {
        self.debit_amount.max(self.credit_amount)
    }

    /// Both sides zero. Valid on drafts and placeholders, never confirmable.
    pub fn is_zero(&self) -> bool {
        self.debit_amount.is_zero() && self.credit_amount.is_zero()
    }

    /// Both sides positive, which is always invalid.
    pub fn is_dual_sided(&self) -> bool {
        self.debit_amount > Decimal::ZERO && self.credit_amount > Decimal::ZERO
    }

    /// Either side negative, which is always invalid.
    pub fn has_negative(&self) -> bool {
        self.debit_amount < Decimal::ZERO || self.credit_amount < Decimal::ZERO
    }
}

/// A structural problem with entry sequence numbering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceViolation {
    /// The same sequence value appears on more than one entry.
    Duplicate { sequence: u32 },
    /// Sequences are not contiguous from 1.
    Gap { expected: u32, found: u32 },
}

/// One journalized business event containing a balanced set of entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionGroup {
    pub id: GroupId,
    pub group_number: GroupNumber,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub organization: crate::id::OrganizationId,
    /// Derived cache: the larger of the debit/credit totals. Equal to both
    /// once the group is balanced.
    pub total_amount: Decimal,
    pub status: TransactionStatus,
    /// Cache of `source_transaction_id.is_some()`; see [`FundingType::derive`].
    pub funding_type: FundingType,
    /// The group this one draws funding from. Never the group's own id.
    pub source_transaction_id: Option<GroupId>,
    /// Groups that draw funding from this one, deduplicated.
    #[serde(default)]
    pub linked_transaction_ids: Vec<GroupId>,
    pub receipt_url: Option<String>,
    pub invoice_no: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, incremented by the store on every write.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub entries: Vec<EmbeddedEntry>,
}

impl TransactionGroup {
    /// Create a new draft group with no entries.
    pub fn draft(
        ctx: &OperationContext,
        group_number: GroupNumber,
        description: impl Into<String>,
        transaction_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: GroupId::new(),
            group_number,
            description: description.into(),
            transaction_date,
            organization: ctx.organization,
            total_amount: Decimal::ZERO,
            status: TransactionStatus::Draft,
            funding_type: FundingType::Original,
            source_transaction_id: None,
            linked_transaction_ids: Vec::new(),
            receipt_url: None,
            invoice_no: None,
            created_by: ctx.user,
            created_at: now,
            updated_at: now,
            version: 0,
            entries: Vec::new(),
        }
    }

    /// Append an entry at the next sequence position.
    pub fn push_entry(&mut self, mut entry: EmbeddedEntry) {
        entry.group_id = self.id;
        entry.sequence = self.entries.len() as u32 + 1;
        self.entries.push(entry);
        self.total_amount = self.recomputed_total();
    }

    /// Sum of the debit side.
    pub fn total_debit(&self) -> Decimal {
        self.entries.iter().map(|e| e.debit_amount).sum()
    }

    /// Sum of the credit side.
    pub fn total_credit(&self) -> Decimal {
        self.entries.iter().map(|e| e.credit_amount).sum()
    }

    /// The derived total: larger of the two sides.
    pub fn recomputed_total(&self) -> Decimal {
        self.total_debit().max(self.total_credit())
    }

    /// Refresh the derived caches (`total_amount`, `funding_type`).
    pub fn refresh_caches(&mut self) {
        self.total_amount = self.recomputed_total();
        self.funding_type = FundingType::derive(self.source_transaction_id.as_ref());
    }

    /// Detect duplicate or non-contiguous entry sequences.
    pub fn sequence_violations(&self) -> Vec<SequenceViolation> {
        sequence_violations(&self.entries)
    }

    /// Whether any entry posts to the given account.
    pub fn touches_account(&self, account: &AccountId) -> bool {
        self.entries
            .iter()
            .any(|e| e.account.as_ref() == Some(account))
    }
}

/// Detect duplicate or non-contiguous sequences in a set of entries.
///
/// Sequences must be unique and contiguous starting at 1, in any order.
pub fn sequence_violations(entries: &[EmbeddedEntry]) -> Vec<SequenceViolation> {
    let mut sequences: Vec<u32> = entries.iter().map(|e| e.sequence).collect();
    sequences.sort_unstable();

    let mut violations = Vec::new();
    let mut expected = 1u32;
    let mut previous: Option<u32> = None;
    for found in sequences {
        if previous == Some(found) {
            violations.push(SequenceViolation::Duplicate { sequence: found });
            continue;
        }
        if found != expected {
            violations.push(SequenceViolation::Gap { expected, found });
        }
        previous = Some(found);
        expected = found.saturating_add(1);
    }
    violations
}
