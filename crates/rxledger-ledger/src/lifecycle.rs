//! The draft / confirmed / cancelled state machine.
//!
//! Transitions go through [`StatusLifecycleManager`], which re-validates the
//! live record and applies the status flip through the store's
//! version-guarded swap. A concurrent entry edit between validation and
//! commit therefore surfaces as a conflict instead of confirming stale data.
//!
//! | from            | to        | guard                                  |
//! |-----------------|-----------|----------------------------------------|
//! | draft           | confirmed | structural validity and balance        |
//! | confirmed       | draft     | no downstream settlement recorded      |
//! | draft/confirmed | cancelled | not already cancelled (terminal)       |
//! | draft           | deleted   | draft only                             |

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rxledger_store::GroupStore;
use rxledger_types::{
    GroupId, GroupNumber, OperationContext, OrganizationId, TransactionGroup, TransactionStatus,
    UserId,
};

use crate::error::LedgerError;
use crate::traits::SettlementProbe;
use crate::validation::{BalanceSummary, EntryValidator, ValidationReport};

/// Event emitted when a group is confirmed, for downstream consumers
/// (inventory and payment reconciliation). Produced here, consumed outside.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfirmed {
    pub group: GroupId,
    pub group_number: GroupNumber,
    pub organization: OrganizationId,
    pub total_amount: Decimal,
    pub confirmed_at: DateTime<Utc>,
    pub confirmed_by: UserId,
}

/// Balance and validation state of a group, computed without persisting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePreview {
    pub group: GroupId,
    pub status: TransactionStatus,
    pub balance: BalanceSummary,
    pub report: ValidationReport,
}

impl LifecyclePreview {
    /// Whether a confirm attempt would pass the validation gate.
    pub fn confirmable(&self) -> bool {
        self.status == TransactionStatus::Draft
            && self.report.is_valid()
            && self.balance.is_balanced()
    }
}

/// Enforces the status state machine over a [`GroupStore`].
pub struct StatusLifecycleManager<'a, S, P> {
    store: &'a S,
    settlements: &'a P,
}

impl<'a, S: GroupStore, P: SettlementProbe> StatusLifecycleManager<'a, S, P> {
    pub fn new(store: &'a S, settlements: &'a P) -> Self {
        Self { store, settlements }
    }

    /// Balance/validation preview for editing surfaces. Read-only.
    pub fn preview(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
    ) -> Result<LifecyclePreview, LedgerError> {
        let group = self.load(ctx, id)?;
        Ok(LifecyclePreview {
            group: group.id,
            status: group.status,
            balance: EntryValidator::compute_balance(&group.entries),
            report: EntryValidator::validate(&group.entries),
        })
    }

    /// Confirm a draft group.
    ///
    /// Validation runs against the freshly loaded record and the status flip
    /// is committed against that record's version, so entries cannot change
    /// between the check and the write without the write failing.
    pub fn confirm(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
    ) -> Result<GroupConfirmed, LedgerError> {
        let mut group = self.load(ctx, id)?;
        if group.status != TransactionStatus::Draft {
            return Err(LedgerError::InvalidState {
                group: group.id,
                from: group.status,
                operation: "confirm",
            });
        }

        let report = EntryValidator::validate(&group.entries);
        if !report.is_valid() {
            return Err(LedgerError::Validation {
                group: group.id,
                detail: report.summary(),
            });
        }
        Self::check_confirmable_entries(&group)?;

        let balance = EntryValidator::compute_balance(&group.entries);
        if !balance.is_balanced() {
            return Err(LedgerError::Unbalanced {
                group: group.id,
                total_debit: balance.total_debit,
                total_credit: balance.total_credit,
                difference: balance.difference.abs(),
            });
        }

        let expected_version = group.version;
        group.status = TransactionStatus::Confirmed;
        let confirmed = self.store.update(ctx, group, expected_version)?;

        debug!(group = %confirmed.id.short_id(), total = %confirmed.total_amount, "confirmed group");
        Ok(GroupConfirmed {
            group: confirmed.id,
            group_number: confirmed.group_number.clone(),
            organization: confirmed.organization,
            total_amount: confirmed.total_amount,
            confirmed_at: confirmed.updated_at,
            confirmed_by: ctx.user,
        })
    }

    /// Reopen a confirmed group for editing, unless a downstream consumer
    /// has recorded a paid amount against it.
    pub fn unlock(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
    ) -> Result<TransactionGroup, LedgerError> {
        let mut group = self.load(ctx, id)?;
        if group.status != TransactionStatus::Confirmed {
            return Err(LedgerError::InvalidState {
                group: group.id,
                from: group.status,
                operation: "unlock",
            });
        }
        if self.settlements.has_paid_amount(&group.id)? {
            return Err(LedgerError::SettledDownstream { group: group.id });
        }

        let expected_version = group.version;
        group.status = TransactionStatus::Draft;
        let unlocked = self.store.update(ctx, group, expected_version)?;
        debug!(group = %unlocked.id.short_id(), "unlocked group");
        Ok(unlocked)
    }

    /// Cancel a group. Terminal; allowed from any non-cancelled status.
    pub fn cancel(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
    ) -> Result<TransactionGroup, LedgerError> {
        let mut group = self.load(ctx, id)?;
        if group.status.is_terminal() {
            return Err(LedgerError::InvalidState {
                group: group.id,
                from: group.status,
                operation: "cancel",
            });
        }

        let expected_version = group.version;
        group.status = TransactionStatus::Cancelled;
        let cancelled = self.store.update(ctx, group, expected_version)?;
        debug!(group = %cancelled.id.short_id(), "cancelled group");
        Ok(cancelled)
    }

    /// Delete a group and its entries. Drafts only.
    pub fn delete(&self, ctx: &OperationContext, id: &GroupId) -> Result<(), LedgerError> {
        let group = self.load(ctx, id)?;
        if group.status != TransactionStatus::Draft {
            return Err(LedgerError::InvalidState {
                group: group.id,
                from: group.status,
                operation: "delete",
            });
        }
        self.store.delete(ctx, id, group.version)?;
        Ok(())
    }

    /// Placeholder rows and account-less amounts never confirm; both need a
    /// human decision first.
    fn check_confirmable_entries(group: &TransactionGroup) -> Result<(), LedgerError> {
        for entry in &group.entries {
            if entry.placeholder {
                return Err(LedgerError::Validation {
                    group: group.id,
                    detail: format!(
                        "entry {} is a repair placeholder and must be completed or removed",
                        entry.sequence
                    ),
                });
            }
            if entry.account.is_none() && !entry.is_zero() {
                return Err(LedgerError::Validation {
                    group: group.id,
                    detail: format!("entry {} has an amount but no account", entry.sequence),
                });
            }
        }
        Ok(())
    }

    fn load(&self, ctx: &OperationContext, id: &GroupId) -> Result<TransactionGroup, LedgerError> {
        self.store
            .get(ctx, id)?
            .ok_or(LedgerError::NotFound(*id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use rxledger_store::{InMemoryGroupStore, StoreError};
    use rxledger_types::{AccountId, EmbeddedEntry};

    use crate::traits::NoSettlements;

    use super::*;

    struct SettledProbe;

    impl SettlementProbe for SettledProbe {
        fn has_paid_amount(&self, _group: &GroupId) -> Result<bool, LedgerError> {
            Ok(true)
        }
    }

    fn ctx() -> OperationContext {
        OperationContext::new(OrganizationId::new(), UserId::new())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn seed_group(
        store: &InMemoryGroupStore,
        ctx: &OperationContext,
        debit: Decimal,
        credit: Decimal,
    ) -> TransactionGroup {
        let mut group = TransactionGroup::draft(ctx, "TXN-0001".into(), "restock", date());
        group.push_entry(EmbeddedEntry::debit(
            ctx,
            group.id,
            0,
            AccountId::new(),
            debit,
            "inventory",
        ));
        group.push_entry(EmbeddedEntry::credit(
            ctx,
            group.id,
            0,
            AccountId::new(),
            credit,
            "cash",
        ));
        store.create(ctx, group).unwrap()
    }

    #[test]
    fn balanced_draft_confirms_and_emits_event() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(1000), dec!(1000));
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let event = manager.confirm(&ctx, &group.id).unwrap();
        assert_eq!(event.group, group.id);
        assert_eq!(event.total_amount, dec!(1000));
        assert_eq!(event.confirmed_by, ctx.user);

        let stored = store.get(&ctx, &group.id).unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Confirmed);
    }

    #[test]
    fn unbalanced_draft_fails_with_difference() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(1000), dec!(500));
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let err = manager.confirm(&ctx, &group.id).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unbalanced {
                group: group.id,
                total_debit: dec!(1000),
                total_credit: dec!(500),
                difference: dec!(500),
            }
        );
        let stored = store.get(&ctx, &group.id).unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Draft);
    }

    #[test]
    fn underpopulated_draft_fails_validation() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let mut group = TransactionGroup::draft(&ctx, "TXN-0002".into(), "lonely", date());
        group.push_entry(EmbeddedEntry::debit(
            &ctx,
            group.id,
            0,
            AccountId::new(),
            dec!(10),
            "only",
        ));
        let group = store.create(&ctx, group).unwrap();
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let err = manager.confirm(&ctx, &group.id).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn placeholder_entries_block_confirm() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let mut group = seed_group(&store, &ctx, dec!(100), dec!(100));
        group.entries[0].placeholder = true;
        let group = store.update(&ctx, group.clone(), group.version).unwrap();
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let err = manager.confirm(&ctx, &group.id).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn confirm_twice_is_an_invalid_state() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(10), dec!(10));
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        manager.confirm(&ctx, &group.id).unwrap();
        let err = manager.confirm(&ctx, &group.id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidState { from: TransactionStatus::Confirmed, .. }
        ));
    }

    #[test]
    fn unlock_is_blocked_by_settlement() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(10), dec!(10));

        StatusLifecycleManager::new(&store, &NoSettlements)
            .confirm(&ctx, &group.id)
            .unwrap();

        let blocked = StatusLifecycleManager::new(&store, &SettledProbe);
        let err = blocked.unlock(&ctx, &group.id).unwrap_err();
        assert_eq!(err, LedgerError::SettledDownstream { group: group.id });

        let open = StatusLifecycleManager::new(&store, &NoSettlements);
        let unlocked = open.unlock(&ctx, &group.id).unwrap();
        assert_eq!(unlocked.status, TransactionStatus::Draft);
        assert!(unlocked.status.allows_entry_mutation());
    }

    #[test]
    fn unlock_requires_confirmed() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(10), dec!(10));
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let err = manager.unlock(&ctx, &group.id).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidState { from: TransactionStatus::Draft, .. }
        ));
    }

    #[test]
    fn cancel_is_terminal() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(10), dec!(10));
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let cancelled = manager.cancel(&ctx, &group.id).unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);

        let err = manager.cancel(&ctx, &group.id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
        let err = manager.confirm(&ctx, &group.id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn delete_only_from_draft() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let draft = seed_group(&store, &ctx, dec!(10), dec!(10));
        manager.delete(&ctx, &draft.id).unwrap();
        assert!(store.get(&ctx, &draft.id).unwrap().is_none());

        let confirmed = seed_group(&store, &ctx, dec!(10), dec!(10));
        manager.confirm(&ctx, &confirmed.id).unwrap();
        let err = manager.delete(&ctx, &confirmed.id).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn concurrent_edit_surfaces_as_conflict() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(10), dec!(10));

        // Another editor bumps the version after our preview.
        let mut edit = group.clone();
        edit.description = "edited elsewhere".into();
        store.update(&ctx, edit, group.version).unwrap();

        // A confirm built on the stale record conflicts at the store.
        let mut stale = group.clone();
        stale.status = TransactionStatus::Confirmed;
        let err = store.update(&ctx, stale, group.version).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn preview_reports_without_persisting() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = seed_group(&store, &ctx, dec!(1000), dec!(500));
        let manager = StatusLifecycleManager::new(&store, &NoSettlements);

        let preview = manager.preview(&ctx, &group.id).unwrap();
        assert!(!preview.confirmable());
        assert_eq!(preview.balance.difference, dec!(500));
        assert!(preview.report.is_valid());

        let stored = store.get(&ctx, &group.id).unwrap().unwrap();
        assert_eq!(stored.version, group.version);
    }
}
