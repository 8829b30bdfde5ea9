use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use rxledger_types::{AccountId, GroupId, OperationContext, TransactionGroup};

use crate::error::{StoreError, StoreResult};
use crate::query::{AccountStatistics, GroupQuery};
use crate::traits::GroupStore;

/// In-memory store implementation for tests, offline tooling, and embedding.
///
/// A single `RwLock` over the group map gives the atomicity the trait
/// demands: a group and its entries always change together, and the
/// version-guarded swap in [`update`](GroupStore::update) happens entirely
/// under the write lock.
#[derive(Default)]
pub struct InMemoryGroupStore {
    inner: RwLock<HashMap<GroupId, TransactionGroup>>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups across all organizations. Test/tooling helper.
    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_structure(group: &TransactionGroup) -> StoreResult<()> {
        for entry in &group.entries {
            if entry.group_id != group.id {
                return Err(StoreError::OrphanEntry {
                    group: group.id,
                    owner: entry.group_id,
                    sequence: entry.sequence,
                });
            }
        }
        let violations = group.sequence_violations();
        if let Some(first) = violations.first() {
            return Err(StoreError::SequenceViolation {
                group: group.id,
                detail: format!("{first:?}"),
            });
        }
        Ok(())
    }
}

impl GroupStore for InMemoryGroupStore {
    fn create(
        &self,
        ctx: &OperationContext,
        mut group: TransactionGroup,
    ) -> StoreResult<TransactionGroup> {
        Self::check_structure(&group)?;

        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        if state.contains_key(&group.id) {
            return Err(StoreError::AlreadyExists(group.id));
        }

        group.organization = ctx.organization;
        for entry in &mut group.entries {
            entry.organization = ctx.organization;
        }
        group.refresh_caches();
        group.version = 1;
        group.updated_at = Utc::now();

        debug!(group = %group.id.short_id(), entries = group.entries.len(), "created group");
        state.insert(group.id, group.clone());
        Ok(group)
    }

    fn get(&self, ctx: &OperationContext, id: &GroupId) -> StoreResult<Option<TransactionGroup>> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state
            .get(id)
            .filter(|g| g.organization == ctx.organization)
            .cloned())
    }

    fn list(
        &self,
        ctx: &OperationContext,
        query: &GroupQuery,
    ) -> StoreResult<Vec<TransactionGroup>> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut groups: Vec<TransactionGroup> = state
            .values()
            .filter(|g| g.organization == ctx.organization && query.matches(g))
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    fn list_ids(&self, ctx: &OperationContext) -> StoreResult<Vec<GroupId>> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut ids: Vec<GroupId> = state
            .values()
            .filter(|g| g.organization == ctx.organization)
            .map(|g| g.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn update(
        &self,
        ctx: &OperationContext,
        mut group: TransactionGroup,
        expected_version: u64,
    ) -> StoreResult<TransactionGroup> {
        Self::check_structure(&group)?;

        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = state
            .get(&group.id)
            .filter(|g| g.organization == ctx.organization)
            .ok_or(StoreError::NotFound(group.id))?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                group: group.id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        if !stored.status.allows_entry_mutation() && stored.entries != group.entries {
            return Err(StoreError::EntriesImmutable {
                group: group.id,
                status: stored.status,
            });
        }

        // Identity and provenance never change on update.
        group.organization = stored.organization;
        group.created_at = stored.created_at;
        group.created_by = stored.created_by;
        group.refresh_caches();
        group.version = stored.version + 1;
        group.updated_at = Utc::now();

        debug!(
            group = %group.id.short_id(),
            version = group.version,
            status = %group.status,
            "updated group"
        );
        state.insert(group.id, group.clone());
        Ok(group)
    }

    fn delete(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
        expected_version: u64,
    ) -> StoreResult<()> {
        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = state
            .get(id)
            .filter(|g| g.organization == ctx.organization)
            .ok_or(StoreError::NotFound(*id))?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                group: *id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        state.remove(id);
        debug!(group = %id.short_id(), "deleted group");
        Ok(())
    }

    fn link_consumer(
        &self,
        ctx: &OperationContext,
        source: &GroupId,
        consumer: &GroupId,
    ) -> StoreResult<bool> {
        let mut state = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = state
            .get_mut(source)
            .filter(|g| g.organization == ctx.organization)
            .ok_or(StoreError::NotFound(*source))?;

        if stored.linked_transaction_ids.contains(consumer) {
            return Ok(false);
        }

        stored.linked_transaction_ids.push(*consumer);
        stored.version += 1;
        stored.updated_at = Utc::now();
        debug!(
            source = %source.short_id(),
            consumer = %consumer.short_id(),
            "linked funding consumer"
        );
        Ok(true)
    }

    fn account_statistics(
        &self,
        ctx: &OperationContext,
        account: &AccountId,
    ) -> StoreResult<AccountStatistics> {
        let state = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut groups: Vec<&TransactionGroup> = state
            .values()
            .filter(|g| g.organization == ctx.organization)
            .collect();
        groups.sort_by_key(|g| g.id);

        let mut stats = AccountStatistics::empty(*account);
        for group in groups {
            stats.absorb(group);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use rxledger_types::{
        EmbeddedEntry, FundingType, OrganizationId, TransactionStatus, UserId,
    };

    use super::*;

    fn ctx() -> OperationContext {
        OperationContext::new(OrganizationId::new(), UserId::new())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn balanced_group(ctx: &OperationContext, amount: rust_decimal::Decimal) -> TransactionGroup {
        let mut group = TransactionGroup::draft(ctx, "TXN-0001".into(), "purchase", date());
        group.push_entry(EmbeddedEntry::debit(
            ctx,
            group.id,
            0,
            AccountId::new(),
            amount,
            "inventory",
        ));
        group.push_entry(EmbeddedEntry::credit(
            ctx,
            group.id,
            0,
            AccountId::new(),
            amount,
            "cash",
        ));
        group
    }

    #[test]
    fn create_then_get_roundtrip() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let created = store.create(&ctx, balanced_group(&ctx, dec!(1000))).unwrap();

        assert_eq!(created.version, 1);
        assert_eq!(created.total_amount, dec!(1000));

        let loaded = store.get(&ctx, &created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.entries.len(), 2);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let group = balanced_group(&ctx, dec!(10));
        store.create(&ctx, group.clone()).unwrap();
        let err = store.create(&ctx, group).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn orphan_entry_is_rejected() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let mut group = balanced_group(&ctx, dec!(10));
        group.entries[1].group_id = GroupId::new();

        let err = store.create(&ctx, group).unwrap_err();
        assert!(matches!(err, StoreError::OrphanEntry { sequence: 2, .. }));
    }

    #[test]
    fn sequence_violation_is_rejected() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let mut group = balanced_group(&ctx, dec!(10));
        group.entries[1].sequence = 1;

        let err = store.create(&ctx, group).unwrap_err();
        assert!(matches!(err, StoreError::SequenceViolation { .. }));
    }

    #[test]
    fn reads_are_organization_scoped() {
        let store = InMemoryGroupStore::new();
        let ctx_a = ctx();
        let ctx_b = ctx();
        let created = store.create(&ctx_a, balanced_group(&ctx_a, dec!(10))).unwrap();

        assert!(store.get(&ctx_b, &created.id).unwrap().is_none());
        assert!(store.list(&ctx_b, &GroupQuery::all()).unwrap().is_empty());
        assert!(matches!(
            store.update(&ctx_b, created.clone(), created.version),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn stale_update_conflicts() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let created = store.create(&ctx, balanced_group(&ctx, dec!(10))).unwrap();

        // First editor wins.
        let mut edit = created.clone();
        edit.description = "first".into();
        store.update(&ctx, edit, created.version).unwrap();

        // Second editor still holds the old version.
        let mut stale = created.clone();
        stale.description = "second".into();
        let err = store.update(&ctx, stale, created.version).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict { expected: 1, actual: 2, .. }
        ));
    }

    #[test]
    fn entries_locked_outside_draft() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let mut created = store.create(&ctx, balanced_group(&ctx, dec!(10))).unwrap();

        created.status = TransactionStatus::Confirmed;
        let confirmed = store.update(&ctx, created.clone(), created.version).unwrap();

        let mut tampered = confirmed.clone();
        tampered.entries[0].debit_amount = dec!(999);
        let err = store.update(&ctx, tampered, confirmed.version).unwrap_err();
        assert!(matches!(
            err,
            StoreError::EntriesImmutable { status: TransactionStatus::Confirmed, .. }
        ));

        // Non-entry fields stay editable.
        let mut relabel = confirmed.clone();
        relabel.invoice_no = Some("INV-77".into());
        store.update(&ctx, relabel, confirmed.version).unwrap();
    }

    #[test]
    fn update_refreshes_caches() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let created = store.create(&ctx, balanced_group(&ctx, dec!(10))).unwrap();

        let mut edit = created.clone();
        edit.source_transaction_id = Some(GroupId::new());
        edit.funding_type = FundingType::Original; // stale cache on purpose
        let updated = store.update(&ctx, edit, created.version).unwrap();
        assert_eq!(updated.funding_type, FundingType::Extended);
    }

    #[test]
    fn delete_removes_group_and_entries() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let created = store.create(&ctx, balanced_group(&ctx, dec!(10))).unwrap();

        store.delete(&ctx, &created.id, created.version).unwrap();
        assert!(store.get(&ctx, &created.id).unwrap().is_none());
        assert!(matches!(
            store.delete(&ctx, &created.id, created.version),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn link_consumer_is_idempotent() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let source = store.create(&ctx, balanced_group(&ctx, dec!(10))).unwrap();
        let consumer = GroupId::new();

        assert!(store.link_consumer(&ctx, &source.id, &consumer).unwrap());
        assert!(!store.link_consumer(&ctx, &source.id, &consumer).unwrap());

        let reloaded = store.get(&ctx, &source.id).unwrap().unwrap();
        assert_eq!(reloaded.linked_transaction_ids, vec![consumer]);
    }

    #[test]
    fn list_filters_by_status_and_account() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let account = AccountId::new();

        let mut tracked = TransactionGroup::draft(&ctx, "TXN-0002".into(), "tracked", date());
        tracked.push_entry(EmbeddedEntry::debit(
            &ctx,
            tracked.id,
            0,
            account,
            dec!(50),
            "debit",
        ));
        tracked.push_entry(EmbeddedEntry::credit(
            &ctx,
            tracked.id,
            0,
            AccountId::new(),
            dec!(50),
            "credit",
        ));
        store.create(&ctx, tracked).unwrap();
        store.create(&ctx, balanced_group(&ctx, dec!(10))).unwrap();

        let by_account = store
            .list(&ctx, &GroupQuery::all().with_account(account))
            .unwrap();
        assert_eq!(by_account.len(), 1);

        let drafts = store
            .list(&ctx, &GroupQuery::all().with_status(TransactionStatus::Draft))
            .unwrap();
        assert_eq!(drafts.len(), 2);

        let confirmed = store
            .list(
                &ctx,
                &GroupQuery::all().with_status(TransactionStatus::Confirmed),
            )
            .unwrap();
        assert!(confirmed.is_empty());
    }

    #[test]
    fn account_statistics_aggregate() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let account = AccountId::new();

        for (day, amount) in [(10u32, dec!(100)), (12, dec!(300))] {
            let mut group = TransactionGroup::draft(
                &ctx,
                "TXN-0003".into(),
                "stat",
                NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
            );
            group.push_entry(EmbeddedEntry::debit(
                &ctx, group.id, 0, account, amount, "debit",
            ));
            group.push_entry(EmbeddedEntry::credit(
                &ctx,
                group.id,
                0,
                AccountId::new(),
                amount,
                "credit",
            ));
            store.create(&ctx, group).unwrap();
        }

        let stats = store.account_statistics(&ctx, &account).unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.total_debit, dec!(400));
        assert_eq!(stats.net, dec!(400));
        assert_eq!(stats.average_amount, dec!(200));
        assert_eq!(
            stats.last_transaction_date,
            Some(NaiveDate::from_ymd_opt(2026, 8, 12).unwrap())
        );
    }
}
