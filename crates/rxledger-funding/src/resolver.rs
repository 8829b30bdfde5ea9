//! Maintaining and querying the funding graph.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rxledger_store::GroupStore;
use rxledger_types::{
    GroupId, OperationContext, TransactionGroup, TransactionStatus, MAX_FUNDING_DEPTH,
};

use crate::error::{FundingError, FundingResult};

/// Placeholder rendered for data the read path could not resolve.
const MISSING: &str = "—";

/// Lightweight projection of a consumer group linked to a source.
///
/// Reflects live status; a dangling link degrades to [`MISSING`] placeholder
/// values instead of failing the whole read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedGroupSummary {
    pub id: GroupId,
    pub group_number: String,
    pub description: String,
    pub transaction_date: Option<NaiveDate>,
    pub total_amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
}

impl LinkedGroupSummary {
    fn of(group: &TransactionGroup) -> Self {
        Self {
            id: group.id,
            group_number: group.group_number.to_string(),
            description: group.description.clone(),
            transaction_date: Some(group.transaction_date),
            total_amount: Some(group.total_amount),
            status: Some(group.status),
        }
    }

    fn missing(id: GroupId) -> Self {
        Self {
            id,
            group_number: MISSING.into(),
            description: MISSING.into(),
            transaction_date: None,
            total_amount: None,
            status: None,
        }
    }
}

/// One hop in a backward funding walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSource {
    pub source: GroupId,
    /// Amount the downstream group drew on this source: the sum of its
    /// entries tracing to the source, or its total when untraced.
    pub used_amount: Decimal,
    pub source_description: String,
    pub source_group_number: String,
    pub source_date: Option<NaiveDate>,
    pub source_amount: Option<Decimal>,
}

/// Result of [`FundingChainResolver::funding_sources`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSourceReport {
    /// Hops ordered nearest source first.
    pub sources: Vec<FundingSource>,
    /// Set when the walk hit the depth bound or unresolvable data. Logged at
    /// detection; repair tooling picks it up from there.
    pub truncated: bool,
}

/// The derived ancestor chain of a group, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingChain {
    pub ids: Vec<GroupId>,
    pub truncated: bool,
}

/// Outcome of [`FundingChainResolver::record_usage`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecorded {
    pub source: GroupId,
    pub consumer: GroupId,
    pub used_amount: Decimal,
    /// `false` when the link already existed (idempotent re-record).
    pub newly_linked: bool,
    /// The funding path stamped on the consumer's tracing entries.
    pub funding_path: Vec<GroupId>,
}

/// Maintains and queries the directed funding graph stored in the groups.
///
/// The resolver is authoritative for `funding_type` and entry
/// `funding_path`s on write; the stored fields are read caches.
pub struct FundingChainResolver<'a, S> {
    store: &'a S,
}

impl<'a, S: GroupStore> FundingChainResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Record that `consumer` drew `used_amount` from `source`.
    ///
    /// Appends the consumer to the source's linked ids (idempotent,
    /// serialized in the store) and stamps the consumer's funding fields.
    pub fn record_usage(
        &self,
        ctx: &OperationContext,
        source: &GroupId,
        consumer: &GroupId,
        used_amount: Decimal,
    ) -> FundingResult<UsageRecorded> {
        if source == consumer {
            return Err(FundingError::SelfFunding(*source));
        }

        let source_group = self.load(ctx, source)?;
        let mut consumer_group = self.load(ctx, consumer)?;

        if used_amount <= Decimal::ZERO || used_amount > source_group.total_amount {
            return Err(FundingError::InvalidAmount {
                source_group: *source,
                amount: used_amount,
                available: source_group.total_amount,
            });
        }

        if let Some(existing) = consumer_group.source_transaction_id {
            if existing != *source {
                return Err(FundingError::AlreadyFunded {
                    consumer: *consumer,
                    existing,
                });
            }
        }

        // The source drawing (transitively) on the consumer, or the source
        // already sitting in the consumer's recorded path, would close a loop.
        let source_chain = self.chain_of(ctx, &source_group)?;
        if source_chain.ids.contains(consumer) {
            return Err(FundingError::Cycle {
                source_group: *source,
                consumer: *consumer,
            });
        }
        let recorded_path = consumer_group
            .entries
            .iter()
            .any(|e| e.funding_path.contains(source) && e.source_transaction_id != Some(*source));
        if recorded_path {
            return Err(FundingError::Cycle {
                source_group: *source,
                consumer: *consumer,
            });
        }

        let mut funding_path = source_chain.ids;
        funding_path.push(*source);

        // Stamp the consumer before touching the source's links: if the
        // version-guarded write fails, no half-recorded link is left behind.
        let expected_version = consumer_group.version;
        consumer_group.source_transaction_id = Some(*source);
        for entry in &mut consumer_group.entries {
            if entry.source_transaction_id == Some(*source) {
                entry.funding_path = funding_path.clone();
            }
        }
        // funding_type is re-derived by the store on write.
        self.store.update(ctx, consumer_group, expected_version)?;

        let newly_linked = self.store.link_consumer(ctx, source, consumer)?;

        debug!(
            source = %source.short_id(),
            consumer = %consumer.short_id(),
            amount = %used_amount,
            newly_linked,
            "recorded funding usage"
        );

        Ok(UsageRecorded {
            source: *source,
            consumer: *consumer,
            used_amount,
            newly_linked,
            funding_path,
        })
    }

    /// Summaries of every group currently linked as a consumer of `id`.
    pub fn referenced_by(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
    ) -> FundingResult<Vec<LinkedGroupSummary>> {
        let group = self.load(ctx, id)?;
        let mut summaries = Vec::with_capacity(group.linked_transaction_ids.len());
        for consumer_id in &group.linked_transaction_ids {
            match self.store.get(ctx, consumer_id)? {
                Some(consumer) => summaries.push(LinkedGroupSummary::of(&consumer)),
                None => {
                    warn!(
                        source = %id.short_id(),
                        consumer = %consumer_id.short_id(),
                        "linked consumer missing; rendering placeholder"
                    );
                    summaries.push(LinkedGroupSummary::missing(*consumer_id));
                }
            }
        }
        Ok(summaries)
    }

    /// Walk the funding ancestry of `id` backward, nearest source first.
    pub fn funding_sources(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
    ) -> FundingResult<FundingSourceReport> {
        let start = self.load(ctx, id)?;
        let mut report = FundingSourceReport::default();
        let mut visited: HashSet<GroupId> = HashSet::new();
        visited.insert(start.id);

        let mut current = start;
        while let Some(source_id) = current.source_transaction_id {
            if report.sources.len() >= MAX_FUNDING_DEPTH {
                warn!(
                    group = %id.short_id(),
                    depth = report.sources.len(),
                    "funding chain exceeds depth bound; truncating walk"
                );
                report.truncated = true;
                break;
            }
            if !visited.insert(source_id) {
                warn!(
                    group = %id.short_id(),
                    source = %source_id.short_id(),
                    "cycle in stored funding data; truncating walk"
                );
                report.truncated = true;
                break;
            }

            let used_amount = Self::drawn_from(&current, &source_id);
            match self.store.get(ctx, &source_id)? {
                Some(source) => {
                    report.sources.push(FundingSource {
                        source: source_id,
                        used_amount,
                        source_description: source.description.clone(),
                        source_group_number: source.group_number.to_string(),
                        source_date: Some(source.transaction_date),
                        source_amount: Some(source.total_amount),
                    });
                    current = source;
                }
                None => {
                    warn!(
                        group = %id.short_id(),
                        source = %source_id.short_id(),
                        "funding source missing; rendering placeholder and stopping walk"
                    );
                    report.sources.push(FundingSource {
                        source: source_id,
                        used_amount,
                        source_description: MISSING.into(),
                        source_group_number: MISSING.into(),
                        source_date: None,
                        source_amount: None,
                    });
                    report.truncated = true;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// The ancestor id chain of a group, oldest first. Bounded like
    /// [`funding_sources`](FundingChainResolver::funding_sources).
    pub fn funding_chain(&self, ctx: &OperationContext, id: &GroupId) -> FundingResult<FundingChain> {
        let group = self.load(ctx, id)?;
        self.chain_of(ctx, &group)
    }

    fn chain_of(
        &self,
        ctx: &OperationContext,
        group: &TransactionGroup,
    ) -> FundingResult<FundingChain> {
        let mut chain = FundingChain::default();
        let mut visited: HashSet<GroupId> = HashSet::new();
        visited.insert(group.id);

        let mut next = group.source_transaction_id;
        while let Some(source_id) = next {
            if chain.ids.len() >= MAX_FUNDING_DEPTH {
                warn!(group = %group.id.short_id(), "funding chain exceeds depth bound");
                chain.truncated = true;
                break;
            }
            if !visited.insert(source_id) {
                warn!(group = %group.id.short_id(), "cycle in stored funding data");
                chain.truncated = true;
                break;
            }
            match self.store.get(ctx, &source_id)? {
                Some(source) => {
                    chain.ids.push(source_id);
                    next = source.source_transaction_id;
                }
                None => {
                    warn!(
                        group = %group.id.short_id(),
                        source = %source_id.short_id(),
                        "funding source missing while resolving chain"
                    );
                    chain.ids.push(source_id);
                    chain.truncated = true;
                    break;
                }
            }
        }

        chain.ids.reverse();
        Ok(chain)
    }

    /// Amount `group` drew on `source`: entries tracing to the source, or
    /// the group total when nothing is traced at entry level.
    fn drawn_from(group: &TransactionGroup, source: &GroupId) -> Decimal {
        let traced: Decimal = group
            .entries
            .iter()
            .filter(|e| e.source_transaction_id.as_ref() == Some(source))
            .map(|e| e.amount())
            .sum();
        if traced > Decimal::ZERO {
            traced
        } else {
            group.total_amount
        }
    }

    fn load(&self, ctx: &OperationContext, id: &GroupId) -> FundingResult<TransactionGroup> {
        self.store
            .get(ctx, id)?
            .ok_or(FundingError::NotFound(*id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use rxledger_store::InMemoryGroupStore;
    use rxledger_types::{
        AccountId, EmbeddedEntry, FundingType, OrganizationId, UserId,
    };

    use super::*;

    fn ctx() -> OperationContext {
        OperationContext::new(OrganizationId::new(), UserId::new())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn seed(
        store: &InMemoryGroupStore,
        ctx: &OperationContext,
        label: &str,
        amount: Decimal,
    ) -> TransactionGroup {
        let mut group = TransactionGroup::draft(ctx, "TXN-0001".into(), label, date());
        group.push_entry(EmbeddedEntry::debit(
            ctx,
            group.id,
            0,
            AccountId::new(),
            amount,
            label,
        ));
        group.push_entry(EmbeddedEntry::credit(
            ctx,
            group.id,
            0,
            AccountId::new(),
            amount,
            label,
        ));
        store.create(ctx, group).unwrap()
    }

    #[test]
    fn record_usage_links_and_stamps_consumer() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let source = seed(&store, &ctx, "source", dec!(1000));
        let mut consumer = seed(&store, &ctx, "consumer", dec!(300));

        // The consumer's debit line traces to the source.
        consumer.entries[0].source_transaction_id = Some(source.id);
        let consumer = store.update(&ctx, consumer.clone(), consumer.version).unwrap();

        let recorded = resolver
            .record_usage(&ctx, &source.id, &consumer.id, dec!(300))
            .unwrap();
        assert!(recorded.newly_linked);
        assert_eq!(recorded.funding_path, vec![source.id]);

        let source = store.get(&ctx, &source.id).unwrap().unwrap();
        assert_eq!(source.linked_transaction_ids, vec![consumer.id]);

        let consumer = store.get(&ctx, &consumer.id).unwrap().unwrap();
        assert_eq!(consumer.source_transaction_id, Some(source.id));
        assert_eq!(consumer.funding_type, FundingType::Extended);
        assert_eq!(consumer.entries[0].funding_path, vec![source.id]);
        assert!(consumer.entries[1].funding_path.is_empty());
    }

    #[test]
    fn record_usage_is_idempotent() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let source = seed(&store, &ctx, "source", dec!(1000));
        let consumer = seed(&store, &ctx, "consumer", dec!(200));

        let first = resolver
            .record_usage(&ctx, &source.id, &consumer.id, dec!(200))
            .unwrap();
        let second = resolver
            .record_usage(&ctx, &source.id, &consumer.id, dec!(200))
            .unwrap();
        assert!(first.newly_linked);
        assert!(!second.newly_linked);

        let source = store.get(&ctx, &source.id).unwrap().unwrap();
        assert_eq!(source.linked_transaction_ids, vec![consumer.id]);
    }

    #[test]
    fn confirmed_consumer_is_rejected_without_linking() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let source = seed(&store, &ctx, "source", dec!(1000));
        let mut consumer = seed(&store, &ctx, "consumer", dec!(300));
        consumer.entries[0].source_transaction_id = Some(source.id);
        let mut consumer = store.update(&ctx, consumer.clone(), consumer.version).unwrap();
        consumer.status = TransactionStatus::Confirmed;
        let consumer = store.update(&ctx, consumer.clone(), consumer.version).unwrap();

        // Stamping funding_path is an entry mutation, so a confirmed
        // consumer refuses it and the source must stay unlinked.
        let err = resolver
            .record_usage(&ctx, &source.id, &consumer.id, dec!(300))
            .unwrap_err();
        assert!(matches!(
            err,
            FundingError::Store(rxledger_store::StoreError::EntriesImmutable { .. })
        ));

        let source = store.get(&ctx, &source.id).unwrap().unwrap();
        assert!(source.linked_transaction_ids.is_empty());

        let consumer = store.get(&ctx, &consumer.id).unwrap().unwrap();
        assert_eq!(consumer.source_transaction_id, None);
        assert!(consumer.entries[0].funding_path.is_empty());
    }

    #[test]
    fn self_funding_is_rejected() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);
        let group = seed(&store, &ctx, "group", dec!(100));

        let err = resolver
            .record_usage(&ctx, &group.id, &group.id, dec!(50))
            .unwrap_err();
        assert_eq!(err, FundingError::SelfFunding(group.id));
    }

    #[test]
    fn reverse_link_is_a_cycle() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let a = seed(&store, &ctx, "a", dec!(1000));
        let b = seed(&store, &ctx, "b", dec!(500));

        resolver.record_usage(&ctx, &a.id, &b.id, dec!(300)).unwrap();
        let err = resolver
            .record_usage(&ctx, &b.id, &a.id, dec!(100))
            .unwrap_err();
        assert_eq!(err, FundingError::Cycle { source_group: b.id, consumer: a.id });
    }

    #[test]
    fn deep_cycle_is_detected() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let a = seed(&store, &ctx, "a", dec!(1000));
        let b = seed(&store, &ctx, "b", dec!(500));
        let c = seed(&store, &ctx, "c", dec!(200));

        resolver.record_usage(&ctx, &a.id, &b.id, dec!(500)).unwrap();
        resolver.record_usage(&ctx, &b.id, &c.id, dec!(200)).unwrap();
        let err = resolver
            .record_usage(&ctx, &c.id, &a.id, dec!(100))
            .unwrap_err();
        assert!(matches!(err, FundingError::Cycle { .. }));
    }

    #[test]
    fn usage_amount_is_bounded_by_source_total() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let source = seed(&store, &ctx, "source", dec!(100));
        let consumer = seed(&store, &ctx, "consumer", dec!(50));

        for bad in [dec!(0), dec!(-5), dec!(100.01)] {
            let err = resolver
                .record_usage(&ctx, &source.id, &consumer.id, bad)
                .unwrap_err();
            assert!(matches!(err, FundingError::InvalidAmount { .. }));
        }
    }

    #[test]
    fn repointing_to_a_different_source_is_rejected() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let first = seed(&store, &ctx, "first", dec!(100));
        let second = seed(&store, &ctx, "second", dec!(100));
        let consumer = seed(&store, &ctx, "consumer", dec!(50));

        resolver
            .record_usage(&ctx, &first.id, &consumer.id, dec!(50))
            .unwrap();
        let err = resolver
            .record_usage(&ctx, &second.id, &consumer.id, dec!(50))
            .unwrap_err();
        assert_eq!(
            err,
            FundingError::AlreadyFunded { consumer: consumer.id, existing: first.id }
        );
    }

    #[test]
    fn referenced_by_reflects_live_status() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let source = seed(&store, &ctx, "source", dec!(1000));
        let consumer = seed(&store, &ctx, "consumer", dec!(400));
        resolver
            .record_usage(&ctx, &source.id, &consumer.id, dec!(400))
            .unwrap();

        let summaries = resolver.referenced_by(&ctx, &source.id).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, consumer.id);
        assert_eq!(summaries[0].description, "consumer");
        assert_eq!(summaries[0].total_amount, Some(dec!(400)));
        assert_eq!(summaries[0].status, Some(consumer.status));
    }

    #[test]
    fn dangling_consumer_degrades_to_placeholder() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let source = seed(&store, &ctx, "source", dec!(1000));
        let ghost = GroupId::new();
        store.link_consumer(&ctx, &source.id, &ghost).unwrap();

        let summaries = resolver.referenced_by(&ctx, &source.id).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, ghost);
        assert_eq!(summaries[0].group_number, "—");
        assert_eq!(summaries[0].status, None);
    }

    #[test]
    fn funding_sources_walks_the_chain() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let a = seed(&store, &ctx, "a", dec!(1000));
        let mut b = seed(&store, &ctx, "b", dec!(600));
        b.entries[0].source_transaction_id = Some(a.id);
        let b = store.update(&ctx, b.clone(), b.version).unwrap();
        let c = seed(&store, &ctx, "c", dec!(250));

        resolver.record_usage(&ctx, &a.id, &b.id, dec!(600)).unwrap();
        resolver.record_usage(&ctx, &b.id, &c.id, dec!(250)).unwrap();

        let report = resolver.funding_sources(&ctx, &c.id).unwrap();
        assert!(!report.truncated);
        assert_eq!(report.sources.len(), 2);
        // Nearest source first.
        assert_eq!(report.sources[0].source, b.id);
        assert_eq!(report.sources[0].used_amount, dec!(250));
        assert_eq!(report.sources[1].source, a.id);
        assert_eq!(report.sources[1].used_amount, dec!(600));
        assert_eq!(report.sources[1].source_description, "a");

        let chain = resolver.funding_chain(&ctx, &c.id).unwrap();
        assert_eq!(chain.ids, vec![a.id, b.id]);

        // Acyclicity: a group never appears in its own chain.
        assert!(!chain.ids.contains(&c.id));
    }

    #[test]
    fn funding_sources_of_original_group_is_empty() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);
        let group = seed(&store, &ctx, "solo", dec!(10));

        let report = resolver.funding_sources(&ctx, &group.id).unwrap();
        assert!(report.sources.is_empty());
        assert!(!report.truncated);
    }

    #[test]
    fn missing_source_degrades_and_truncates() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let mut group = seed(&store, &ctx, "orphaned", dec!(10));
        group.source_transaction_id = Some(GroupId::new());
        let group = store.update(&ctx, group.clone(), group.version).unwrap();

        let report = resolver.funding_sources(&ctx, &group.id).unwrap();
        assert!(report.truncated);
        assert_eq!(report.sources.len(), 1);
        assert_eq!(report.sources[0].source_group_number, "—");
        assert_eq!(report.sources[0].source_amount, None);
    }

    #[test]
    fn walk_is_bounded_at_max_depth() {
        let store = InMemoryGroupStore::new();
        let ctx = ctx();
        let resolver = FundingChainResolver::new(&store);

        let mut previous = seed(&store, &ctx, "root", dec!(10000));
        for i in 0..MAX_FUNDING_DEPTH + 5 {
            let next = seed(&store, &ctx, &format!("hop-{i}"), dec!(10));
            resolver
                .record_usage(&ctx, &previous.id, &next.id, dec!(1))
                .unwrap();
            previous = store.get(&ctx, &next.id).unwrap().unwrap();
        }

        let report = resolver.funding_sources(&ctx, &previous.id).unwrap();
        assert!(report.truncated);
        assert_eq!(report.sources.len(), MAX_FUNDING_DEPTH);
    }
}
