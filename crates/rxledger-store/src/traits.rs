use rxledger_types::{AccountId, GroupId, OperationContext, TransactionGroup};

use crate::error::StoreResult;
use crate::query::{AccountStatistics, GroupQuery};

/// Persistence boundary for transaction groups.
///
/// All implementations must satisfy these invariants:
/// - A group and its owned entries are written as one atomic unit; a group
///   without its entries, or entries without their group, never becomes
///   visible.
/// - Every read and write is scoped to `ctx.organization`; records outside
///   the scope behave as if they did not exist.
/// - Writes are guarded by an optimistic-concurrency version; stale writes
///   fail with [`StoreError::Conflict`] instead of clobbering.
/// - Entry sets are immutable once the stored status leaves draft.
/// - Derived caches (`total_amount`, `funding_type`) are normalized on write.
///
/// [`StoreError::Conflict`]: crate::error::StoreError::Conflict
pub trait GroupStore: Send + Sync {
    /// Insert a new group together with its entries.
    ///
    /// Rejects duplicate ids, entries owned by a different group, and
    /// duplicate or non-contiguous entry sequences.
    fn create(&self, ctx: &OperationContext, group: TransactionGroup)
        -> StoreResult<TransactionGroup>;

    /// Read one group. Returns `Ok(None)` when absent or out of scope.
    fn get(&self, ctx: &OperationContext, id: &GroupId) -> StoreResult<Option<TransactionGroup>>;

    /// List groups matching the query, ordered by id (creation order).
    fn list(&self, ctx: &OperationContext, query: &GroupQuery)
        -> StoreResult<Vec<TransactionGroup>>;

    /// All group ids in the organization, ascending. Stable iteration order
    /// for batch tooling and checkpointed repair runs.
    fn list_ids(&self, ctx: &OperationContext) -> StoreResult<Vec<GroupId>>;

    /// Replace a group and its entries, compare-and-swap on `expected_version`.
    ///
    /// The status transition carried by `group` is applied in the same swap,
    /// so a confirm that validated stale entries fails with a conflict
    /// instead of committing.
    fn update(
        &self,
        ctx: &OperationContext,
        group: TransactionGroup,
        expected_version: u64,
    ) -> StoreResult<TransactionGroup>;

    /// Delete a group and its entries together. Version-guarded like
    /// [`update`](GroupStore::update).
    fn delete(
        &self,
        ctx: &OperationContext,
        id: &GroupId,
        expected_version: u64,
    ) -> StoreResult<()>;

    /// Atomically record `consumer` in `source.linked_transaction_ids`.
    ///
    /// The append is serialized inside the store (array-union semantics), so
    /// concurrent consumers drawing on the same source never lose updates.
    /// Returns `false` when the link was already present.
    fn link_consumer(
        &self,
        ctx: &OperationContext,
        source: &GroupId,
        consumer: &GroupId,
    ) -> StoreResult<bool>;

    /// Aggregate statistics for one account across every group touching it.
    fn account_statistics(
        &self,
        ctx: &OperationContext,
        account: &AccountId,
    ) -> StoreResult<AccountStatistics>;
}
