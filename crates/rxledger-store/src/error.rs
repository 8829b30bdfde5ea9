use rxledger_types::{GroupId, TransactionStatus};

/// Errors from group store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested group does not exist in the caller's organization.
    #[error("transaction group not found: {0}")]
    NotFound(GroupId),

    /// A group with this id already exists.
    #[error("transaction group already exists: {0}")]
    AlreadyExists(GroupId),

    /// Stale optimistic-concurrency token; the caller must reload.
    #[error("stale write on group {group}: expected version {expected}, stored version {actual}")]
    Conflict {
        group: GroupId,
        expected: u64,
        actual: u64,
    },

    /// Entry mutation attempted while the group is not draft.
    #[error("entries of group {group} are immutable in status {status}")]
    EntriesImmutable {
        group: GroupId,
        status: TransactionStatus,
    },

    /// An entry does not belong to the group being written.
    #[error("orphan entry at sequence {sequence}: owner {owner} does not match group {group}")]
    OrphanEntry {
        group: GroupId,
        owner: GroupId,
        sequence: u32,
    },

    /// Duplicate or non-contiguous entry sequences.
    #[error("sequence violation in group {group}: {detail}")]
    SequenceViolation { group: GroupId, detail: String },

    /// The store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Serialization failure in a persistent backend.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
