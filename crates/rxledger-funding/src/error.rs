use rust_decimal::Decimal;
use rxledger_store::StoreError;
use rxledger_types::GroupId;

/// Errors from funding-chain operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FundingError {
    /// A group cannot draw funding from itself.
    #[error("group {0} cannot fund itself")]
    SelfFunding(GroupId),

    /// Linking would close a loop in the funding graph.
    #[error("linking source {source_group} to consumer {consumer} would create a funding cycle")]
    Cycle {
        source_group: GroupId,
        consumer: GroupId,
    },

    /// The consumer already draws on a different source.
    #[error("consumer {consumer} already draws funding from {existing}")]
    AlreadyFunded { consumer: GroupId, existing: GroupId },

    /// The drawn amount is non-positive or exceeds the source's balance.
    #[error("invalid usage amount {amount} against source {source_group} (total {available})")]
    InvalidAmount {
        source_group: GroupId,
        amount: Decimal,
        available: Decimal,
    },

    /// The group does not exist in the caller's organization.
    #[error("transaction group not found: {0}")]
    NotFound(GroupId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for funding operations.
pub type FundingResult<T> = Result<T, FundingError>;
