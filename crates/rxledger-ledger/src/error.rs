use rust_decimal::Decimal;
use rxledger_store::StoreError;
use rxledger_types::{GroupId, TransactionStatus};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Debit and credit totals differ by more than the tolerance.
    #[error(
        "group {group} is unbalanced: debit {total_debit}, credit {total_credit}, \
         difference {difference}"
    )]
    Unbalanced {
        group: GroupId,
        total_debit: Decimal,
        total_credit: Decimal,
        difference: Decimal,
    },

    /// Structural validation failed (entry count, dual-sided amounts,
    /// negative amounts, sequence numbering).
    #[error("group {group} failed validation: {detail}")]
    Validation { group: GroupId, detail: String },

    /// The operation is not allowed from the group's current status.
    #[error("cannot {operation} group {group} while {from}")]
    InvalidState {
        group: GroupId,
        from: TransactionStatus,
        operation: &'static str,
    },

    /// Unlock blocked: a downstream consumer reports this group as settled.
    #[error("group {group} has a recorded paid amount downstream; unlock refused")]
    SettledDownstream { group: GroupId },

    /// The group does not exist in the caller's organization.
    #[error("transaction group not found: {0}")]
    NotFound(GroupId),

    /// An external collaborator (settlement probe, account directory) failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
