use rxledger_types::{AccountId, AccountInfo, GroupId};

use crate::error::LedgerError;

/// Payment/inventory reconciliation boundary.
///
/// Downstream consumers record settled amounts against confirmed groups;
/// a group with a recorded paid amount can no longer be unlocked.
pub trait SettlementProbe: Send + Sync {
    /// Whether any downstream consumer has recorded a paid amount for the
    /// group.
    fn has_paid_amount(&self, group: &GroupId) -> Result<bool, LedgerError>;
}

/// Account directory boundary: display metadata for account ids.
///
/// Core logic never needs this; it exists for reporting surfaces that want
/// codes and names next to the aggregates.
pub trait AccountDirectory: Send + Sync {
    /// Resolve an account id. `Ok(None)` when the directory has no record.
    fn lookup(&self, account: &AccountId) -> Result<Option<AccountInfo>, LedgerError>;
}

/// A probe for contexts where settlement tracking does not exist, such as
/// offline tooling over exported datasets. Reports nothing as settled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSettlements;

impl SettlementProbe for NoSettlements {
    fn has_paid_amount(&self, _group: &GroupId) -> Result<bool, LedgerError> {
        Ok(false)
    }
}
