use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::GroupId;

/// Lifecycle status of a transaction group.
///
/// Transitions: draft → confirmed (balance-gated), confirmed → draft
/// (unlock, settlement-gated), any non-cancelled → cancelled (terminal).
/// Entries are mutable only while draft.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Draft,
    Confirmed,
    Cancelled,
}

impl TransactionStatus {
    /// Returns `true` for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Entries may be added/removed/edited only while draft.
    pub fn allows_entry_mutation(&self) -> bool {
        matches!(self, Self::Draft)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = crate::error::TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(crate::error::TypeError::InvalidStatus(other.to_string())),
        }
    }
}

/// Whether a group is self-funded or draws on a prior transaction's balance.
///
/// This is a cache of "`source_transaction_id` is present" and must stay
/// consistent with it; [`FundingType::derive`] is the single derivation rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingType {
    #[default]
    Original,
    Extended,
}

impl FundingType {
    /// Derive the funding type from the presence of a funding source.
    pub fn derive(source: Option<&GroupId>) -> Self {
        match source {
            Some(_) => Self::Extended,
            None => Self::Original,
        }
    }
}

impl fmt::Display for FundingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Original => "original",
            Self::Extended => "extended",
        };
        write!(f, "{label}")
    }
}
