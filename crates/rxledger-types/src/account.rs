//! Account references at the system boundary.
//!
//! Upstream data sometimes carries an account as a bare id and sometimes as a
//! populated object. [`AccountRef`] absorbs both shapes at the boundary; core
//! logic only ever looks at [`AccountRef::id`].

use serde::{Deserialize, Serialize};

use crate::id::AccountId;

/// Broad classification of an account in the external directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Display metadata for an account, resolved by the account directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: AccountId,
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
}

/// A reference to an account: either a bare id or a populated record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountRef {
    Id(AccountId),
    Populated(AccountInfo),
}

impl AccountRef {
    /// The account id, regardless of reference shape.
    pub fn id(&self) -> AccountId {
        match self {
            Self::Id(id) => *id,
            Self::Populated(info) => info.id,
        }
    }
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

impl From<AccountInfo> for AccountRef {
    fn from(info: AccountInfo) -> Self {
        Self::Populated(info)
    }
}
