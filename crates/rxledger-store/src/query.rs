//! Read-side filters and aggregates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rxledger_types::{AccountId, TransactionGroup, TransactionStatus};

/// Filter for listing transaction groups. All criteria are conjunctive;
/// an empty query matches every group in the caller's organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
    /// Match groups with at least one entry posting to this account.
    pub account: Option<AccountId>,
}

impl GroupQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_account(mut self, account: AccountId) -> Self {
        self.account = Some(account);
        self
    }

    /// Whether a group satisfies every criterion.
    pub fn matches(&self, group: &TransactionGroup) -> bool {
        if let Some(from) = self.date_from {
            if group.transaction_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if group.transaction_date > to {
                return false;
            }
        }
        if let Some(status) = self.status {
            if group.status != status {
                return false;
            }
        }
        if let Some(account) = &self.account {
            if !group.touches_account(account) {
                return false;
            }
        }
        true
    }
}

/// Per-account aggregate over every entry posting to the account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatistics {
    pub account: AccountId,
    pub entry_count: u64,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Debit total minus credit total.
    pub net: Decimal,
    /// Mean of the populated side across matched entries; zero when empty.
    pub average_amount: Decimal,
    pub last_transaction_date: Option<NaiveDate>,
}

impl AccountStatistics {
    /// Empty statistics for an account with no entries.
    pub fn empty(account: AccountId) -> Self {
        Self {
            account,
            entry_count: 0,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            net: Decimal::ZERO,
            average_amount: Decimal::ZERO,
            last_transaction_date: None,
        }
    }

    /// Fold one group's entries for `account` into the aggregate.
    pub fn absorb(&mut self, group: &TransactionGroup) {
        let mut touched = false;
        for entry in &group.entries {
            if entry.account.as_ref() != Some(&self.account) {
                continue;
            }
            touched = true;
            self.entry_count += 1;
            self.total_debit += entry.debit_amount;
            self.total_credit += entry.credit_amount;
        }
        if touched {
            self.net = self.total_debit - self.total_credit;
            if self.entry_count > 0 {
                self.average_amount =
                    (self.total_debit + self.total_credit) / Decimal::from(self.entry_count);
            }
            let newer = self
                .last_transaction_date
                .map_or(true, |d| group.transaction_date > d);
            if newer {
                self.last_transaction_date = Some(group.transaction_date);
            }
        }
    }
}
