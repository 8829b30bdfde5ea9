//! The tolerant legacy record shape.
//!
//! Historical exports predate several schema additions, so every field the
//! field-backfill pass covers is optional here. [`RawGroupRecord::normalize`]
//! is the single place legacy data becomes a well-formed
//! [`TransactionGroup`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rxledger_types::{
    EmbeddedEntry, FundingType, GroupId, GroupNumber, OrganizationId, TransactionGroup,
    TransactionStatus, UserId,
};

/// A transaction group as found in legacy exports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGroupRecord {
    pub id: GroupId,
    pub group_number: GroupNumber,
    pub description: String,
    pub transaction_date: NaiveDate,
    pub organization: OrganizationId,
    pub total_amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
    pub funding_type: Option<FundingType>,
    pub source_transaction_id: Option<GroupId>,
    pub linked_transaction_ids: Option<Vec<GroupId>>,
    pub receipt_url: Option<String>,
    pub invoice_no: Option<String>,
    pub created_by: UserId,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Vec<EmbeddedEntry>,
}

impl RawGroupRecord {
    /// Whether field backfill would change this record.
    pub fn needs_field_backfill(&self) -> bool {
        self.status.is_none() || self.funding_type.is_none() || self.linked_transaction_ids.is_none()
    }

    /// Normalize into a well-formed group, defaulting the missing fields:
    /// `status` → draft, `funding_type` → derived from the source id,
    /// `linked_transaction_ids` → empty. Returns the group and whether any
    /// default was applied.
    pub fn normalize(self) -> (TransactionGroup, bool) {
        let fixed = self.needs_field_backfill();
        let fallback_timestamp = self
            .transaction_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);

        let mut group = TransactionGroup {
            id: self.id,
            group_number: self.group_number,
            description: self.description,
            transaction_date: self.transaction_date,
            organization: self.organization,
            total_amount: self.total_amount.unwrap_or(Decimal::ZERO),
            status: self.status.unwrap_or(TransactionStatus::Draft),
            funding_type: self
                .funding_type
                .unwrap_or_else(|| FundingType::derive(self.source_transaction_id.as_ref())),
            source_transaction_id: self.source_transaction_id,
            linked_transaction_ids: self.linked_transaction_ids.unwrap_or_default(),
            receipt_url: self.receipt_url,
            invoice_no: self.invoice_no,
            created_by: self.created_by,
            created_at: self.created_at.unwrap_or(fallback_timestamp),
            updated_at: self.updated_at.unwrap_or(fallback_timestamp),
            version: 0,
            entries: self.entries,
        };
        group.refresh_caches();
        (group, fixed)
    }
}

impl From<TransactionGroup> for RawGroupRecord {
    fn from(group: TransactionGroup) -> Self {
        Self {
            id: group.id,
            group_number: group.group_number,
            description: group.description,
            transaction_date: group.transaction_date,
            organization: group.organization,
            total_amount: Some(group.total_amount),
            status: Some(group.status),
            funding_type: Some(group.funding_type),
            source_transaction_id: group.source_transaction_id,
            linked_transaction_ids: Some(group.linked_transaction_ids),
            receipt_url: group.receipt_url,
            invoice_no: group.invoice_no,
            created_by: group.created_by,
            created_at: Some(group.created_at),
            updated_at: Some(group.updated_at),
            entries: group.entries,
        }
    }
}
