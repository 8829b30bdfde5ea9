//! JSON dataset backing the CLI.
//!
//! A dataset file is an array of legacy-tolerant group records. Loading
//! normalizes them into an in-memory store scoped to one organization;
//! records from other organizations are carried through untouched on save.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::warn;

use rxledger_repair::RawGroupRecord;
use rxledger_store::{GroupQuery, GroupStore, InMemoryGroupStore};
use rxledger_types::{OperationContext, OrganizationId, UserId};

pub struct Dataset {
    path: PathBuf,
    pub store: InMemoryGroupStore,
    pub ctx: OperationContext,
    /// Records whose missing `status`/`funding_type`/`linked_transaction_ids`
    /// were defaulted while loading. Field backfill reports these as fixes;
    /// once saved, the file carries every field and the count drops to zero.
    pub normalized_fields: u64,
    foreign: Vec<RawGroupRecord>,
}

impl Dataset {
    pub fn load(
        path: PathBuf,
        org: Option<OrganizationId>,
        user: Option<UserId>,
    ) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        let records: Vec<RawGroupRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing dataset {}", path.display()))?;

        let organization = match org.or_else(|| records.first().map(|r| r.organization)) {
            Some(org) => org,
            None => bail!("dataset {} is empty; pass --org", path.display()),
        };
        let ctx = OperationContext::new(organization, user.unwrap_or_else(UserId::new));

        let store = InMemoryGroupStore::new();
        let mut foreign = Vec::new();
        let mut normalized_fields = 0u64;
        for record in records {
            if record.organization != organization {
                foreign.push(record);
                continue;
            }
            let (group, fixed) = record.normalize();
            if fixed {
                normalized_fields += 1;
            }
            store
                .create(&ctx, group)
                .context("loading dataset record")?;
        }
        if !foreign.is_empty() {
            warn!(
                skipped = foreign.len(),
                "dataset records outside the selected organization are untouched"
            );
        }

        Ok(Self {
            path,
            store,
            ctx,
            normalized_fields,
            foreign,
        })
    }

    /// Write the store back to the dataset file.
    pub fn save(&self) -> anyhow::Result<()> {
        let mut records: Vec<RawGroupRecord> = self
            .store
            .list(&self.ctx, &GroupQuery::all())?
            .into_iter()
            .map(RawGroupRecord::from)
            .collect();
        records.extend(self.foreign.iter().cloned());

        let json = serde_json::to_string_pretty(&records).context("encoding dataset")?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing dataset {}", self.path.display()))?;
        Ok(())
    }
}
