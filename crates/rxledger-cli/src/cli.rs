use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use rxledger_types::{AccountId, GroupId, OrganizationId, TransactionStatus, UserId};

#[derive(Parser)]
#[command(
    name = "rxledger",
    about = "RxLedger — double-entry transaction ledger core",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Dataset file holding the transaction groups (JSON).
    #[arg(long, global = true, default_value = "ledger.json")]
    pub data: PathBuf,

    /// Organization scope. Defaults to the first record's organization.
    #[arg(long, global = true)]
    pub org: Option<OrganizationId>,

    /// Acting user id. A fresh id is minted when omitted.
    #[arg(long, global = true)]
    pub user: Option<UserId>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List transaction groups
    List(ListArgs),
    /// Show one group with its entries
    Show(ShowArgs),
    /// Validate a group's entries and balance without persisting
    Validate(ShowArgs),
    /// Balance a group by adjusting its last adjustable entry
    QuickBalance(QuickBalanceArgs),
    /// Confirm a draft group
    Confirm(ShowArgs),
    /// Reopen a confirmed group for editing
    Unlock(UnlockArgs),
    /// Cancel a group (terminal)
    Cancel(ShowArgs),
    /// Delete a draft group
    Delete(ShowArgs),
    /// Record that one group drew funds from another
    Link(LinkArgs),
    /// Walk a group's funding ancestry
    Sources(ShowArgs),
    /// List the consumers linked to a group
    ReferencedBy(ShowArgs),
    /// Show the derived funding chain, oldest first
    Chain(ShowArgs),
    /// Run a legacy repair pass over the dataset
    Repair(RepairArgs),
    /// Per-account statistics
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    pub status: Option<TransactionStatus>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    #[arg(long)]
    pub account: Option<AccountId>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub group: GroupId,
}

#[derive(Args)]
pub struct QuickBalanceArgs {
    pub group: GroupId,
    /// Persist the adjustment instead of only reporting it.
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args)]
pub struct UnlockArgs {
    pub group: GroupId,
    /// Groups a downstream consumer has recorded payments against.
    /// Unlocking any of these is refused.
    #[arg(long)]
    pub settled: Vec<GroupId>,
}

#[derive(Args)]
pub struct LinkArgs {
    pub source: GroupId,
    pub consumer: GroupId,
    pub amount: Decimal,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum RepairPassKind {
    /// Re-derive drifted cached fields
    Fields,
    /// Synthesize placeholder entries for entry-less drafts
    Entries,
}

#[derive(Args)]
pub struct RepairArgs {
    pub pass: RepairPassKind,
    /// Checkpoint file; resumes from it and updates it after the batch.
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
    /// Process at most this many groups, then stop at a checkpoint.
    #[arg(long)]
    pub batch: Option<usize>,
}

#[derive(Args)]
pub struct StatsArgs {
    pub account: AccountId,
    /// Account directory file (JSON array of account records) used to
    /// render the account's code and name.
    #[arg(long)]
    pub accounts: Option<PathBuf>,
}
