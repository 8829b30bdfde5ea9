use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use rxledger_funding::FundingChainResolver;
use rxledger_ledger::{
    AccountDirectory, AdjustedSide, EntryValidator, LedgerError, SettlementProbe,
    StatusLifecycleManager,
};
use rxledger_repair::{run_pass, EntryBackfill, FieldBackfill, RepairCheckpoint, RepairReport};
use rxledger_store::{GroupQuery, GroupStore};
use rxledger_types::{AccountId, AccountInfo, GroupId, TransactionGroup, TransactionStatus};

use crate::cli::*;
use crate::dataset::Dataset;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let dataset = Dataset::load(cli.data, cli.org, cli.user)?;
    match cli.command {
        Command::List(args) => cmd_list(&dataset, args),
        Command::Show(args) => cmd_show(&dataset, args),
        Command::Validate(args) => cmd_validate(&dataset, args),
        Command::QuickBalance(args) => cmd_quick_balance(&dataset, args),
        Command::Confirm(args) => cmd_confirm(&dataset, args),
        Command::Unlock(args) => cmd_unlock(&dataset, args),
        Command::Cancel(args) => cmd_cancel(&dataset, args),
        Command::Delete(args) => cmd_delete(&dataset, args),
        Command::Link(args) => cmd_link(&dataset, args),
        Command::Sources(args) => cmd_sources(&dataset, args),
        Command::ReferencedBy(args) => cmd_referenced_by(&dataset, args),
        Command::Chain(args) => cmd_chain(&dataset, args),
        Command::Repair(args) => cmd_repair(&dataset, args),
        Command::Stats(args) => cmd_stats(&dataset, args),
    }
}

/// Settlement probe fed from `--settled` flags.
struct SettledList(HashSet<GroupId>);

impl SettlementProbe for SettledList {
    fn has_paid_amount(&self, group: &GroupId) -> Result<bool, LedgerError> {
        Ok(self.0.contains(group))
    }
}

/// Account directory backed by a JSON file of account records.
struct JsonAccountDirectory(HashMap<AccountId, AccountInfo>);

impl JsonAccountDirectory {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading account directory {}", path.display()))?;
        let accounts: Vec<AccountInfo> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing account directory {}", path.display()))?;
        Ok(Self(accounts.into_iter().map(|a| (a.id, a)).collect()))
    }
}

impl AccountDirectory for JsonAccountDirectory {
    fn lookup(&self, account: &AccountId) -> Result<Option<AccountInfo>, LedgerError> {
        Ok(self.0.get(account).cloned())
    }
}

fn status_colored(status: TransactionStatus) -> colored::ColoredString {
    match status {
        TransactionStatus::Draft => status.to_string().yellow(),
        TransactionStatus::Confirmed => status.to_string().green(),
        TransactionStatus::Cancelled => status.to_string().dimmed(),
    }
}

fn print_group_line(group: &TransactionGroup) {
    println!(
        "{}  {}  {}  {}  {}  {}",
        group.id.short_id().yellow(),
        group.group_number.to_string().bold(),
        group.transaction_date,
        format!("{:>12}", group.total_amount),
        status_colored(group.status),
        group.description,
    );
}

fn cmd_list(dataset: &Dataset, args: ListArgs) -> anyhow::Result<()> {
    let mut query = GroupQuery::all();
    if let Some(status) = args.status {
        query = query.with_status(status);
    }
    if let Some(from) = args.from {
        query = query.from_date(from);
    }
    if let Some(to) = args.to {
        query = query.to_date(to);
    }
    if let Some(account) = args.account {
        query = query.with_account(account);
    }

    let groups = dataset.store.list(&dataset.ctx, &query)?;
    if groups.is_empty() {
        println!("No matching groups.");
        return Ok(());
    }
    for group in &groups {
        print_group_line(group);
    }
    println!("{} group(s)", groups.len().to_string().bold());
    Ok(())
}

fn cmd_show(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let group = load(dataset, &args.group)?;
    println!(
        "{}  {}  ({})",
        group.group_number.to_string().bold(),
        group.id.short_id().yellow(),
        status_colored(group.status),
    );
    println!("  Date: {}   Total: {}", group.transaction_date, group.total_amount.to_string().bold());
    println!("  Funding: {}", group.funding_type);
    if let Some(source) = &group.source_transaction_id {
        println!("  Source: {}", source.short_id().yellow());
    }
    println!("  Description: {}", group.description);
    for entry in &group.entries {
        let side = if entry.credit_amount > entry.debit_amount {
            format!("credit {:>10}", entry.credit_amount).cyan()
        } else {
            format!("debit  {:>10}", entry.debit_amount).normal()
        };
        let account = entry
            .account
            .map(|a| a.short_id())
            .unwrap_or_else(|| "—".into());
        let marker = if entry.placeholder { " (placeholder)".dimmed() } else { "".normal() };
        println!(
            "  #{:<3} {}  {}  {}{}",
            entry.sequence, side, account, entry.description, marker
        );
    }
    Ok(())
}

fn cmd_validate(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let manager = StatusLifecycleManager::new(&dataset.store, &rxledger_ledger::NoSettlements);
    let preview = manager.preview(&dataset.ctx, &args.group)?;

    println!("Balance: {}", preview.balance);
    for issue in &preview.report.errors {
        println!("  {} {}", "error:".red().bold(), issue.description);
    }
    for issue in &preview.report.warnings {
        println!("  {} {}", "warning:".yellow(), issue.description);
    }
    if preview.confirmable() {
        println!("{} Confirmable", "✓".green().bold());
    } else {
        println!("{} Not confirmable", "✗".red().bold());
    }
    Ok(())
}

fn cmd_quick_balance(dataset: &Dataset, args: QuickBalanceArgs) -> anyhow::Result<()> {
    let mut group = load(dataset, &args.group)?;
    let expected_version = group.version;

    match EntryValidator::quick_balance(&mut group.entries) {
        None => println!("Already balanced."),
        Some(fix) => {
            let side = match fix.side {
                AdjustedSide::Debit => "debit",
                AdjustedSide::Credit => "credit",
            };
            println!(
                "Entry #{}: {} {} by {}",
                fix.sequence.to_string().bold(),
                side.cyan(),
                if fix.adjustment.is_sign_negative() { "reduced" } else { "raised" },
                fix.adjustment.abs().to_string().bold(),
            );
            if args.apply {
                dataset.store.update(&dataset.ctx, group, expected_version)?;
                dataset.save()?;
                println!("{} Adjustment saved", "✓".green().bold());
            } else {
                println!("Dry run; pass {} to persist.", "--apply".bold());
            }
        }
    }
    Ok(())
}

fn cmd_confirm(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let manager = StatusLifecycleManager::new(&dataset.store, &rxledger_ledger::NoSettlements);
    let confirmed = manager.confirm(&dataset.ctx, &args.group)?;
    dataset.save()?;
    println!(
        "{} Confirmed {} (total {})",
        "✓".green().bold(),
        confirmed.group_number.to_string().bold(),
        confirmed.total_amount.to_string().bold(),
    );
    Ok(())
}

fn cmd_unlock(dataset: &Dataset, args: UnlockArgs) -> anyhow::Result<()> {
    let probe = SettledList(args.settled.into_iter().collect());
    let manager = StatusLifecycleManager::new(&dataset.store, &probe);
    let unlocked = manager.unlock(&dataset.ctx, &args.group)?;
    dataset.save()?;
    println!(
        "{} Unlocked {}; entries editable again",
        "✓".green().bold(),
        unlocked.group_number.to_string().bold(),
    );
    Ok(())
}

fn cmd_cancel(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let manager = StatusLifecycleManager::new(&dataset.store, &rxledger_ledger::NoSettlements);
    let cancelled = manager.cancel(&dataset.ctx, &args.group)?;
    dataset.save()?;
    println!(
        "{} Cancelled {}",
        "✓".green().bold(),
        cancelled.group_number.to_string().bold(),
    );
    Ok(())
}

fn cmd_delete(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let manager = StatusLifecycleManager::new(&dataset.store, &rxledger_ledger::NoSettlements);
    manager.delete(&dataset.ctx, &args.group)?;
    dataset.save()?;
    println!("{} Deleted {}", "✓".green().bold(), args.group.short_id().yellow());
    Ok(())
}

fn cmd_link(dataset: &Dataset, args: LinkArgs) -> anyhow::Result<()> {
    let resolver = FundingChainResolver::new(&dataset.store);
    let recorded =
        resolver.record_usage(&dataset.ctx, &args.source, &args.consumer, args.amount)?;
    dataset.save()?;

    let freshness = if recorded.newly_linked { "linked" } else { "already linked" };
    println!(
        "{} {} draws {} from {} ({})",
        "✓".green().bold(),
        recorded.consumer.short_id().yellow(),
        recorded.used_amount.to_string().bold(),
        recorded.source.short_id().yellow(),
        freshness,
    );
    if !recorded.funding_path.is_empty() {
        let path: Vec<String> = recorded.funding_path.iter().map(|id| id.short_id()).collect();
        println!("  Funding path: {}", path.join(" → ").dimmed());
    }
    Ok(())
}

fn cmd_sources(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let resolver = FundingChainResolver::new(&dataset.store);
    let report = resolver.funding_sources(&dataset.ctx, &args.group)?;

    if report.sources.is_empty() {
        println!("Original funds; no upstream sources.");
        return Ok(());
    }
    for source in &report.sources {
        let date = source
            .source_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "—".into());
        let total = source
            .source_amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "—".into());
        println!(
            "{}  {}  {}  used {} of {}  {}",
            source.source.short_id().yellow(),
            source.source_group_number.bold(),
            date,
            source.used_amount.to_string().bold(),
            total,
            source.source_description,
        );
    }
    if report.truncated {
        println!("{} Walk truncated; run the repair passes.", "!".yellow().bold());
    }
    Ok(())
}

fn cmd_referenced_by(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let resolver = FundingChainResolver::new(&dataset.store);
    let consumers = resolver.referenced_by(&dataset.ctx, &args.group)?;

    if consumers.is_empty() {
        println!("No consumers.");
        return Ok(());
    }
    for consumer in &consumers {
        let status = consumer
            .status
            .map(status_colored)
            .unwrap_or_else(|| "—".dimmed());
        let total = consumer
            .total_amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| "—".into());
        println!(
            "{}  {}  {}  {}  {}",
            consumer.id.short_id().yellow(),
            consumer.group_number.bold(),
            total,
            status,
            consumer.description,
        );
    }
    Ok(())
}

fn cmd_chain(dataset: &Dataset, args: ShowArgs) -> anyhow::Result<()> {
    let resolver = FundingChainResolver::new(&dataset.store);
    let chain = resolver.funding_chain(&dataset.ctx, &args.group)?;

    if chain.ids.is_empty() {
        println!("Original funds; chain is empty.");
        return Ok(());
    }
    let hops: Vec<String> = chain.ids.iter().map(|id| id.short_id()).collect();
    println!("{} → {}", hops.join(" → "), args.group.short_id().yellow().bold());
    if chain.truncated {
        println!("{} Chain truncated at the depth bound.", "!".yellow().bold());
    }
    Ok(())
}

fn cmd_repair(dataset: &Dataset, args: RepairArgs) -> anyhow::Result<()> {
    let pass_name = match args.pass {
        RepairPassKind::Fields => "field-backfill",
        RepairPassKind::Entries => "entry-backfill",
    };

    let mut checkpoint = match &args.checkpoint {
        Some(path) => RepairCheckpoint::load(path)?
            .filter(|c| c.pass == pass_name)
            .unwrap_or_else(|| RepairCheckpoint::new(pass_name)),
        None => RepairCheckpoint::new(pass_name),
    };

    let mut report: RepairReport = match args.pass {
        RepairPassKind::Fields => run_pass(
            &dataset.ctx,
            &dataset.store,
            &FieldBackfill,
            checkpoint.last_processed,
            args.batch,
        )?,
        RepairPassKind::Entries => run_pass(
            &dataset.ctx,
            &dataset.store,
            &EntryBackfill,
            checkpoint.last_processed,
            args.batch,
        )?,
    };
    // Missing fields are defaulted while the dataset loads; count those
    // records as field-backfill fixes so the report reflects them. Saving
    // writes the defaults back, so a rerun reports zero.
    if matches!(args.pass, RepairPassKind::Fields) {
        report.fixed += dataset.normalized_fields;
    }

    dataset.save()?;
    if let Some(path) = &args.checkpoint {
        checkpoint.last_processed = report.last_processed.or(checkpoint.last_processed);
        checkpoint.save(path)?;
    }

    println!(
        "{} {}: examined {}, fixed {}, skipped {}",
        "✓".green().bold(),
        pass_name.bold(),
        report.examined.to_string().bold(),
        report.fixed.to_string().green(),
        report.skipped,
    );
    if args.batch.is_some_and(|limit| report.examined == limit as u64) {
        println!("Batch limit reached; rerun to continue from the checkpoint.");
    }
    Ok(())
}

fn cmd_stats(dataset: &Dataset, args: StatsArgs) -> anyhow::Result<()> {
    let stats = dataset.store.account_statistics(&dataset.ctx, &args.account)?;

    let heading = match &args.accounts {
        Some(path) => {
            let directory = JsonAccountDirectory::load(path)?;
            match directory.lookup(&args.account)? {
                Some(info) => format!("{} {}", info.code, info.name),
                None => args.account.short_id(),
            }
        }
        None => args.account.short_id(),
    };

    println!("Account {}", heading.bold());
    println!("  Entries: {}", stats.entry_count.to_string().bold());
    println!("  Debit:   {}", stats.total_debit);
    println!("  Credit:  {}", stats.total_credit);
    println!("  Net:     {}", stats.net.to_string().bold());
    println!("  Average: {}", stats.average_amount);
    match stats.last_transaction_date {
        Some(date) => println!("  Last activity: {date}"),
        None => println!("  Last activity: {}", "—".dimmed()),
    }
    Ok(())
}

fn load(dataset: &Dataset, id: &GroupId) -> anyhow::Result<TransactionGroup> {
    dataset
        .store
        .get(&dataset.ctx, id)?
        .with_context(|| format!("group {} not found", id.short_id()))
}
