//! Pure balance and structural validation over entry sets.
//!
//! Nothing in this module touches storage; every function takes a slice of
//! entries and computes from what it is given. The lifecycle manager re-runs
//! these checks on the live record inside its compare-and-swap.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rxledger_types::{
    money::within_tolerance, sequence_violations, EmbeddedEntry, SequenceViolation,
    LARGE_AMOUNT_WARNING,
};

/// Whether an entry set is balanced, unbalanced, or empty.
///
/// Empty is deliberately neither: a group with no entries has no balance to
/// speak of, and display surfaces render it as "—" rather than an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceState {
    Empty,
    Balanced,
    Unbalanced,
}

/// Debit/credit totals of an entry set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Debit total minus credit total.
    pub difference: Decimal,
    pub state: BalanceState,
}

impl BalanceSummary {
    pub fn is_balanced(&self) -> bool {
        self.state == BalanceState::Balanced
    }
}

impl fmt::Display for BalanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            BalanceState::Empty => write!(f, "—"),
            _ => write!(
                f,
                "debit {} / credit {} (difference {})",
                self.total_debit, self.total_credit, self.difference
            ),
        }
    }
}

/// Kinds of findings produced by [`EntryValidator::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    // Errors
    TooFewEntries,
    DualSided,
    NegativeAmount,
    DuplicateSequence,
    SequenceGap,
    // Warnings
    LargeAmount,
    ZeroAmount,
}

impl IssueKind {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::LargeAmount | Self::ZeroAmount)
    }
}

/// A specific finding, anchored to an entry sequence where one applies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryIssue {
    pub sequence: Option<u32>,
    pub kind: IssueKind,
    pub description: String,
}

/// Structural validation result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<EntryIssue>,
    pub warnings: Vec<EntryIssue>,
}

impl ValidationReport {
    /// Returns `true` when no errors were found. Warnings do not block.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// One-line digest of the errors, for error payloads and logs.
    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            return "valid".into();
        }
        let first = &self.errors[0].description;
        match self.errors.len() {
            1 => first.clone(),
            n => format!("{first} (+{} more)", n - 1),
        }
    }
}

/// The side adjusted by [`EntryValidator::quick_balance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustedSide {
    Debit,
    Credit,
}

/// Record of a corrective adjustment proposed by `quick_balance`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickBalanceFix {
    pub sequence: u32,
    pub side: AdjustedSide,
    pub adjustment: Decimal,
}

/// Pure functions computing balance and structural validity of entry sets.
pub struct EntryValidator;

impl EntryValidator {
    /// Compute debit/credit totals and the balance state.
    pub fn compute_balance(entries: &[EmbeddedEntry]) -> BalanceSummary {
        let total_debit: Decimal = entries.iter().map(|e| e.debit_amount).sum();
        let total_credit: Decimal = entries.iter().map(|e| e.credit_amount).sum();
        let difference = total_debit - total_credit;

        let state = if entries.is_empty() {
            BalanceState::Empty
        } else if within_tolerance(difference) {
            BalanceState::Balanced
        } else {
            BalanceState::Unbalanced
        };

        BalanceSummary {
            total_debit,
            total_credit,
            difference,
            state,
        }
    }

    /// Structural validation: entry count, amount signs, sequence numbering.
    ///
    /// Balance is a separate concern; see [`compute_balance`]. Confirm
    /// requires both.
    ///
    /// [`compute_balance`]: EntryValidator::compute_balance
    pub fn validate(entries: &[EmbeddedEntry]) -> ValidationReport {
        let mut report = ValidationReport::default();

        if entries.len() < 2 {
            report.errors.push(EntryIssue {
                sequence: None,
                kind: IssueKind::TooFewEntries,
                description: format!(
                    "a group needs at least 2 entries, found {}",
                    entries.len()
                ),
            });
        }

        for entry in entries {
            if entry.is_dual_sided() {
                report.errors.push(EntryIssue {
                    sequence: Some(entry.sequence),
                    kind: IssueKind::DualSided,
                    description: format!(
                        "entry {} carries both debit {} and credit {}",
                        entry.sequence, entry.debit_amount, entry.credit_amount
                    ),
                });
            }
            if entry.has_negative() {
                report.errors.push(EntryIssue {
                    sequence: Some(entry.sequence),
                    kind: IssueKind::NegativeAmount,
                    description: format!(
                        "entry {} has a negative amount (debit {}, credit {})",
                        entry.sequence, entry.debit_amount, entry.credit_amount
                    ),
                });
            }
            if entry.amount() > LARGE_AMOUNT_WARNING {
                report.warnings.push(EntryIssue {
                    sequence: Some(entry.sequence),
                    kind: IssueKind::LargeAmount,
                    description: format!(
                        "entry {} amount {} exceeds the review threshold",
                        entry.sequence,
                        entry.amount()
                    ),
                });
            }
            if entry.is_zero() {
                report.warnings.push(EntryIssue {
                    sequence: Some(entry.sequence),
                    kind: IssueKind::ZeroAmount,
                    description: format!("entry {} has no amount on either side", entry.sequence),
                });
            }
        }

        for violation in sequence_violations(entries) {
            let issue = match violation {
                SequenceViolation::Duplicate { sequence } => EntryIssue {
                    sequence: Some(sequence),
                    kind: IssueKind::DuplicateSequence,
                    description: format!("sequence {sequence} appears more than once"),
                },
                SequenceViolation::Gap { expected, found } => EntryIssue {
                    sequence: Some(found),
                    kind: IssueKind::SequenceGap,
                    description: format!("expected sequence {expected}, found {found}"),
                },
            };
            report.errors.push(issue);
        }

        report
    }

    /// Corrective helper: adjust the last entry on the smaller side by the
    /// difference so the set balances.
    ///
    /// Interactive use only; never applied automatically. Placeholder rows
    /// synthesized by repair are skipped so they stay visibly untouched.
    /// Returns `None` when the set is empty, already balanced, or has no
    /// adjustable entry.
    pub fn quick_balance(entries: &mut [EmbeddedEntry]) -> Option<QuickBalanceFix> {
        let summary = Self::compute_balance(entries);
        if summary.state != BalanceState::Unbalanced {
            return None;
        }

        let shortfall = summary.difference.abs();
        if summary.difference > Decimal::ZERO {
            // Credit side is short.
            let target = Self::last_adjustable(entries, AdjustedSide::Credit)?;
            target.credit_amount += shortfall;
            Some(QuickBalanceFix {
                sequence: target.sequence,
                side: AdjustedSide::Credit,
                adjustment: shortfall,
            })
        } else {
            let target = Self::last_adjustable(entries, AdjustedSide::Debit)?;
            target.debit_amount += shortfall;
            Some(QuickBalanceFix {
                sequence: target.sequence,
                side: AdjustedSide::Debit,
                adjustment: shortfall,
            })
        }
    }

    /// Exchange debit and credit on every entry. Bulk correction for a
    /// group entered backwards.
    pub fn swap_debit_credit(entries: &mut [EmbeddedEntry]) {
        for entry in entries {
            std::mem::swap(&mut entry.debit_amount, &mut entry.credit_amount);
        }
    }

    /// The highest-sequence non-placeholder entry already posting on `side`,
    /// falling back to the highest-sequence non-placeholder entry with no
    /// amount on either side.
    ///
    /// Entries posting on the opposite side are never candidates: raising
    /// their `side` amount would make them dual-sided, and a correction
    /// helper must not propose data that fails validation. With no
    /// candidate the caller returns `None` and leaves the set untouched.
    fn last_adjustable(
        entries: &mut [EmbeddedEntry],
        side: AdjustedSide,
    ) -> Option<&mut EmbeddedEntry> {
        let on_side = |e: &EmbeddedEntry| match side {
            AdjustedSide::Debit => e.debit_amount > Decimal::ZERO,
            AdjustedSide::Credit => e.credit_amount > Decimal::ZERO,
        };

        let pick = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.placeholder && on_side(e))
            .max_by_key(|(_, e)| e.sequence)
            .map(|(i, _)| i)
            .or_else(|| {
                entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !e.placeholder && e.is_zero())
                    .max_by_key(|(_, e)| e.sequence)
                    .map(|(i, _)| i)
            })?;

        entries.get_mut(pick)
    }
}
