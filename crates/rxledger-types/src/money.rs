//! Money constants shared across the workspace.

use rust_decimal::Decimal;

/// Maximum absolute debit/credit difference for a group to count as balanced.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// Single-entry amount above which validation emits a warning.
pub const LARGE_AMOUNT_WARNING: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Upper bound on funding-chain walks. A chain deeper than this indicates
/// corrupted data and is reported instead of followed further.
pub const MAX_FUNDING_DEPTH: usize = 50;

/// Whether `difference` falls within the balance tolerance.
pub fn within_tolerance(difference: Decimal) -> bool {
    difference.abs() <= BALANCE_TOLERANCE
}
