//! # Ledger Module
//!
//! Pure arithmetic over a session's movement ledger.
//!
//! ## The Reconciliation Equation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  opening_balance + Σ income - Σ expense = expected_balance              │
//! │                                                                         │
//! │  The drawer is then counted:                                            │
//! │                                                                         │
//! │  counted_balance - expected_balance = discrepancy                       │
//! │                                                                         │
//! │  Everything downstream (reports, severity, approval rules) hangs off   │
//! │  these two lines, so they live here with no I/O anywhere near them.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements store positive magnitudes; direction comes from the category
//! snapshot on each row, so a re-sum of the same rows always gives the
//! same answer. Transfers are the odd one out: they move cash BETWEEN
//! drawers and the cash office books both sides, so they total separately
//! and never enter the net.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Movement;

// =============================================================================
// Net Movements
// =============================================================================

/// Totals of a movement ledger, split by direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NetMovements {
    /// Sum of income magnitudes (always >= 0).
    pub income: Money,
    /// Sum of expense magnitudes (always >= 0).
    pub expense: Money,
    /// Sum of transfer magnitudes. Audit figure only; never in the net.
    pub transfer: Money,
    /// Number of movements summed (transfers included).
    pub count: usize,
}

impl NetMovements {
    /// Net cash effect on the drawer: income minus expense.
    /// Transfers are balance-neutral and deliberately absent here.
    #[inline]
    pub fn net(&self) -> Money {
        self.income - self.expense
    }
}

/// Sums a ledger into income/expense/transfer totals.
///
/// ## Rules
/// - An empty ledger sums to zero on all sides
/// - Order of the slice does not matter; addition commutes
pub fn net_movements(movements: &[Movement]) -> NetMovements {
    let mut income = Money::zero();
    let mut expense = Money::zero();
    let mut transfer = Money::zero();

    for movement in movements {
        match movement.category {
            crate::types::MovementCategory::Income => income += movement.amount(),
            crate::types::MovementCategory::Expense => expense += movement.amount(),
            crate::types::MovementCategory::Transfer => transfer += movement.amount(),
        }
    }

    NetMovements {
        income,
        expense,
        transfer,
        count: movements.len(),
    }
}

/// What the drawer should hold given the opening float and the ledger.
///
/// ## Example
/// ```rust
/// use tally_core::ledger::expected_balance;
/// use tally_core::money::Money;
///
/// // Opening $100, no movements: expect $100
/// assert_eq!(
///     expected_balance(Money::from_cents(10000), &[]),
///     Money::from_cents(10000)
/// );
/// ```
pub fn expected_balance(opening: Money, movements: &[Movement]) -> Money {
    opening + net_movements(movements).net()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MovementCategory;
    use chrono::Utc;

    fn movement(category: MovementCategory, amount_cents: i64) -> Movement {
        Movement {
            id: uuid::Uuid::new_v4().to_string(),
            register_id: "reg-1".to_string(),
            session_id: "sess-1".to_string(),
            movement_type_id: "type-1".to_string(),
            category,
            amount_cents,
            description: None,
            reference: None,
            recorded_by: "user-1".to_string(),
            occurred_at: Utc::now(),
            amended_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_ledger_sums_to_zero() {
        let totals = net_movements(&[]);
        assert_eq!(totals.income, Money::zero());
        assert_eq!(totals.expense, Money::zero());
        assert_eq!(totals.transfer, Money::zero());
        assert_eq!(totals.net(), Money::zero());
        assert_eq!(totals.count, 0);
    }

    #[test]
    fn test_net_movements_splits_by_category() {
        let ledger = vec![
            movement(MovementCategory::Income, 5000),
            movement(MovementCategory::Income, 2500),
            movement(MovementCategory::Expense, 2000),
        ];

        let totals = net_movements(&ledger);
        assert_eq!(totals.income.cents(), 7500);
        assert_eq!(totals.expense.cents(), 2000);
        assert_eq!(totals.net().cents(), 5500);
        assert_eq!(totals.count, 3);
    }

    #[test]
    fn test_transfers_are_balance_neutral() {
        let ledger = vec![
            movement(MovementCategory::Income, 5000),
            movement(MovementCategory::Transfer, 30000),
        ];

        let totals = net_movements(&ledger);
        assert_eq!(totals.transfer.cents(), 30000);
        assert_eq!(totals.net().cents(), 5000);
        assert_eq!(totals.count, 2);

        // Expected balance ignores the transfer entirely
        let expected = expected_balance(Money::from_cents(10000), &ledger);
        assert_eq!(expected.cents(), 15000);
    }

    #[test]
    fn test_expected_balance() {
        // Opening $100, sale +$50, withdrawal -$20: expect $130
        let ledger = vec![
            movement(MovementCategory::Income, 5000),
            movement(MovementCategory::Expense, 2000),
        ];

        let expected = expected_balance(Money::from_cents(10000), &ledger);
        assert_eq!(expected.cents(), 13000);
    }

    #[test]
    fn test_expected_balance_can_go_negative() {
        // An expense-heavy ledger is arithmetically fine here; whether the
        // register permits it is policy enforced at record time, not here.
        let ledger = vec![movement(MovementCategory::Expense, 15000)];

        let expected = expected_balance(Money::from_cents(10000), &ledger);
        assert_eq!(expected.cents(), -5000);
    }
}
