//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In a reconciliation engine that is fatal: a drawer counted at         │
//! │  $130.00 must compare EXACTLY equal to an expected $130.00, or         │
//! │  every close spawns a phantom discrepancy report.                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Balances, movements and discrepancies are all i64 cents.            │
//! │    Equality is exact; the "currency epsilon" problem disappears.       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! // Create from cents (preferred)
//! let opening = Money::from_cents(10000); // $100.00
//!
//! // Arithmetic operations
//! let counted = opening + Money::from_cents(3000); // $130.00
//! let shortfall = opening - counted;               // -$30.00
//!
//! // NEVER do this:
//! // let bad = Money::from_float(10.99); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for shortfalls and expense nets
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Register.initial_balance ──► Session.opening_balance                   │
/// │                                      │                                  │
/// │  Movement.amount (income +, expense −) accumulates into                 │
/// │                                      ▼                                  │
/// │  expected balance at close ──► Discrepancy = counted − expected         │
/// │                                      │                                  │
/// │                                      ▼                                  │
/// │  ApprovalRequest.amount / DiscrepancyReport.discrepancy                 │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let balance = Money::from_cents(13000); // Represents $130.00
    /// assert_eq!(balance.cents(), 13000);
    /// ```
    ///
    /// ## Why Cents?
    /// Using the smallest unit eliminates all floating-point concerns.
    /// The database, calculations, and API all use cents.
    /// Only the UI converts to dollars for display.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let balance = Money::from_major_minor(130, 0); // $130.00
    /// assert_eq!(balance.cents(), 13000);
    ///
    /// let shortfall = Money::from_major_minor(-5, 50); // -$5.50
    /// assert_eq!(shortfall.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        // Handle sign: if major is negative, minor should subtract
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let balance = Money::from_cents(13099);
    /// assert_eq!(balance.dollars(), 130);
    ///
    /// let negative = Money::from_cents(-550);
    /// assert_eq!(negative.dollars(), -5);
    /// ```
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let shortfall = Money::from_cents(-550);
    /// assert_eq!(shortfall.abs().cents(), 550);
    /// ```
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the value in major currency units as a float.
    ///
    /// ## Use With Care
    /// This is a ONE-WAY conversion for rule facts and percentage math,
    /// where approval rule thresholds are written in display units
    /// (e.g. "amount greater_than 1000" means $1000.00). Never feed the
    /// result back into balance arithmetic.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(100050).to_major_units(), 1000.5);
    /// ```
    #[inline]
    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns this value as a percentage of `base`.
    ///
    /// ## Rules
    /// - Returns `None` when `base` is zero (the ratio is undefined;
    ///   callers decide how to escalate that case)
    /// - Sign follows this value: a shortfall against a positive base
    ///   yields a negative percentage
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let shortfall = Money::from_cents(-500);   // -$5.00
    /// let expected = Money::from_cents(13000);   // $130.00
    /// let pct = shortfall.percent_of(expected).unwrap();
    /// assert!((pct - (-3.8461538)).abs() < 0.0001);
    ///
    /// assert!(shortfall.percent_of(Money::zero()).is_none());
    /// ```
    pub fn percent_of(&self, base: Money) -> Option<f64> {
        if base.is_zero() {
            return None;
        }
        Some(self.0 as f64 / base.0 as f64 * 100.0)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and log output. Use frontend formatting for
/// actual UI display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Negation, used when expense movements subtract from a running net.
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(13099);
        assert_eq!(money.cents(), 13099);
        assert_eq!(money.dollars(), 130);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        let money = Money::from_major_minor(130, 0);
        assert_eq!(money.cents(), 13000);

        let negative = Money::from_major_minor(-5, 50);
        assert_eq!(negative.cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(13000)), "$130.00");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(10000);
        let b = Money::from_cents(5000);

        assert_eq!((a + b).cents(), 15000);
        assert_eq!((a - b).cents(), 5000);
        assert_eq!((-b).cents(), -5000);
    }

    #[test]
    fn test_assign_ops() {
        let mut net = Money::zero();
        net += Money::from_cents(5000); // income
        net -= Money::from_cents(2000); // expense
        assert_eq!(net.cents(), 3000);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(!positive.is_zero());
        assert!(positive.is_positive());
        assert!(!positive.is_negative());

        let negative = Money::from_cents(-100);
        assert!(!negative.is_zero());
        assert!(!negative.is_positive());
        assert!(negative.is_negative());
    }

    #[test]
    fn test_to_major_units() {
        assert_eq!(Money::from_cents(100000).to_major_units(), 1000.0);
        assert_eq!(Money::from_cents(-550).to_major_units(), -5.5);
        assert_eq!(Money::zero().to_major_units(), 0.0);
    }

    #[test]
    fn test_percent_of() {
        // -$5.00 against $130.00 is roughly -3.85%
        let pct = Money::from_cents(-500)
            .percent_of(Money::from_cents(13000))
            .unwrap();
        assert!((pct - (-3.8461538)).abs() < 0.0001);

        // -$15.00 against $100.00 is exactly -15%
        let pct = Money::from_cents(-1500)
            .percent_of(Money::from_cents(10000))
            .unwrap();
        assert!((pct - (-15.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_of_zero_base_is_undefined() {
        assert!(Money::from_cents(500).percent_of(Money::zero()).is_none());
        assert!(Money::zero().percent_of(Money::zero()).is_none());
    }
}
