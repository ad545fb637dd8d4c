//! # Discrepancy Detection
//!
//! Compares counted cash against the ledger's expectation at session close
//! and grades how bad the difference is.
//!
//! ## Detection Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Close Session                                                          │
//! │                                                                         │
//! │  expected = opening + net movements     counted = physical count       │
//! │       │                                      │                          │
//! │       └──────────────┬───────────────────────┘                          │
//! │                      ▼                                                  │
//! │            detect(expected, counted)                                    │
//! │                      │                                                  │
//! │        ┌─────────────┴─────────────┐                                    │
//! │        ▼                           ▼                                    │
//! │   exact match                 difference                                │
//! │   → None                      → DiscrepancyFinding                      │
//! │   (no report)                   discrepancy = counted - expected        │
//! │                                 percentage  = discrepancy/expected      │
//! │                                 severity    = graded by |percentage|    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Severity grades on the MAGNITUDE of the percentage: a till that is 15%
//! over is investigated as hard as one that is 15% short.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::DiscrepancySeverity;

// =============================================================================
// Severity Thresholds
// =============================================================================

/// Above this |percentage| a discrepancy is critical.
pub const CRITICAL_THRESHOLD_PCT: f64 = 10.0;

/// Above this |percentage| a discrepancy is high.
pub const HIGH_THRESHOLD_PCT: f64 = 5.0;

/// Above this |percentage| a discrepancy is medium. At or below it, low.
pub const MEDIUM_THRESHOLD_PCT: f64 = 2.0;

// =============================================================================
// Finding
// =============================================================================

/// The outcome of comparing counted cash against the expected balance.
///
/// All figures are frozen here and copied verbatim onto the persisted
/// report; nothing downstream recomputes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscrepancyFinding {
    pub expected: Money,
    pub actual: Money,
    /// actual - expected. Negative means a shortfall.
    pub discrepancy: Money,
    /// Signed percentage of expected. None when expected was zero.
    pub percentage: Option<f64>,
    pub severity: DiscrepancySeverity,
}

// =============================================================================
// Detection
// =============================================================================

/// Grades a discrepancy percentage into a severity.
///
/// ## Rules
/// - Thresholds compare strictly (exactly 2% is still Low)
/// - `None` means the expected balance was zero, so ANY difference is a
///   whole drawer appearing from nowhere: Critical
pub fn classify_severity(percentage: Option<f64>) -> DiscrepancySeverity {
    let magnitude = match percentage {
        Some(pct) => pct.abs(),
        None => return DiscrepancySeverity::Critical,
    };

    if magnitude > CRITICAL_THRESHOLD_PCT {
        DiscrepancySeverity::Critical
    } else if magnitude > HIGH_THRESHOLD_PCT {
        DiscrepancySeverity::High
    } else if magnitude > MEDIUM_THRESHOLD_PCT {
        DiscrepancySeverity::Medium
    } else {
        DiscrepancySeverity::Low
    }
}

/// Compares counted cash against the expectation.
///
/// Returns `None` when the drawer reconciles to the cent; a session that
/// balances exactly produces no report at all.
///
/// ## Example
/// ```rust
/// use tally_core::discrepancy::detect;
/// use tally_core::money::Money;
///
/// // Drawer balances: nothing to report
/// assert!(detect(Money::from_cents(13000), Money::from_cents(13000)).is_none());
///
/// // $5 short on $130 expected
/// let finding = detect(Money::from_cents(13000), Money::from_cents(12500)).unwrap();
/// assert_eq!(finding.discrepancy.cents(), -500);
/// ```
pub fn detect(expected: Money, actual: Money) -> Option<DiscrepancyFinding> {
    let discrepancy = actual - expected;
    if discrepancy.is_zero() {
        return None;
    }

    let percentage = discrepancy.percent_of(expected);

    Some(DiscrepancyFinding {
        expected,
        actual,
        discrepancy,
        percentage,
        severity: classify_severity(percentage),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_yields_no_finding() {
        assert!(detect(Money::from_cents(13000), Money::from_cents(13000)).is_none());
        assert!(detect(Money::zero(), Money::zero()).is_none());
    }

    #[test]
    fn test_small_shortfall_is_medium() {
        // $5 short on $130 expected is -3.85%
        let finding = detect(Money::from_cents(13000), Money::from_cents(12500)).unwrap();

        assert_eq!(finding.discrepancy.cents(), -500);
        let pct = finding.percentage.unwrap();
        assert!((pct - (-3.8461538)).abs() < 0.0001);
        assert_eq!(finding.severity, DiscrepancySeverity::Medium);
    }

    #[test]
    fn test_large_shortfall_is_critical() {
        // $15 short on $100 expected is -15%
        let finding = detect(Money::from_cents(10000), Money::from_cents(8500)).unwrap();

        assert_eq!(finding.discrepancy.cents(), -1500);
        assert!((finding.percentage.unwrap() - (-15.0)).abs() < f64::EPSILON);
        assert_eq!(finding.severity, DiscrepancySeverity::Critical);
    }

    #[test]
    fn test_overage_grades_like_shortfall() {
        // $7 over on $100 expected is +7%, same tier as -7%
        let finding = detect(Money::from_cents(10000), Money::from_cents(10700)).unwrap();

        assert_eq!(finding.discrepancy.cents(), 700);
        assert_eq!(finding.severity, DiscrepancySeverity::High);
    }

    #[test]
    fn test_zero_expected_is_always_critical() {
        // Cash in a drawer the ledger says should be empty
        let finding = detect(Money::zero(), Money::from_cents(5000)).unwrap();

        assert_eq!(finding.discrepancy.cents(), 5000);
        assert!(finding.percentage.is_none());
        assert_eq!(finding.severity, DiscrepancySeverity::Critical);
    }

    #[test]
    fn test_threshold_boundaries_are_strict() {
        assert_eq!(classify_severity(Some(2.0)), DiscrepancySeverity::Low);
        assert_eq!(classify_severity(Some(2.01)), DiscrepancySeverity::Medium);
        assert_eq!(classify_severity(Some(5.0)), DiscrepancySeverity::Medium);
        assert_eq!(classify_severity(Some(-5.01)), DiscrepancySeverity::High);
        assert_eq!(classify_severity(Some(10.0)), DiscrepancySeverity::High);
        assert_eq!(classify_severity(Some(-10.01)), DiscrepancySeverity::Critical);
        assert_eq!(classify_severity(None), DiscrepancySeverity::Critical);
    }

    #[test]
    fn test_tiny_discrepancy_still_detected() {
        // One cent off still produces a finding, graded Low
        let finding = detect(Money::from_cents(13000), Money::from_cents(13001)).unwrap();

        assert_eq!(finding.discrepancy.cents(), 1);
        assert_eq!(finding.severity, DiscrepancySeverity::Low);
    }
}
