//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CashRegister   │   │ RegisterSession │   │    Movement     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (business)│   │  register_id    │   │  session_id (FK)│       │
//! │  │  current_balance│   │  status         │   │  category       │       │
//! │  │  is_active      │   │  opening/closing│   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  ApprovalRule   │   │ ApprovalRequest │   │DiscrepancyReport│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  event_type     │   │  status         │   │  severity       │       │
//! │  │  conditions     │   │  priority       │   │  percentage     │       │
//! │  │  auto_approve   │   │  amount_cents   │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (register name, movement type code, etc.) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cash Register
// =============================================================================

/// A physical cash register (drawer) at a branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashRegister {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Branch this register belongs to.
    pub branch_id: String,

    /// Display name shown on the status board ("Front Desk 1").
    pub name: String,

    /// Optional physical location hint ("ground floor, left of entrance").
    pub location: Option<String>,

    /// Default opening float in cents, suggested when a session opens.
    pub initial_balance_cents: i64,

    /// Current drawer balance in cents, maintained by the store on every
    /// session open/close and movement write. Never computed client-side.
    pub current_balance_cents: i64,

    /// Allow expense movements to take the balance below zero.
    pub allow_negative_balance: bool,

    /// Whether register is active (soft delete).
    pub is_active: bool,

    /// When the register was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the register was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashRegister {
    /// Returns the default opening float as Money.
    #[inline]
    pub fn initial_balance(&self) -> Money {
        Money::from_cents(self.initial_balance_cents)
    }

    /// Returns the current drawer balance as Money.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// The status of a register session.
///
/// ## State Machine
/// ```text
/// open ──suspend──► suspended ──resume──► open
///   │                   │
///   └───────close───────┘──► closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is live, movements can be recorded.
    Open,
    /// Exceptional hold (shift handover, manager pulled the cashier away).
    /// Movements can still be recorded; the session still owns the register.
    Suspended,
    /// Session has been reconciled and closed. Terminal.
    Closed,
}

impl SessionStatus {
    /// An active session (open or suspended) holds the register exclusively.
    ///
    /// ## Rules
    /// - At most one active session per register at any time
    /// - Only active sessions can transition; closed is terminal
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Open | SessionStatus::Suspended)
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Open
    }
}

// =============================================================================
// Register Session
// =============================================================================

/// A cashier's working period on a register, from open to close.
///
/// Balances captured at close use the snapshot pattern: expected and
/// discrepancy are frozen at close time and never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RegisterSession {
    pub id: String,
    pub register_id: String,
    /// Employee operating this session.
    pub employee_id: String,
    /// User who closed the session (usually the same employee).
    pub closed_by: Option<String>,
    /// Cash in the drawer when the session opened.
    pub opening_balance_cents: i64,
    /// Cash physically counted at close (None while active).
    pub closing_balance_cents: Option<i64>,
    /// Opening balance plus the net of all movements, frozen at close.
    pub expected_balance_cents: Option<i64>,
    /// closing - expected, frozen at close. Negative means a shortfall.
    pub discrepancy_cents: Option<i64>,
    pub status: SessionStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl RegisterSession {
    /// Returns the opening balance as Money.
    #[inline]
    pub fn opening_balance(&self) -> Money {
        Money::from_cents(self.opening_balance_cents)
    }

    /// Returns the counted closing balance as Money, if closed.
    #[inline]
    pub fn closing_balance(&self) -> Option<Money> {
        self.closing_balance_cents.map(Money::from_cents)
    }

    /// Returns the expected balance as Money, if closed.
    #[inline]
    pub fn expected_balance(&self) -> Option<Money> {
        self.expected_balance_cents.map(Money::from_cents)
    }

    /// Returns the discrepancy as Money, if closed.
    #[inline]
    pub fn discrepancy(&self) -> Option<Money> {
        self.discrepancy_cents.map(Money::from_cents)
    }

    /// Whether this session currently holds its register.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

// =============================================================================
// Movement Category
// =============================================================================

/// Direction of a cash movement relative to the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementCategory {
    /// Cash entering the drawer (sale, deposit).
    Income,
    /// Cash leaving the drawer (refund, withdrawal, supplier payment).
    Expense,
    /// Register-to-register transfer. Balance-neutral in the net: the
    /// cash office books both sides, so it is tracked for audit only.
    Transfer,
}

// =============================================================================
// Movement Type
// =============================================================================

/// A configurable kind of cash movement ("Sale", "Supplier Payment").
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MovementType {
    pub id: String,
    /// Business identifier, stable across renames ("SALE", "SUPPLIER_PAY").
    pub code: String,
    pub name: String,
    pub category: MovementCategory,
    pub description: Option<String>,
    /// Whether type is active (soft delete). Inactive types keep their
    /// historical movements but reject new ones.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Movement
// =============================================================================

/// A single cash movement in a session's ledger.
///
/// The category is snapshotted from the movement type at record time, so
/// ledger arithmetic never depends on later edits to the type catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub register_id: String,
    /// Session this movement was recorded under. Movements only ever
    /// exist inside an open session.
    pub session_id: String,
    pub movement_type_id: String,
    /// Category at time of recording (frozen).
    pub category: MovementCategory,
    /// Magnitude in cents, always positive. Direction comes from category.
    pub amount_cents: i64,
    pub description: Option<String>,
    /// External reference (receipt number, invoice, deposit slip).
    pub reference: Option<String>,
    /// User who recorded the movement.
    pub recorded_by: String,
    /// When the cash event happened.
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    /// Set when the movement is amended while its session is still active.
    #[ts(as = "Option<String>")]
    pub amended_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Returns the movement magnitude as Money (always positive).
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the amount signed by category: income positive, expense
    /// negative, transfer zero. This is the value ledger sums are built
    /// from; transfers show up in audit totals, never in the net.
    #[inline]
    pub fn signed_amount(&self) -> Money {
        match self.category {
            MovementCategory::Income => self.amount(),
            MovementCategory::Expense => -self.amount(),
            MovementCategory::Transfer => Money::zero(),
        }
    }
}

// =============================================================================
// Approval Event Type
// =============================================================================

/// The kind of event an approval rule watches for.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalEventType {
    /// Any session close; rules here can gate every close uniformly.
    SessionClose,
    /// A single movement above a configured size.
    LargeMovement,
    /// A close-time difference between counted and expected cash.
    Discrepancy,
    /// An expense that would take the drawer balance below zero.
    NegativeBalance,
}

// =============================================================================
// Rule Conditions
// =============================================================================

/// Comparison operator inside a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    GreaterThan,
    LessThan,
    Equals,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// One predicate of an approval rule, compared against an event fact.
///
/// ## Example
/// ```json
/// { "field": "discrepancyPercentage", "operator": "greater_than", "value": 5 }
/// ```
/// Values are in display units: an amount threshold of 1000 means $1000.00.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RuleCondition {
    /// Dotted path into the event fact ("amount", "discrepancyPercentage").
    pub field: String,
    pub operator: ConditionOperator,
    /// Threshold or expected value.
    #[ts(type = "number | string | boolean")]
    pub value: serde_json::Value,
}

// =============================================================================
// Approval Rule
// =============================================================================

/// A data-driven rule deciding what happens when an event fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ApprovalRule {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub event_type: ApprovalEventType,
    /// Conditions as a JSON array (stored verbatim in the database).
    /// Use [`ApprovalRule::conditions`] to decode.
    pub conditions_json: String,
    /// If true, a matching event is waved through without a request.
    pub auto_approve: bool,
    /// If true, a matching event creates a pending approval request.
    pub require_manager_approval: bool,
    /// Whether rule is active (soft delete). Inactive rules are skipped.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRule {
    /// Decodes the stored conditions array.
    ///
    /// Rules are validated on write, so a decode failure here means the
    /// stored JSON was corrupted outside the application.
    pub fn conditions(&self) -> Result<Vec<RuleCondition>, crate::error::ValidationError> {
        serde_json::from_str(&self.conditions_json).map_err(|e| {
            crate::error::ValidationError::InvalidFormat {
                field: "conditions".to_string(),
                reason: e.to_string(),
            }
        })
    }
}

// =============================================================================
// Approval Request
// =============================================================================

/// The status of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalRequestStatus {
    /// Waiting for a manager decision.
    Pending,
    /// Manager approved. Terminal.
    Approved,
    /// Manager rejected. Terminal.
    Rejected,
}

impl Default for ApprovalRequestStatus {
    fn default() -> Self {
        ApprovalRequestStatus::Pending
    }
}

/// Urgency of a pending approval request, derived from the event size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// A pending or decided manager approval.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ApprovalRequest {
    pub id: String,
    pub event_type: ApprovalEventType,
    pub status: ApprovalRequestStatus,
    pub register_id: String,
    /// Session the event happened in, when there was one.
    pub session_id: Option<String>,
    /// Set for large_movement and negative_balance events.
    pub movement_id: Option<String>,
    /// Size of the triggering event in cents (always positive).
    pub amount_cents: i64,
    pub description: String,
    pub priority: RequestPriority,
    pub requested_by: String,
    #[ts(as = "String")]
    pub requested_at: DateTime<Utc>,
    /// Manager who decided the request (set on both approve and reject).
    pub approved_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Manager's note attached to the decision.
    pub comments: Option<String>,
}

impl ApprovalRequest {
    /// Returns the triggering event size as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Discrepancy Report
// =============================================================================

/// How serious a close-time discrepancy is, stamped at detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancySeverity {
    /// Within 2% of expected.
    Low,
    /// Over 2% of expected.
    Medium,
    /// Over 5% of expected.
    High,
    /// Over 10% of expected, or expected was zero.
    Critical,
}

/// Lifecycle of a discrepancy report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyStatus {
    /// Detected, nobody has looked at it yet.
    Pending,
    /// A manager approved the linked request; the difference is accepted.
    Approved,
    /// Someone is actively looking into it.
    Investigating,
    /// Explained and closed out. Terminal.
    Resolved,
}

impl Default for DiscrepancyStatus {
    fn default() -> Self {
        DiscrepancyStatus::Pending
    }
}

/// A close-time difference between counted and expected cash.
///
/// All balance figures are frozen at detection; resolving a report never
/// recomputes them.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DiscrepancyReport {
    pub id: String,
    pub session_id: String,
    pub register_id: String,
    /// What the ledger said should be in the drawer.
    pub expected_cents: i64,
    /// What was physically counted.
    pub actual_cents: i64,
    /// actual - expected. Negative means a shortfall.
    pub discrepancy_cents: i64,
    /// Signed discrepancy as a percentage of expected. None when expected
    /// was zero (the ratio is undefined; severity is Critical instead).
    pub percentage: Option<f64>,
    pub severity: DiscrepancySeverity,
    pub status: DiscrepancyStatus,
    /// Whoever closed the session and surfaced the difference.
    pub reported_by: String,
    #[ts(as = "String")]
    pub reported_at: DateTime<Utc>,
    /// Explanation recorded when the report is resolved.
    pub resolution: Option<String>,
    pub resolved_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Approval request spawned for this report, when a rule required one.
    pub approval_request_id: Option<String>,
}

impl DiscrepancyReport {
    /// Returns the expected balance as Money.
    #[inline]
    pub fn expected(&self) -> Money {
        Money::from_cents(self.expected_cents)
    }

    /// Returns the counted balance as Money.
    #[inline]
    pub fn actual(&self) -> Money {
        Money::from_cents(self.actual_cents)
    }

    /// Returns the signed discrepancy as Money.
    #[inline]
    pub fn discrepancy(&self) -> Money {
        Money::from_cents(self.discrepancy_cents)
    }

    /// Returns the unsigned percentage used for threshold comparisons.
    ///
    /// ## Rules
    /// - A -15% shortfall and a +15% overage are equally alarming, so
    ///   thresholds compare against the magnitude
    /// - When expected was zero the percentage is undefined; returns
    ///   `f64::MAX` so ANY finite threshold is exceeded
    pub fn percentage_magnitude(&self) -> f64 {
        match self.percentage {
            Some(pct) => pct.abs(),
            None => f64::MAX,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
