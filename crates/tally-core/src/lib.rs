//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally. It contains all reconciliation
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Caller (UI / service)                        │   │
//! │  │    Open Session ──► Record Movements ──► Close ──► Review      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-engine (Orchestration)                 │   │
//! │  │    open_session, record_movement, close_session, approve, etc. │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │   rules   │  │   │
//! │  │   │  Session  │  │   Money   │  │  net sums │  │ evaluator │  │   │
//! │  │   │  Movement │  │  percent  │  │ expected  │  │ priority  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │discrepancy│  │  reports  │  │ validation│                 │   │
//! │  │   │  detect   │  │  rollups  │  │   checks  │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashRegister, RegisterSession, Movement, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - Net-movement sums and the expected-balance equation
//! - [`discrepancy`] - Counted-vs-expected detection and severity grading
//! - [`rules`] - Data-driven approval rule evaluation
//! - [`reports`] - Register/session/daily/analytics rollups
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::discrepancy::detect;
//! use tally_core::money::Money;
//!
//! // The ledger says the drawer should hold $130.00
//! let expected = Money::from_cents(13000);
//!
//! // The cashier counted $125.00
//! let counted = Money::from_cents(12500);
//!
//! // $5.00 short, graded Medium (-3.85% of expected)
//! let finding = detect(expected, counted).unwrap();
//! assert_eq!(finding.discrepancy.cents(), -500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discrepancy;
pub mod error;
pub mod ledger;
pub mod money;
pub mod reports;
pub mod rules;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default branch ID for v0.1 (single-branch runtime with multi-branch schema)
///
/// ## Why a constant?
/// v0.1 serves one branch, but registers carry branch_id for future
/// multi-branch deployments. This constant is used throughout the codebase
/// and will be replaced with dynamic branch resolution later.
pub const DEFAULT_BRANCH_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum length of free-text notes and resolutions
///
/// ## Business Reason
/// Notes travel into audit exports; unbounded text blows up report layouts
/// and invites people to paste whole emails into a till note.
pub const MAX_NOTES_LEN: usize = 500;

/// Maximum conditions on a single approval rule
///
/// ## Business Reason
/// A rule nobody can read is a rule nobody can audit. Twenty ANDed
/// conditions is already far beyond anything the seed rules need.
pub const MAX_RULE_CONDITIONS: usize = 20;
