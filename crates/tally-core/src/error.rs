//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine errors (separate crate)                                  │
//! │  └── EngineError      - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → Caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (register ID, session ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use crate::money::Money;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Register cannot be found.
    #[error("Register not found: {0}")]
    RegisterNotFound(String),

    /// Session cannot be found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Movement cannot be found.
    #[error("Movement not found: {0}")]
    MovementNotFound(String),

    /// Movement type cannot be found.
    #[error("Movement type not found: {0}")]
    MovementTypeNotFound(String),

    /// Approval rule cannot be found.
    #[error("Approval rule not found: {0}")]
    RuleNotFound(String),

    /// Approval request cannot be found.
    #[error("Approval request not found: {0}")]
    RequestNotFound(String),

    /// Discrepancy report cannot be found.
    #[error("Discrepancy report not found: {0}")]
    ReportNotFound(String),

    /// Register already has an active session.
    ///
    /// ## When This Occurs
    /// - Opening a session while another is open on the same register
    /// - Opening a session while a suspended one is waiting to be resumed
    ///
    /// ## User Workflow
    /// ```text
    /// Open Session (register: FRONT-1)
    ///      │
    ///      ▼
    /// Check active sessions: one open since 08:00
    ///      │
    ///      ▼
    /// SessionAlreadyOpen { register_id: "...", session_id: "..." }
    ///      │
    ///      ▼
    /// UI shows: "Close or resume the existing session first"
    /// ```
    #[error("Register {register_id} already has an active session: {session_id}")]
    SessionAlreadyOpen {
        register_id: String,
        session_id: String,
    },

    /// Register has no open session to operate on.
    #[error("Register {0} has no open session")]
    NoOpenSession(String),

    /// Session is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Trying to close a session that's already closed
    /// - Trying to resume a session that isn't suspended
    /// - Trying to record a movement against a suspended session
    #[error("Session {session_id} is {current_status:?}, cannot perform operation")]
    InvalidSessionStatus {
        session_id: String,
        current_status: String,
    },

    /// Movement belongs to a session that has already been closed.
    ///
    /// ## When This Occurs
    /// - Amending or voiding a movement after its session closed
    ///
    /// The ledger for a closed session is frozen: the reconciliation that
    /// ran at close was computed from those rows, so they can never change.
    #[error("Movement {movement_id} belongs to closed session {session_id} and cannot be changed")]
    MovementLocked {
        movement_id: String,
        session_id: String,
    },

    /// Approval request was already decided.
    ///
    /// Re-applying the SAME decision is treated as an idempotent success by
    /// callers; this error fires only for the conflicting decision.
    #[error("Approval request {request_id} is already {status}")]
    RequestAlreadyDecided { request_id: String, status: String },

    /// Discrepancy report was already resolved.
    #[error("Discrepancy report {report_id} is already {status}")]
    ReportAlreadyResolved { report_id: String, status: String },

    /// Monetary amount is invalid.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Movement would take the register balance below zero.
    ///
    /// ## When This Occurs
    /// - Expense movement larger than the current drawer balance
    /// - Register is configured with allow_negative_balance=false
    #[error("Movement would leave register {register_id} at {resulting_balance}, negative balances are not allowed")]
    NegativeBalance {
        register_id: String,
        resulting_balance: Money,
    },

    /// Register exists but is deactivated.
    #[error("Register {0} is inactive")]
    RegisterInactive(String),

    /// Movement type exists but is deactivated.
    #[error("Movement type {0} is inactive")]
    MovementTypeInactive(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate register name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SessionAlreadyOpen {
            register_id: "reg-1".to_string(),
            session_id: "sess-9".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Register reg-1 already has an active session: sess-9"
        );

        let err = CoreError::NegativeBalance {
            register_id: "reg-1".to_string(),
            resulting_balance: Money::from_cents(-550),
        };
        assert_eq!(
            err.to_string(),
            "Movement would leave register reg-1 at -$5.50, negative balances are not allowed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooLong {
            field: "notes".to_string(),
            max: 500,
        };
        assert_eq!(err.to_string(), "notes must be at most 500 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
