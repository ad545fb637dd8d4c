//! # Engine Error Type
//!
//! Unified error type for engine operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally                                   │
//! │                                                                         │
//! │  Caller                       Engine                                    │
//! │  ──────                       ──────                                    │
//! │                                                                         │
//! │  close_session(...)                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Engine Operation                                                │  │
//! │  │  Result<T, EngineError>                                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::NotFound ───────────┐             │  │
//! │  │         │                                          │             │  │
//! │  │         ▼                                          ▼             │  │
//! │  │  Business Error? ─── CoreError::SessionAlreadyOpen ─ EngineError │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ───────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "SESSION_CONFLICT",                                          │
//! │    "message": "Register ... already has an active session: ..." }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error here is caller-recoverable: the operation did not happen and
//! no partial state was persisted. Store unavailability surfaces as
//! DATABASE_ERROR unchanged; retry policy belongs to the transport layer.

use serde::Serialize;
use tally_core::CoreError;
use tally_db::DbError;

/// Error returned from engine operations.
///
/// ## Serialization
/// This is what a caller receives when an operation fails:
/// ```json
/// {
///   "code": "SESSION_CONFLICT",
///   "message": "Register reg-1 already has an active session: sess-9"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for engine responses.
///
/// ## Code Mapping
/// ```text
/// NotFound        → NOT_FOUND
/// InvalidState    → BUSINESS_LOGIC / ALREADY_RESOLVED
/// InvalidAmount   → INVALID_AMOUNT
/// SessionConflict → SESSION_CONFLICT
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced register/session/movement/rule/request does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// Operation attempted against an entity in the wrong lifecycle state
    BusinessLogic,

    /// Register already has an active (open or suspended) session
    SessionConflict,

    /// Non-positive or balance-violating monetary input
    InvalidAmount,

    /// Approve/reject/resolve applied to an already-decided record
    AlreadyResolved,

    /// Internal engine error
    Internal,
}

impl EngineError {
    /// Creates a new engine error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        EngineError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        EngineError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::new(ErrorCode::Internal, message)
    }
}

/// Converts core business errors to engine errors.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RegisterNotFound(id) => EngineError::not_found("Register", &id),
            CoreError::SessionNotFound(id) => EngineError::not_found("Session", &id),
            CoreError::MovementNotFound(id) => EngineError::not_found("Movement", &id),
            CoreError::MovementTypeNotFound(id) => EngineError::not_found("Movement type", &id),
            CoreError::RuleNotFound(id) => EngineError::not_found("Approval rule", &id),
            CoreError::RequestNotFound(id) => EngineError::not_found("Approval request", &id),
            CoreError::ReportNotFound(id) => EngineError::not_found("Discrepancy report", &id),
            CoreError::SessionAlreadyOpen { .. } => {
                EngineError::new(ErrorCode::SessionConflict, err.to_string())
            }
            CoreError::NoOpenSession(_)
            | CoreError::InvalidSessionStatus { .. }
            | CoreError::MovementLocked { .. }
            | CoreError::RegisterInactive(_)
            | CoreError::MovementTypeInactive(_) => {
                EngineError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::RequestAlreadyDecided { .. } | CoreError::ReportAlreadyResolved { .. } => {
                EngineError::new(ErrorCode::AlreadyResolved, err.to_string())
            }
            CoreError::InvalidAmount { .. } | CoreError::NegativeBalance { .. } => {
                EngineError::new(ErrorCode::InvalidAmount, err.to_string())
            }
            CoreError::Validation(e) => EngineError::validation(e.to_string()),
        }
    }
}

/// Converts database errors to engine errors.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => EngineError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                EngineError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::BalanceFloor { register_id } => EngineError::new(
                ErrorCode::InvalidAmount,
                format!(
                    "Balance update would take register {} below zero",
                    register_id
                ),
            ),
            DbError::ConnectionFailed(_) => {
                EngineError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                EngineError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                EngineError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
