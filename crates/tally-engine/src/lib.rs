//! # tally-engine: Orchestration Layer for Tally
//!
//! This crate composes [`tally_core`] (pure reconciliation logic) and
//! [`tally_db`] (SQLite store) into the operations callers actually invoke.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Call Flow                                  │
//! │                                                                         │
//! │  Caller (UI / service)                                                  │
//! │       │  close_session("sess-1", "emp-1", 12_500, None)                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   1. validate inputs          (tally-core::validation)          │   │
//! │  │   2. load + guard state       (tally-db repositories)           │   │
//! │  │   3. reconcile + evaluate     (tally-core ledger/rules)         │   │
//! │  │   4. persist atomically       (tally-db transactions)           │   │
//! │  │   5. log + translate errors   (tracing, EngineError)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CloseSessionOutcome { session, report?, requests }                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The [`Engine`] handle and rule-evaluation wiring
//! - [`sessions`] - Session lifecycle (open, suspend, resume, close)
//! - [`movements`] - Movement recording, amendment, and the type catalog
//! - [`approvals`] - Approval requests and rule administration
//! - [`discrepancies`] - Discrepancy report lifecycle
//! - [`registers`] - Register registry and the status board
//! - [`reports`] - Register/session/daily/analytics rollups
//! - [`error`] - [`EngineError`] and its mappings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_engine::Engine;
//! use tally_db::DbConfig;
//!
//! let engine = Engine::open(DbConfig::new("./data/tally.db")).await?;
//! let session = engine
//!     .open_session(&register_id, "emp-1", 10_000, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod approvals;
pub mod discrepancies;
pub mod engine;
pub mod error;
pub mod movements;
pub mod registers;
pub mod reports;
pub mod sessions;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorCode};
pub use movements::RecordMovementOutcome;
pub use registers::{RegisterState, RegisterStatusView};
pub use sessions::CloseSessionOutcome;

// Part of the reporting API surface; re-exported so callers need not
// depend on tally-core directly for it.
pub use tally_core::reports::ReportFilter;
