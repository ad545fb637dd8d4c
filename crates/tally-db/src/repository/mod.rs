//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Engine Operation                                                      │
//! │       │                                                                 │
//! │       │  db.sessions().get_active_for_register(register_id)            │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  SessionRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── get_active_for_register(&self, register_id)                       │
//! │  ├── insert_open(&self, session)                                       │
//! │  └── close(&self, ...)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Multi-statement writes stay in one transaction                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`register::RegisterRepository`] - Cash register CRUD and balance updates
//! - [`session::SessionRepository`] - Session lifecycle (open/suspend/resume/close)
//! - [`movement::MovementRepository`] - Ledger appends and amendments
//! - [`movement_type::MovementTypeRepository`] - Movement type catalog
//! - [`rule::RuleRepository`] - Approval rule storage
//! - [`approval::ApprovalRepository`] - Approval request queue
//! - [`discrepancy::DiscrepancyRepository`] - Discrepancy report tracking

pub mod approval;
pub mod discrepancy;
pub mod movement;
pub mod movement_type;
pub mod register;
pub mod rule;
pub mod session;
