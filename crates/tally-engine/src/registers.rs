//! # Register Registry Operations
//!
//! Creating and administering cash registers, plus the status board a
//! branch console shows at a glance.
//!
//! ## Status Board
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Front Desk 1    in_use      $130.00   emp-1 since 08:02                │
//! │  Front Desk 2    suspended   $85.50    emp-4 since 07:45                │
//! │  Back Office     available   $50.00                                     │
//! │  Old Kiosk       inactive    $0.00                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use tally_core::money::Money;
use tally_core::validation::{validate_opening_balance, validate_register_name};
use tally_core::{CashRegister, CoreError, SessionStatus, DEFAULT_BRANCH_ID};
use tally_db::repository::register::generate_register_id;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Status Board DTOs
// =============================================================================

/// One register's state on the status board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterState {
    /// Active, no session: ready for a cashier.
    Available,
    /// An open session holds the register.
    InUse,
    /// The active session is suspended (shift handover in progress).
    Suspended,
    /// Register is deactivated.
    Inactive,
}

/// A row of the register status board.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStatusView {
    pub register_id: String,
    pub name: String,
    pub location: Option<String>,
    pub state: RegisterState,
    pub current_balance_cents: i64,
    /// Who holds the register, when someone does.
    pub session_id: Option<String>,
    pub employee_id: Option<String>,
    pub opened_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Operations
// =============================================================================

impl Engine {
    /// Creates a register.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` - Bad name, negative float, or duplicate name
    ///   within the branch
    pub async fn create_register(
        &self,
        name: &str,
        location: Option<String>,
        initial_balance_cents: i64,
        allow_negative_balance: bool,
    ) -> EngineResult<CashRegister> {
        validate_register_name(name).map_err(CoreError::Validation)?;
        validate_opening_balance(initial_balance_cents).map_err(CoreError::Validation)?;

        let now = Utc::now();
        let register = CashRegister {
            id: generate_register_id(),
            branch_id: DEFAULT_BRANCH_ID.to_string(),
            name: name.trim().to_string(),
            location,
            initial_balance_cents,
            current_balance_cents: initial_balance_cents,
            allow_negative_balance,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db().registers().insert(&register).await?;

        info!(register_id = %register.id, name = %register.name, "Register created");

        Ok(register)
    }

    /// Gets a register by ID.
    pub async fn get_register(&self, register_id: &str) -> EngineResult<CashRegister> {
        self.db()
            .registers()
            .get_by_id(register_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Register", register_id))
    }

    /// Lists registers, optionally including deactivated ones.
    pub async fn list_registers(&self, include_inactive: bool) -> EngineResult<Vec<CashRegister>> {
        Ok(self.db().registers().list(include_inactive).await?)
    }

    /// Deactivates a register. History survives; new sessions are refused.
    ///
    /// ## Errors
    /// - `BUSINESS_LOGIC` - An active session still holds the register;
    ///   close it first
    pub async fn deactivate_register(&self, register_id: &str) -> EngineResult<()> {
        debug!(register_id = %register_id, "Deactivating register");

        // Deactivating under a live session would strand the cashier
        if let Some(session) = self
            .db()
            .sessions()
            .get_active_for_register(register_id)
            .await?
        {
            return Err(CoreError::SessionAlreadyOpen {
                register_id: register_id.to_string(),
                session_id: session.id,
            }
            .into());
        }

        self.db().registers().set_active(register_id, false).await?;

        info!(register_id = %register_id, "Register deactivated");

        Ok(())
    }

    /// Administrative balance override, outside any session.
    ///
    /// ## Usage
    /// Corrections a manager makes against a physical recount ("found a
    /// rubber-banded roll under the tray"). Always warn-logged with both
    /// figures; this bypasses the ledger entirely.
    pub async fn override_register_balance(
        &self,
        register_id: &str,
        new_balance_cents: i64,
        adjusted_by: &str,
    ) -> EngineResult<CashRegister> {
        let register = self.get_register(register_id).await?;

        if new_balance_cents < 0 && !register.allow_negative_balance {
            return Err(CoreError::NegativeBalance {
                register_id: register_id.to_string(),
                resulting_balance: Money::from_cents(new_balance_cents),
            }
            .into());
        }

        warn!(
            register_id = %register_id,
            old_cents = register.current_balance_cents,
            new_cents = new_balance_cents,
            adjusted_by = %adjusted_by,
            "Register balance overridden administratively"
        );

        self.db()
            .registers()
            .set_balance(register_id, new_balance_cents)
            .await?;

        self.get_register(register_id).await
    }

    /// The status board: one row per register with its occupancy.
    pub async fn register_statuses(&self) -> EngineResult<Vec<RegisterStatusView>> {
        let registers = self.db().registers().list(true).await?;

        let mut board = Vec::with_capacity(registers.len());
        for register in registers {
            let session = if register.is_active {
                self.db()
                    .sessions()
                    .get_active_for_register(&register.id)
                    .await?
            } else {
                None
            };

            let state = if !register.is_active {
                RegisterState::Inactive
            } else {
                match session.as_ref().map(|s| s.status) {
                    None => RegisterState::Available,
                    Some(SessionStatus::Open) => RegisterState::InUse,
                    Some(SessionStatus::Suspended) => RegisterState::Suspended,
                    // Closed sessions are never returned as active
                    Some(SessionStatus::Closed) => RegisterState::Available,
                }
            };

            board.push(RegisterStatusView {
                register_id: register.id,
                name: register.name,
                location: register.location,
                state,
                current_balance_cents: register.current_balance_cents,
                session_id: session.as_ref().map(|s| s.id.clone()),
                employee_id: session.as_ref().map(|s| s.employee_id.clone()),
                opened_at: session.as_ref().map(|s| s.opened_at),
            });
        }

        Ok(board)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
