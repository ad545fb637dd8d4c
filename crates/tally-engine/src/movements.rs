//! # Movement Operations
//!
//! Recording and amending cash movements, plus the movement type catalog.
//!
//! ## Record Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_movement(register, type, amount, ...)                           │
//! │                                                                         │
//! │  validate amount > 0                                                    │
//! │       │                                                                 │
//! │  load register (active) + movement type (active)                        │
//! │       │                                                                 │
//! │  active session on the register? ──no──► NO_OPEN_SESSION               │
//! │       │yes                                                              │
//! │  would an expense take a guarded register below zero?                   │
//! │       │yes: negative_balance rules                                      │
//! │       │    auto_approve → proceed with the floor lifted                 │
//! │       │    needs approval → pending request, movement REJECTED          │
//! │       │    pass → movement REJECTED                                     │
//! │       ▼                                                                 │
//! │  large_movement rules → approval request rides the append               │
//! │       │                                                                 │
//! │  ONE transaction: insert movement + delta balance (+ request)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are positive magnitudes; direction comes from the movement
//! type's category, snapshotted onto the row at record time.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use tally_core::rules::{balance_fact, calculate_priority, movement_fact};
use tally_core::validation::{
    validate_movement_amount, validate_notes, validate_reference, validate_rule_name,
    validate_type_code,
};
use tally_core::{
    ApprovalEventType, ApprovalRequest, ApprovalRequestStatus, CoreError, Movement,
    MovementCategory, MovementType,
};
use tally_db::repository::approval::generate_request_id;
use tally_db::repository::movement::generate_movement_id;
use tally_db::repository::movement_type::generate_movement_type_id;
use tally_db::DbError;

use crate::engine::{Engine, EventOutcome};
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Outcome DTO
// =============================================================================

/// A recorded movement plus the approval request a rule may have spawned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementOutcome {
    pub movement: Movement,
    /// Pending request from a large-movement rule, if one fired.
    pub approval_request: Option<ApprovalRequest>,
}

// =============================================================================
// Operations
// =============================================================================

impl Engine {
    /// Records a movement against the register's active session.
    ///
    /// ## Errors
    /// - `NOT_FOUND` - Register or movement type does not exist
    /// - `BUSINESS_LOGIC` - No active session, or register/type inactive
    /// - `INVALID_AMOUNT` - Non-positive amount, or an expense that would
    ///   take a floor-guarded register below zero without a rule waving
    ///   it through
    pub async fn record_movement(
        &self,
        register_id: &str,
        movement_type_id: &str,
        amount_cents: i64,
        description: Option<String>,
        reference: Option<String>,
        recorded_by: &str,
    ) -> EngineResult<RecordMovementOutcome> {
        debug!(
            register_id = %register_id,
            movement_type_id = %movement_type_id,
            amount_cents = amount_cents,
            "Recording movement"
        );

        validate_movement_amount(amount_cents).map_err(CoreError::Validation)?;
        if let Some(description) = description.as_deref() {
            validate_notes(description).map_err(CoreError::Validation)?;
        }
        if let Some(reference) = reference.as_deref() {
            validate_reference(reference).map_err(CoreError::Validation)?;
        }

        let register = self
            .db()
            .registers()
            .get_by_id(register_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Register", register_id))?;
        if !register.is_active {
            return Err(CoreError::RegisterInactive(register_id.to_string()).into());
        }

        let movement_type = self
            .db()
            .movement_types()
            .get_by_id(movement_type_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Movement type", movement_type_id))?;
        if !movement_type.is_active {
            return Err(CoreError::MovementTypeInactive(movement_type_id.to_string()).into());
        }

        let session = self
            .db()
            .sessions()
            .get_active_for_register(register_id)
            .await?
            .ok_or_else(|| {
                EngineError::from(CoreError::NoOpenSession(register_id.to_string()))
            })?;

        let now = Utc::now();
        let movement = Movement {
            id: generate_movement_id(),
            register_id: register_id.to_string(),
            session_id: session.id.clone(),
            movement_type_id: movement_type_id.to_string(),
            // Snapshot: later catalog edits never re-sign history
            category: movement_type.category,
            amount_cents,
            description,
            reference,
            recorded_by: recorded_by.to_string(),
            occurred_at: now,
            amended_at: None,
            created_at: now,
        };
        let delta = movement.signed_amount();

        // Negative-balance gate. Only expenses on a floor-guarded register
        // can trip it; the in-transaction floor below is the backstop
        // against a stale balance read.
        let mut enforce_floor = true;
        let resulting = register.current_balance() + delta;
        if resulting.is_negative() && !register.allow_negative_balance {
            let fact = balance_fact(resulting, movement.amount());
            match self
                .evaluate_event(ApprovalEventType::NegativeBalance, &fact)
                .await?
            {
                EventOutcome::AutoApproved { rule_name } => {
                    warn!(
                        register_id = %register_id,
                        resulting_cents = resulting.cents(),
                        rule = %rule_name,
                        "Negative balance auto-approved by rule"
                    );
                    enforce_floor = false;
                }
                EventOutcome::NeedsApproval { rule_name } => {
                    // The movement is rejected; the request documents the
                    // attempt so a manager can pre-clear a retry.
                    let request = ApprovalRequest {
                        id: generate_request_id(),
                        event_type: ApprovalEventType::NegativeBalance,
                        status: ApprovalRequestStatus::Pending,
                        register_id: register_id.to_string(),
                        session_id: Some(session.id.clone()),
                        movement_id: None,
                        amount_cents,
                        description: format!(
                            "Rejected {} of {} would leave register {} at {} (rule '{}')",
                            movement_type.name,
                            movement.amount(),
                            register.name,
                            resulting,
                            rule_name
                        ),
                        priority: calculate_priority(resulting, 0.0),
                        requested_by: recorded_by.to_string(),
                        requested_at: now,
                        approved_by: None,
                        approved_at: None,
                        comments: None,
                    };
                    self.db().approvals().insert(&request).await?;

                    return Err(CoreError::NegativeBalance {
                        register_id: register_id.to_string(),
                        resulting_balance: resulting,
                    }
                    .into());
                }
                EventOutcome::Pass => {
                    return Err(CoreError::NegativeBalance {
                        register_id: register_id.to_string(),
                        resulting_balance: resulting,
                    }
                    .into());
                }
            }
        }

        // Large-movement gate: the request rides the append transaction
        let approval_request = match self
            .evaluate_event(ApprovalEventType::LargeMovement, &movement_fact(&movement))
            .await?
        {
            EventOutcome::NeedsApproval { rule_name } => Some(ApprovalRequest {
                id: generate_request_id(),
                event_type: ApprovalEventType::LargeMovement,
                status: ApprovalRequestStatus::Pending,
                register_id: register_id.to_string(),
                session_id: Some(session.id.clone()),
                movement_id: Some(movement.id.clone()),
                amount_cents,
                description: format!(
                    "{} of {} on register {} (rule '{}')",
                    movement_type.name,
                    movement.amount(),
                    register.name,
                    rule_name
                ),
                priority: calculate_priority(movement.amount(), 0.0),
                requested_by: recorded_by.to_string(),
                requested_at: now,
                approved_by: None,
                approved_at: None,
                comments: None,
            }),
            _ => None,
        };

        match self
            .db()
            .movements()
            .record(&movement, delta.cents(), enforce_floor, approval_request.as_ref())
            .await
        {
            Ok(()) => {}
            Err(DbError::BalanceFloor { register_id }) => {
                return Err(CoreError::NegativeBalance {
                    register_id,
                    resulting_balance: resulting,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            movement_id = %movement.id,
            session_id = %session.id,
            category = ?movement.category,
            amount_cents = amount_cents,
            needs_approval = approval_request.is_some(),
            "Movement recorded"
        );

        Ok(RecordMovementOutcome {
            movement,
            approval_request,
        })
    }

    /// Amends a movement while its session is still active.
    ///
    /// `None` keeps the stored value. Category is frozen; an amount change
    /// moves the register balance by the signed difference.
    ///
    /// ## Errors
    /// - `NOT_FOUND` - Movement does not exist
    /// - `BUSINESS_LOGIC` - Owning session has closed (ledger is locked)
    pub async fn amend_movement(
        &self,
        movement_id: &str,
        amount_cents: Option<i64>,
        description: Option<String>,
        reference: Option<String>,
    ) -> EngineResult<Movement> {
        debug!(movement_id = %movement_id, "Amending movement");

        let movement = self
            .db()
            .movements()
            .get_by_id(movement_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Movement", movement_id))?;

        let session = self.require_session(&movement.session_id).await?;
        if !session.is_active() {
            return Err(CoreError::MovementLocked {
                movement_id: movement_id.to_string(),
                session_id: session.id,
            }
            .into());
        }

        if let Some(cents) = amount_cents {
            validate_movement_amount(cents).map_err(CoreError::Validation)?;
        }
        if let Some(description) = description.as_deref() {
            validate_notes(description).map_err(CoreError::Validation)?;
        }
        if let Some(reference) = reference.as_deref() {
            validate_reference(reference).map_err(CoreError::Validation)?;
        }

        // Balance moves by the signed difference; transfers stay neutral
        let balance_delta_cents = match amount_cents {
            Some(new_cents) => match movement.category {
                MovementCategory::Income => new_cents - movement.amount_cents,
                MovementCategory::Expense => movement.amount_cents - new_cents,
                MovementCategory::Transfer => 0,
            },
            None => 0,
        };

        self.db()
            .movements()
            .amend(
                movement_id,
                &movement.register_id,
                amount_cents,
                description.as_deref(),
                reference.as_deref(),
                balance_delta_cents,
            )
            .await?;

        info!(
            movement_id = %movement_id,
            balance_delta_cents = balance_delta_cents,
            "Movement amended"
        );

        self.db()
            .movements()
            .get_by_id(movement_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Movement", movement_id))
    }

    /// Lists a session's movements in occurrence order.
    pub async fn list_session_movements(&self, session_id: &str) -> EngineResult<Vec<Movement>> {
        Ok(self.db().movements().list_for_session(session_id).await?)
    }

    /// Lists a register's movements in occurrence order.
    pub async fn list_register_movements(&self, register_id: &str) -> EngineResult<Vec<Movement>> {
        Ok(self.db().movements().list_for_register(register_id).await?)
    }

    /// Lists movements that occurred in `[from, to)`.
    pub async fn list_movements_between(
        &self,
        from: chrono::DateTime<Utc>,
        to: chrono::DateTime<Utc>,
    ) -> EngineResult<Vec<Movement>> {
        Ok(self.db().movements().list_between(from, to).await?)
    }
}

// =============================================================================
// Movement Type Catalog
// =============================================================================

impl Engine {
    /// Lists movement types, optionally including deactivated ones.
    pub async fn list_movement_types(
        &self,
        include_inactive: bool,
    ) -> EngineResult<Vec<MovementType>> {
        Ok(self.db().movement_types().list(include_inactive).await?)
    }

    /// Creates a movement type.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` - Bad code/name, or the code is already taken
    pub async fn create_movement_type(
        &self,
        code: &str,
        name: &str,
        category: MovementCategory,
        description: Option<String>,
    ) -> EngineResult<MovementType> {
        validate_type_code(code).map_err(CoreError::Validation)?;
        validate_rule_name(name).map_err(CoreError::Validation)?;

        let now = Utc::now();
        let movement_type = MovementType {
            id: generate_movement_type_id(),
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            category,
            description,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db().movement_types().insert(&movement_type).await?;

        info!(
            movement_type_id = %movement_type.id,
            code = %movement_type.code,
            "Movement type created"
        );

        Ok(movement_type)
    }

    /// Activates or deactivates a movement type. Deactivated types keep
    /// their history but reject new movements.
    pub async fn set_movement_type_active(&self, id: &str, active: bool) -> EngineResult<()> {
        self.db().movement_types().set_active(id, active).await?;
        info!(movement_type_id = %id, active = active, "Movement type flag updated");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tally_db::DbConfig;

    async fn engine() -> Engine {
        Engine::open(DbConfig::in_memory()).await.unwrap()
    }

    async fn type_id(engine: &Engine, code: &str) -> String {
        engine
            .db()
            .movement_types()
            .get_by_code(code)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    async fn open_fixture(engine: &Engine) -> (String, String) {
        let register_id = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap()
            .id;
        let session_id = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap()
            .id;
        (register_id, session_id)
    }

    #[tokio::test]
    async fn test_record_moves_balance_by_signed_amount() {
        let engine = engine().await;
        let (register_id, session_id) = open_fixture(&engine).await;

        let sale = type_id(&engine, "SALE").await;
        let withdrawal = type_id(&engine, "CASH_WITHDRAWAL").await;

        engine
            .record_movement(&register_id, &sale, 5_000, None, None, "emp-1")
            .await
            .unwrap();
        engine
            .record_movement(&register_id, &withdrawal, 2_000, None, None, "emp-1")
            .await
            .unwrap();

        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, 13_000);

        let ledger = engine.list_session_movements(&session_id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].category, MovementCategory::Income);
        assert_eq!(ledger[1].category, MovementCategory::Expense);
    }

    #[tokio::test]
    async fn test_record_without_session_rejected() {
        let engine = engine().await;
        let register_id = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap()
            .id;
        let sale = type_id(&engine, "SALE").await;

        let err = engine
            .record_movement(&register_id, &sale, 5_000, None, None, "emp-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let engine = engine().await;
        let (register_id, _) = open_fixture(&engine).await;
        let sale = type_id(&engine, "SALE").await;

        let err = engine
            .record_movement(&register_id, &sale, 0, None, None, "emp-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_large_movement_spawns_request() {
        let engine = engine().await;
        let (register_id, _) = open_fixture(&engine).await;
        let sale = type_id(&engine, "SALE").await;

        // $1500 trips the seeded ">$1000" rule
        let outcome = engine
            .record_movement(&register_id, &sale, 150_000, None, None, "emp-1")
            .await
            .unwrap();

        let request = outcome.approval_request.unwrap();
        assert_eq!(request.event_type, ApprovalEventType::LargeMovement);
        assert_eq!(request.movement_id.as_deref(), Some(&*outcome.movement.id));
        assert_eq!(request.priority, tally_core::RequestPriority::Urgent);

        // The movement itself still landed
        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, 160_000);
    }

    #[tokio::test]
    async fn test_small_movement_passes_silently() {
        let engine = engine().await;
        let (register_id, _) = open_fixture(&engine).await;
        let sale = type_id(&engine, "SALE").await;

        let outcome = engine
            .record_movement(&register_id, &sale, 5_000, None, None, "emp-1")
            .await
            .unwrap();
        assert!(outcome.approval_request.is_none());
    }

    #[tokio::test]
    async fn test_overdraw_rejected_and_documented() {
        let engine = engine().await;
        let (register_id, session_id) = open_fixture(&engine).await;
        let withdrawal = type_id(&engine, "CASH_WITHDRAWAL").await;

        // $150 out of a $100 drawer; the seeded negative-balance rule
        // requires approval, so the movement bounces
        let err = engine
            .record_movement(&register_id, &withdrawal, 15_000, None, None, "emp-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);

        // Nothing landed in the ledger, balance untouched
        assert!(engine
            .list_session_movements(&session_id)
            .await
            .unwrap()
            .is_empty());
        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, 10_000);

        // But the attempt left a pending request for the manager
        let queue = engine
            .list_approval_requests(Some(ApprovalRequestStatus::Pending), None)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue[0].event_type,
            ApprovalEventType::NegativeBalance
        );
        assert!(queue[0].movement_id.is_none());
    }

    #[tokio::test]
    async fn test_overdraw_allowed_on_negative_register() {
        let engine = engine().await;
        let register_id = engine
            .create_register("Petty Cash", None, 10_000, true)
            .await
            .unwrap()
            .id;
        engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        let withdrawal = type_id(&engine, "CASH_WITHDRAWAL").await;

        engine
            .record_movement(&register_id, &withdrawal, 15_000, None, None, "emp-1")
            .await
            .unwrap();

        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, -5_000);
    }

    #[tokio::test]
    async fn test_auto_approve_rule_lifts_the_floor() {
        let engine = engine().await;
        let (register_id, _) = open_fixture(&engine).await;
        let withdrawal = type_id(&engine, "CASH_WITHDRAWAL").await;

        // Replace the seeded negative-balance rule with an auto-approver
        for rule in engine.db().rules().list(false).await.unwrap() {
            if rule.event_type == ApprovalEventType::NegativeBalance {
                engine
                    .db()
                    .rules()
                    .set_active(&rule.id, false)
                    .await
                    .unwrap();
            }
        }
        engine
            .create_approval_rule(
                "Trusted overdraw",
                None,
                ApprovalEventType::NegativeBalance,
                vec![tally_core::RuleCondition {
                    field: "balance".to_string(),
                    operator: tally_core::ConditionOperator::GreaterThanOrEqual,
                    value: serde_json::json!(-100),
                }],
                true,
                false,
            )
            .await
            .unwrap();

        // Overdraw by $50: within the rule's -$100 allowance
        engine
            .record_movement(&register_id, &withdrawal, 15_000, None, None, "emp-1")
            .await
            .unwrap();

        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, -5_000);
    }

    #[tokio::test]
    async fn test_amend_while_open() {
        let engine = engine().await;
        let (register_id, _) = open_fixture(&engine).await;
        let sale = type_id(&engine, "SALE").await;

        let outcome = engine
            .record_movement(&register_id, &sale, 5_000, None, None, "emp-1")
            .await
            .unwrap();

        let amended = engine
            .amend_movement(
                &outcome.movement.id,
                Some(4_500),
                Some("corrected sale".into()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(amended.amount_cents, 4_500);
        assert!(amended.amended_at.is_some());

        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, 14_500);
    }

    #[tokio::test]
    async fn test_amend_after_close_locked() {
        let engine = engine().await;
        let (register_id, session_id) = open_fixture(&engine).await;
        let sale = type_id(&engine, "SALE").await;

        let outcome = engine
            .record_movement(&register_id, &sale, 5_000, None, None, "emp-1")
            .await
            .unwrap();
        engine
            .close_session(&session_id, "emp-1", 15_000, None)
            .await
            .unwrap();

        let err = engine
            .amend_movement(&outcome.movement.id, Some(4_500), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_inactive_type_rejected() {
        let engine = engine().await;
        let (register_id, _) = open_fixture(&engine).await;
        let sale = type_id(&engine, "SALE").await;

        engine.set_movement_type_active(&sale, false).await.unwrap();

        let err = engine
            .record_movement(&register_id, &sale, 5_000, None, None, "emp-1")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_create_movement_type() {
        let engine = engine().await;

        let created = engine
            .create_movement_type(
                "FLOAT_TOPUP",
                "Float Top-up",
                MovementCategory::Income,
                None,
            )
            .await
            .unwrap();
        assert!(created.is_active);

        // Duplicate code is a validation error for the caller
        let err = engine
            .create_movement_type("FLOAT_TOPUP", "Another", MovementCategory::Income, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
