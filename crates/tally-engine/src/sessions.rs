//! # Session Lifecycle Operations
//!
//! Open, suspend, resume, and close register sessions.
//!
//! ## Close Is Where Everything Meets
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  close_session(session_id, closed_by, counted_cents, notes)             │
//! │                                                                         │
//! │  1. Load session, must be open or suspended                            │
//! │  2. Re-sum the ledger: expected = opening + Σ income − Σ expense       │
//! │  3. detect(expected, counted) → DiscrepancyFinding?                    │
//! │  4. Run the rule passes:                                               │
//! │     session_close     → every close                                    │
//! │     discrepancy       → only when counted ≠ expected                   │
//! │     negative_balance  → only when expected < 0 on a guarded register   │
//! │  5. Persist in ONE transaction:                                        │
//! │     session closed + balances stamped                                  │
//! │     register balance := counted                                        │
//! │     spawned approval requests                                          │
//! │     discrepancy report (linked to its request, if one was spawned)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The expected balance is always recomputed from the movement rows at
//! close time, never read from a cached column.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use tally_core::discrepancy::detect;
use tally_core::ledger::expected_balance;
use tally_core::money::Money;
use tally_core::rules::{balance_fact, calculate_priority, discrepancy_fact, session_close_fact};
use tally_core::validation::{validate_counted_balance, validate_notes, validate_opening_balance};
use tally_core::{
    ApprovalEventType, ApprovalRequest, ApprovalRequestStatus, CoreError, DiscrepancyReport,
    DiscrepancyStatus, RegisterSession, RequestPriority, SessionStatus,
};
use tally_db::repository::approval::generate_request_id;
use tally_db::repository::discrepancy::generate_report_id;
use tally_db::repository::session::generate_session_id;
use tally_db::DbError;

use crate::engine::{Engine, EventOutcome};
use crate::error::{EngineError, EngineResult, ErrorCode};

// =============================================================================
// Outcome DTO
// =============================================================================

/// Everything a close produced, returned to the caller in one piece.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSessionOutcome {
    /// The closed session with balances and discrepancy stamped.
    pub session: RegisterSession,
    /// The discrepancy report, when counted ≠ expected.
    pub report: Option<DiscrepancyReport>,
    /// Approval requests spawned by close-time rules.
    pub requests: Vec<ApprovalRequest>,
}

// =============================================================================
// Operations
// =============================================================================

impl Engine {
    /// Opens a session on a register.
    ///
    /// ## Errors
    /// - `NOT_FOUND` - Register does not exist
    /// - `BUSINESS_LOGIC` - Register is inactive
    /// - `SESSION_CONFLICT` - Register already has an active session
    /// - `VALIDATION_ERROR` - Negative opening balance or oversized notes
    pub async fn open_session(
        &self,
        register_id: &str,
        employee_id: &str,
        opening_balance_cents: i64,
        notes: Option<String>,
    ) -> EngineResult<RegisterSession> {
        debug!(register_id = %register_id, employee_id = %employee_id, "Opening session");

        validate_opening_balance(opening_balance_cents).map_err(CoreError::Validation)?;
        if let Some(notes) = notes.as_deref() {
            validate_notes(notes).map_err(CoreError::Validation)?;
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

        // The counted float is the new baseline. If it disagrees with the
        // stored balance someone added or removed cash between sessions;
        // worth a log line, not a rejection.
        if opening_balance_cents != register.current_balance_cents {
            warn!(
                register_id = %register_id,
                stored_cents = register.current_balance_cents,
                opening_cents = opening_balance_cents,
                "Opening balance differs from stored register balance; accepting count as baseline"
            );
        }

        if let Some(active) = self
            .db()
            .sessions()
            .get_active_for_register(register_id)
            .await?
        {
            return Err(CoreError::SessionAlreadyOpen {
                register_id: register_id.to_string(),
                session_id: active.id,
            }
            .into());
        }

        let now = Utc::now();
        let session = RegisterSession {
            id: generate_session_id(),
            register_id: register_id.to_string(),
            employee_id: employee_id.to_string(),
            closed_by: None,
            opening_balance_cents,
            closing_balance_cents: None,
            expected_balance_cents: None,
            discrepancy_cents: None,
            status: SessionStatus::Open,
            notes,
            opened_at: now,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        // insert_open stamps the register balance with the opening count in
        // the same transaction. The partial unique index is the backstop
        // against a concurrent open that slipped past the pre-check above.
        match self.db().sessions().insert_open(&session).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(EngineError::new(
                    ErrorCode::SessionConflict,
                    format!("Register {} already has an active session", register_id),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            session_id = %session.id,
            register_id = %register_id,
            opening_cents = opening_balance_cents,
            "Session opened"
        );

        Ok(session)
    }

    /// Suspends an open session. Movements remain recordable; the session
    /// still owns its register.
    pub async fn suspend_session(&self, session_id: &str) -> EngineResult<RegisterSession> {
        let session = self.require_session(session_id).await?;
        if session.status != SessionStatus::Open {
            return Err(CoreError::InvalidSessionStatus {
                session_id: session_id.to_string(),
                current_status: format!("{:?}", session.status).to_lowercase(),
            }
            .into());
        }

        self.db().sessions().suspend(session_id).await?;
        info!(session_id = %session_id, "Session suspended");

        self.require_session(session_id).await
    }

    /// Resumes a suspended session.
    pub async fn resume_session(&self, session_id: &str) -> EngineResult<RegisterSession> {
        let session = self.require_session(session_id).await?;
        if session.status != SessionStatus::Suspended {
            return Err(CoreError::InvalidSessionStatus {
                session_id: session_id.to_string(),
                current_status: format!("{:?}", session.status).to_lowercase(),
            }
            .into());
        }

        self.db().sessions().resume(session_id).await?;
        info!(session_id = %session_id, "Session resumed");

        self.require_session(session_id).await
    }

    /// Closes a session against a physical cash count.
    ///
    /// ## Errors
    /// - `NOT_FOUND` - Session does not exist
    /// - `BUSINESS_LOGIC` - Session is already closed
    /// - `VALIDATION_ERROR` - Negative counted balance or oversized notes
    pub async fn close_session(
        &self,
        session_id: &str,
        closed_by: &str,
        closing_balance_cents: i64,
        notes: Option<String>,
    ) -> EngineResult<CloseSessionOutcome> {
        debug!(
            session_id = %session_id,
            counted_cents = closing_balance_cents,
            "Closing session"
        );

        validate_counted_balance(closing_balance_cents).map_err(CoreError::Validation)?;
        if let Some(notes) = notes.as_deref() {
            validate_notes(notes).map_err(CoreError::Validation)?;
        }

        let session = self.require_session(session_id).await?;
        if !session.is_active() {
            return Err(CoreError::InvalidSessionStatus {
                session_id: session_id.to_string(),
                current_status: format!("{:?}", session.status).to_lowercase(),
            }
            .into());
        }

        let register = self
            .db()
            .registers()
            .get_by_id(&session.register_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Register", &session.register_id))?;

        let movements = self.db().movements().list_for_session(session_id).await?;

        let opening = session.opening_balance();
        let counted = Money::from_cents(closing_balance_cents);
        let expected = expected_balance(opening, &movements);
        let finding = detect(expected, counted);

        let now = Utc::now();
        let mut requests: Vec<ApprovalRequest> = Vec::new();
        let mut report: Option<DiscrepancyReport> = None;

        // Pass 1: session_close rules see every close
        let close_fact = session_close_fact(opening, counted, expected, movements.len());
        if let EventOutcome::NeedsApproval { rule_name } = self
            .evaluate_event(ApprovalEventType::SessionClose, &close_fact)
            .await?
        {
            requests.push(ApprovalRequest {
                id: generate_request_id(),
                event_type: ApprovalEventType::SessionClose,
                status: ApprovalRequestStatus::Pending,
                register_id: session.register_id.clone(),
                session_id: Some(session.id.clone()),
                movement_id: None,
                amount_cents: closing_balance_cents,
                description: format!("Session close review required by rule '{}'", rule_name),
                priority: RequestPriority::Low,
                requested_by: closed_by.to_string(),
                requested_at: now,
                approved_by: None,
                approved_at: None,
                comments: None,
            });
        }

        // Pass 2: discrepancy rules, only when the drawer is off
        if let Some(finding) = finding {
            let fact = discrepancy_fact(&finding);
            let outcome = self
                .evaluate_event(ApprovalEventType::Discrepancy, &fact)
                .await?;

            let magnitude = match finding.percentage {
                Some(pct) => pct.abs(),
                None => f64::MAX,
            };

            let mut new_report = DiscrepancyReport {
                id: generate_report_id(),
                session_id: session.id.clone(),
                register_id: session.register_id.clone(),
                expected_cents: finding.expected.cents(),
                actual_cents: finding.actual.cents(),
                discrepancy_cents: finding.discrepancy.cents(),
                percentage: finding.percentage,
                severity: finding.severity,
                status: DiscrepancyStatus::Pending,
                reported_by: closed_by.to_string(),
                reported_at: now,
                resolution: None,
                resolved_by: None,
                resolved_at: None,
                approval_request_id: None,
            };

            match outcome {
                EventOutcome::NeedsApproval { rule_name } => {
                    let request = ApprovalRequest {
                        id: generate_request_id(),
                        event_type: ApprovalEventType::Discrepancy,
                        status: ApprovalRequestStatus::Pending,
                        register_id: session.register_id.clone(),
                        session_id: Some(session.id.clone()),
                        movement_id: None,
                        amount_cents: finding.discrepancy.abs().cents(),
                        description: format!(
                            "Discrepancy of {} on session close (rule '{}')",
                            finding.discrepancy, rule_name
                        ),
                        priority: calculate_priority(finding.discrepancy, magnitude),
                        requested_by: closed_by.to_string(),
                        requested_at: now,
                        approved_by: None,
                        approved_at: None,
                        comments: None,
                    };
                    new_report.approval_request_id = Some(request.id.clone());
                    requests.push(request);
                }
                EventOutcome::AutoApproved { rule_name } => {
                    debug!(
                        session_id = %session_id,
                        rule = %rule_name,
                        "Discrepancy auto-approved by rule"
                    );
                    new_report.status = DiscrepancyStatus::Approved;
                }
                EventOutcome::Pass => {}
            }

            report = Some(new_report);
        }

        // Pass 3: a ledger that expects less cash than zero on a guarded
        // register means expenses outran income during the shift
        if expected.is_negative() && !register.allow_negative_balance {
            let fact = balance_fact(expected, Money::zero());
            if let EventOutcome::NeedsApproval { rule_name } = self
                .evaluate_event(ApprovalEventType::NegativeBalance, &fact)
                .await?
            {
                requests.push(ApprovalRequest {
                    id: generate_request_id(),
                    event_type: ApprovalEventType::NegativeBalance,
                    status: ApprovalRequestStatus::Pending,
                    register_id: session.register_id.clone(),
                    session_id: Some(session.id.clone()),
                    movement_id: None,
                    amount_cents: expected.abs().cents(),
                    description: format!(
                        "Expected balance {} at close on register {} (rule '{}')",
                        expected, register.name, rule_name
                    ),
                    priority: calculate_priority(expected, 0.0),
                    requested_by: closed_by.to_string(),
                    requested_at: now,
                    approved_by: None,
                    approved_at: None,
                    comments: None,
                });
            }
        }

        let discrepancy_cents = counted.cents() - expected.cents();
        self.db()
            .sessions()
            .close(
                session_id,
                &session.register_id,
                closed_by,
                closing_balance_cents,
                expected.cents(),
                discrepancy_cents,
                notes.as_deref(),
                &requests,
                report.as_ref(),
            )
            .await?;

        let session = self.require_session(session_id).await?;

        info!(
            session_id = %session_id,
            expected_cents = expected.cents(),
            counted_cents = closing_balance_cents,
            discrepancy_cents = discrepancy_cents,
            requests = requests.len(),
            "Session closed"
        );

        Ok(CloseSessionOutcome {
            session,
            report,
            requests,
        })
    }

    /// Gets a session by ID.
    pub async fn get_session(&self, session_id: &str) -> EngineResult<RegisterSession> {
        self.require_session(session_id).await
    }

    /// Gets the active (open or suspended) session of a register, if any.
    pub async fn get_active_session(
        &self,
        register_id: &str,
    ) -> EngineResult<Option<RegisterSession>> {
        Ok(self
            .db()
            .sessions()
            .get_active_for_register(register_id)
            .await?)
    }

    /// Lists sessions, optionally scoped to a register, newest first.
    pub async fn list_sessions(
        &self,
        register_id: Option<&str>,
    ) -> EngineResult<Vec<RegisterSession>> {
        let sessions = match register_id {
            Some(register_id) => self.db().sessions().list_for_register(register_id).await?,
            None => self.db().sessions().list_all().await?,
        };
        Ok(sessions)
    }

    pub(crate) async fn require_session(&self, session_id: &str) -> EngineResult<RegisterSession> {
        self.db()
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Session", session_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::DiscrepancySeverity;
    use tally_db::DbConfig;

    async fn engine() -> Engine {
        Engine::open(DbConfig::in_memory()).await.unwrap()
    }

    async fn register(engine: &Engine) -> String {
        engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap()
            .id
    }

    async fn record(engine: &Engine, register_id: &str, code: &str, cents: i64) {
        let movement_type = engine
            .db()
            .movement_types()
            .get_by_code(code)
            .await
            .unwrap()
            .unwrap();
        engine
            .record_movement(register_id, &movement_type.id, cents, None, None, "emp-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_open_then_conflict() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Open);

        let err = engine
            .open_session(&register_id, "emp-2", 10_000, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionConflict);
    }

    #[tokio::test]
    async fn test_suspended_session_still_conflicts() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        engine.suspend_session(&session.id).await.unwrap();

        let err = engine
            .open_session(&register_id, "emp-2", 10_000, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionConflict);

        let resumed = engine.resume_session(&session.id).await.unwrap();
        assert_eq!(resumed.status, SessionStatus::Open);
    }

    #[tokio::test]
    async fn test_suspend_requires_open() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        engine.suspend_session(&session.id).await.unwrap();

        let err = engine.suspend_session(&session.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let err = engine.resume_session("no-such-session").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_clean_close_produces_no_report() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        record(&engine, &register_id, "SALE", 5_000).await;
        record(&engine, &register_id, "CASH_WITHDRAWAL", 2_000).await;

        // Expected $130, counted $130
        let outcome = engine
            .close_session(&session.id, "emp-1", 13_000, Some("shift end".into()))
            .await
            .unwrap();

        assert_eq!(outcome.session.status, SessionStatus::Closed);
        assert_eq!(outcome.session.expected_balance_cents, Some(13_000));
        assert_eq!(outcome.session.discrepancy_cents, Some(0));
        assert!(outcome.report.is_none());
        assert!(outcome.requests.is_empty());

        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, 13_000);
    }

    #[tokio::test]
    async fn test_small_shortfall_reports_without_request() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        record(&engine, &register_id, "SALE", 5_000).await;
        record(&engine, &register_id, "CASH_WITHDRAWAL", 2_000).await;

        // Expected $130, counted $125: -$5.00 / -3.85%, below the 5% rule
        let outcome = engine
            .close_session(&session.id, "emp-1", 12_500, None)
            .await
            .unwrap();

        let report = outcome.report.unwrap();
        assert_eq!(report.discrepancy_cents, -500);
        assert_eq!(report.severity, DiscrepancySeverity::Medium);
        assert_eq!(report.status, DiscrepancyStatus::Pending);
        assert!(report.approval_request_id.is_none());
        assert!(outcome.requests.is_empty());

        assert_eq!(outcome.session.discrepancy_cents, Some(-500));
    }

    #[tokio::test]
    async fn test_large_shortfall_spawns_linked_request() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();

        // Expected $100, counted $85: -15%, critical, over the 5% rule
        let outcome = engine
            .close_session(&session.id, "emp-1", 8_500, None)
            .await
            .unwrap();

        let report = outcome.report.unwrap();
        assert_eq!(report.severity, DiscrepancySeverity::Critical);

        assert_eq!(outcome.requests.len(), 1);
        let request = &outcome.requests[0];
        assert_eq!(request.event_type, ApprovalEventType::Discrepancy);
        assert_eq!(request.priority, RequestPriority::Urgent);
        assert_eq!(request.amount_cents, 1_500);
        assert_eq!(report.approval_request_id.as_deref(), Some(&*request.id));

        // Both persisted
        let stored = engine
            .db()
            .discrepancies()
            .get_by_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, report.id);
        let queue = engine
            .list_approval_requests(Some(ApprovalRequestStatus::Pending), None)
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_expected_close_is_critical() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 0, None)
            .await
            .unwrap();

        // Cash in a drawer that should be empty
        let outcome = engine
            .close_session(&session.id, "emp-1", 5_000, None)
            .await
            .unwrap();

        let report = outcome.report.unwrap();
        assert!(report.percentage.is_none());
        assert_eq!(report.severity, DiscrepancySeverity::Critical);
        assert_eq!(outcome.requests[0].priority, RequestPriority::Urgent);
    }

    #[tokio::test]
    async fn test_close_twice_rejected() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();
        engine
            .close_session(&session.id, "emp-1", 10_000, None)
            .await
            .unwrap();

        let err = engine
            .close_session(&session.id, "emp-1", 10_000, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_negative_counted_balance_rejected() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        let session = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap();

        let err = engine
            .close_session(&session.id, "emp-1", -100, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_open_on_inactive_register_rejected() {
        let engine = engine().await;
        let register_id = register(&engine).await;
        engine.deactivate_register(&register_id).await.unwrap();

        let err = engine
            .open_session(&register_id, "emp-1", 10_000, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_opening_divergence_becomes_baseline() {
        let engine = engine().await;
        let register_id = register(&engine).await;

        // Register stores $100, cashier counts $95 into the drawer
        let session = engine
            .open_session(&register_id, "emp-1", 9_500, None)
            .await
            .unwrap();
        assert_eq!(session.opening_balance_cents, 9_500);

        let register = engine.get_register(&register_id).await.unwrap();
        assert_eq!(register.current_balance_cents, 9_500);
    }
}
