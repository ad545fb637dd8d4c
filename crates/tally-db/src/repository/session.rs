//! # Session Repository
//!
//! Database operations for register sessions.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── insert_open() → one transaction:                               │
//! │         ├── RegisterSession { status: Open } inserted                  │
//! │         │   (partial unique index rejects a second active session)     │
//! │         └── register balance set to the opening count                  │
//! │                                                                         │
//! │  2. WORK                                                               │
//! │     └── movements append against the session (movement repo)           │
//! │     └── suspend() / resume() toggle Open ↔ Suspended                   │
//! │                                                                         │
//! │  3. CLOSE                                                              │
//! │     └── close() → one transaction:                                     │
//! │         ├── status flip, balances, discrepancy stamped on session      │
//! │         ├── register balance set to the counted amount                 │
//! │         ├── approval requests inserted (if rules fired)                │
//! │         └── discrepancy report inserted (if counted ≠ expected)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status flips are conditional UPDATEs guarded by the current status, with
//! a rows_affected check. The engine pre-reads the session to produce precise
//! errors; the guards here are the backstop against concurrent transitions.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::approval::insert_request_tx;
use crate::repository::discrepancy::insert_report_tx;
use crate::repository::register::set_balance_tx;
use tally_core::{ApprovalRequest, DiscrepancyReport, RegisterSession};

/// All columns of register_sessions, in entity order.
const SESSION_COLUMNS: &str = r#"
    id, register_id, employee_id, closed_by,
    opening_balance_cents, closing_balance_cents,
    expected_balance_cents, discrepancy_cents,
    status, notes, opened_at, closed_at,
    created_at, updated_at
"#;

/// Repository for register session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a newly opened session and stamps the register balance with
    /// the opening count, in one transaction.
    ///
    /// The session row and the register balance move together: either both
    /// land or neither does.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - Register already has an active
    ///   session (rejected by the partial unique index)
    pub async fn insert_open(&self, session: &RegisterSession) -> DbResult<()> {
        debug!(
            id = %session.id,
            register_id = %session.register_id,
            "Opening session"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO register_sessions (
                id, register_id, employee_id, closed_by,
                opening_balance_cents, closing_balance_cents,
                expected_balance_cents, discrepancy_cents,
                status, notes, opened_at, closed_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&session.id)
        .bind(&session.register_id)
        .bind(&session.employee_id)
        .bind(&session.closed_by)
        .bind(session.opening_balance_cents)
        .bind(session.closing_balance_cents)
        .bind(session.expected_balance_cents)
        .bind(session.discrepancy_cents)
        .bind(session.status)
        .bind(&session.notes)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        // The counted opening float becomes the register's new baseline
        set_balance_tx(&mut tx, &session.register_id, session.opening_balance_cents).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Gets a session by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RegisterSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM register_sessions WHERE id = ?1"
        );

        let session = sqlx::query_as::<_, RegisterSession>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Gets the active (open or suspended) session for a register, if any.
    pub async fn get_active_for_register(
        &self,
        register_id: &str,
    ) -> DbResult<Option<RegisterSession>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM register_sessions
            WHERE register_id = ?1 AND status IN ('open', 'suspended')
            "#
        );

        let session = sqlx::query_as::<_, RegisterSession>(&sql)
            .bind(register_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// Lists all sessions for a register, newest first.
    pub async fn list_for_register(&self, register_id: &str) -> DbResult<Vec<RegisterSession>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM register_sessions
            WHERE register_id = ?1
            ORDER BY opened_at DESC
            "#
        );

        let sessions = sqlx::query_as::<_, RegisterSession>(&sql)
            .bind(register_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Lists every session, newest first.
    ///
    /// ## Usage
    /// Reporting input. Single-branch deployments hold a bounded number of
    /// sessions, so a full scan is acceptable here.
    pub async fn list_all(&self) -> DbResult<Vec<RegisterSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM register_sessions ORDER BY opened_at DESC"
        );

        let sessions = sqlx::query_as::<_, RegisterSession>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Suspends an open session.
    pub async fn suspend(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Suspending session");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE register_sessions SET
                status = 'suspended',
                updated_at = ?2
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session (open)", id));
        }

        Ok(())
    }

    /// Resumes a suspended session.
    pub async fn resume(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Resuming session");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE register_sessions SET
                status = 'open',
                updated_at = ?2
            WHERE id = ?1 AND status = 'suspended'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session (suspended)", id));
        }

        Ok(())
    }

    /// Closes a session and applies every close-time side effect atomically.
    ///
    /// ## What Happens In One Transaction
    /// 1. Session row flips to closed with balances and discrepancy stamped
    ///    (guarded by `status IN ('open', 'suspended')`)
    /// 2. Register balance is set to the counted closing amount
    /// 3. Approval requests spawned by close-time rules are inserted
    /// 4. The discrepancy report (if counted ≠ expected) is inserted
    ///
    /// Requests go in before the report: the report may carry an
    /// `approval_request_id` foreign key onto one of them.
    ///
    /// The engine computes expected balance, discrepancy and rule outcomes
    /// before calling; this method only persists them.
    #[allow(clippy::too_many_arguments)]
    pub async fn close(
        &self,
        session_id: &str,
        register_id: &str,
        closed_by: &str,
        closing_balance_cents: i64,
        expected_balance_cents: i64,
        discrepancy_cents: i64,
        notes: Option<&str>,
        requests: &[ApprovalRequest],
        report: Option<&DiscrepancyReport>,
    ) -> DbResult<()> {
        debug!(
            id = %session_id,
            closing_balance_cents = %closing_balance_cents,
            discrepancy_cents = %discrepancy_cents,
            "Closing session"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE register_sessions SET
                status = 'closed',
                closed_by = ?2,
                closing_balance_cents = ?3,
                expected_balance_cents = ?4,
                discrepancy_cents = ?5,
                notes = COALESCE(?6, notes),
                closed_at = ?7,
                updated_at = ?7
            WHERE id = ?1 AND status IN ('open', 'suspended')
            "#,
        )
        .bind(session_id)
        .bind(closed_by)
        .bind(closing_balance_cents)
        .bind(expected_balance_cents)
        .bind(discrepancy_cents)
        .bind(notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Session (active)", session_id));
        }

        // The counted drawer amount becomes the register's new truth
        set_balance_tx(&mut tx, register_id, closing_balance_cents).await?;

        for request in requests {
            insert_request_tx(&mut tx, request).await?;
        }

        if let Some(report) = report {
            insert_report_tx(&mut tx, report).await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

/// Generates a new session ID.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
