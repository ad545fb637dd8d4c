//! # Discrepancy Report Repository
//!
//! Database operations for discrepancy reports.
//!
//! Reports are born inside the session-close transaction (see
//! `SessionRepository::close`) whenever the counted drawer differs from the
//! ledger-expected balance. This repository covers their afterlife:
//! investigation, resolution, and the status flip driven by an approved
//! manager request.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{DiscrepancyReport, DiscrepancyStatus};

/// All columns of discrepancy_reports, in entity order.
const REPORT_COLUMNS: &str = r#"
    id, session_id, register_id,
    expected_cents, actual_cents, discrepancy_cents,
    percentage, severity, status,
    reported_by, reported_at,
    resolution, resolved_by, resolved_at,
    approval_request_id
"#;

/// Repository for discrepancy report database operations.
#[derive(Debug, Clone)]
pub struct DiscrepancyRepository {
    pool: SqlitePool,
}

impl DiscrepancyRepository {
    /// Creates a new DiscrepancyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscrepancyRepository { pool }
    }

    /// Inserts a new report.
    pub async fn insert(&self, report: &DiscrepancyReport) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_report_tx(&mut conn, report).await
    }

    /// Gets a report by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiscrepancyReport>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM discrepancy_reports WHERE id = ?1");

        let report = sqlx::query_as::<_, DiscrepancyReport>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(report)
    }

    /// Gets the report spawned by a session's close, if any.
    ///
    /// A session closes once, so it has at most one report.
    pub async fn get_by_session(&self, session_id: &str) -> DbResult<Option<DiscrepancyReport>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM discrepancy_reports WHERE session_id = ?1"
        );

        let report = sqlx::query_as::<_, DiscrepancyReport>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(report)
    }

    /// Lists reports, newest first.
    ///
    /// ## Arguments
    /// * `status` - Optional status filter (e.g., only pending)
    pub async fn list(
        &self,
        status: Option<DiscrepancyStatus>,
    ) -> DbResult<Vec<DiscrepancyReport>> {
        let reports = match status {
            Some(status) => {
                let sql = format!(
                    r#"
                    SELECT {REPORT_COLUMNS}
                    FROM discrepancy_reports
                    WHERE status = ?1
                    ORDER BY reported_at DESC
                    "#
                );
                sqlx::query_as::<_, DiscrepancyReport>(&sql)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {REPORT_COLUMNS} FROM discrepancy_reports ORDER BY reported_at DESC"
                );
                sqlx::query_as::<_, DiscrepancyReport>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(reports)
    }

    /// Moves a report into investigation.
    ///
    /// Allowed from pending or approved; a resolved report stays resolved.
    pub async fn mark_investigating(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Marking report under investigation");

        let result = sqlx::query(
            r#"
            UPDATE discrepancy_reports SET
                status = 'investigating'
            WHERE id = ?1 AND status IN ('pending', 'approved')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discrepancy report (unresolved)", id));
        }

        Ok(())
    }

    /// Resolves a report with an explanation.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Report missing or already resolved
    pub async fn resolve(
        &self,
        id: &str,
        resolution: &str,
        resolved_by: &str,
        resolved_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, resolved_by = %resolved_by, "Resolving discrepancy report");

        let result = sqlx::query(
            r#"
            UPDATE discrepancy_reports SET
                status = 'resolved',
                resolution = ?2,
                resolved_by = ?3,
                resolved_at = ?4
            WHERE id = ?1 AND status != 'resolved'
            "#,
        )
        .bind(id)
        .bind(resolution)
        .bind(resolved_by)
        .bind(resolved_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discrepancy report (unresolved)", id));
        }

        Ok(())
    }
}

/// Inserts a report on an open connection.
///
/// Shared with the session-close transaction, which inserts the report
/// after the requests it may reference.
pub(crate) async fn insert_report_tx(
    conn: &mut SqliteConnection,
    report: &DiscrepancyReport,
) -> DbResult<()> {
    debug!(
        id = %report.id,
        session_id = %report.session_id,
        discrepancy_cents = %report.discrepancy_cents,
        severity = ?report.severity,
        "Inserting discrepancy report"
    );

    sqlx::query(
        r#"
        INSERT INTO discrepancy_reports (
            id, session_id, register_id,
            expected_cents, actual_cents, discrepancy_cents,
            percentage, severity, status,
            reported_by, reported_at,
            resolution, resolved_by, resolved_at,
            approval_request_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&report.id)
    .bind(&report.session_id)
    .bind(&report.register_id)
    .bind(report.expected_cents)
    .bind(report.actual_cents)
    .bind(report.discrepancy_cents)
    .bind(report.percentage)
    .bind(report.severity)
    .bind(report.status)
    .bind(&report.reported_by)
    .bind(report.reported_at)
    .bind(&report.resolution)
    .bind(&report.resolved_by)
    .bind(report.resolved_at)
    .bind(&report.approval_request_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Generates a new report ID.
pub fn generate_report_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::approval::generate_request_id;
    use crate::repository::register::generate_register_id;
    use crate::repository::session::generate_session_id;
    use tally_core::{
        ApprovalEventType, ApprovalRequest, ApprovalRequestStatus, CashRegister,
        DiscrepancySeverity, RegisterSession, RequestPriority, SessionStatus, DEFAULT_BRANCH_ID,
    };

    struct Fixture {
        register: CashRegister,
        session: RegisterSession,
    }

    async fn fixture(db: &Database) -> Fixture {
        let now = Utc::now();
        let register = CashRegister {
            id: generate_register_id(),
            branch_id: DEFAULT_BRANCH_ID.to_string(),
            name: "R1".to_string(),
            location: None,
            initial_balance_cents: 10_000,
            current_balance_cents: 10_000,
            allow_negative_balance: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.registers().insert(&register).await.unwrap();

        let session = RegisterSession {
            id: generate_session_id(),
            register_id: register.id.clone(),
            employee_id: "emp-1".to_string(),
            closed_by: None,
            opening_balance_cents: 10_000,
            closing_balance_cents: None,
            expected_balance_cents: None,
            discrepancy_cents: None,
            status: SessionStatus::Open,
            notes: None,
            opened_at: now,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };
        db.sessions().insert_open(&session).await.unwrap();

        Fixture { register, session }
    }

    fn shortfall_report(fx: &Fixture, request_id: Option<&str>) -> DiscrepancyReport {
        DiscrepancyReport {
            id: generate_report_id(),
            session_id: fx.session.id.clone(),
            register_id: fx.register.id.clone(),
            expected_cents: 13_000,
            actual_cents: 12_500,
            discrepancy_cents: -500,
            percentage: Some(-500.0 / 13_000.0 * 100.0),
            severity: DiscrepancySeverity::Medium,
            status: DiscrepancyStatus::Pending,
            reported_by: "emp-1".to_string(),
            reported_at: Utc::now(),
            resolution: None,
            resolved_by: None,
            resolved_at: None,
            approval_request_id: request_id.map(|id| id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_by_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fx = fixture(&db).await;
        let repo = db.discrepancies();

        let report = shortfall_report(&fx, None);
        repo.insert(&report).await.unwrap();

        let found = repo.get_by_session(&fx.session.id).await.unwrap().unwrap();
        assert_eq!(found.discrepancy_cents, -500);
        assert_eq!(found.severity, DiscrepancySeverity::Medium);
        assert_eq!(found.status, DiscrepancyStatus::Pending);
    }

    #[tokio::test]
    async fn test_resolve_is_terminal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fx = fixture(&db).await;
        let repo = db.discrepancies();

        let report = shortfall_report(&fx, None);
        repo.insert(&report).await.unwrap();

        repo.mark_investigating(&report.id).await.unwrap();
        repo.resolve(&report.id, "Countback error, re-counted", "mgr-1", Utc::now())
            .await
            .unwrap();

        let resolved = repo.get_by_id(&report.id).await.unwrap().unwrap();
        assert_eq!(resolved.status, DiscrepancyStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        let err = repo
            .resolve(&report.id, "again", "mgr-2", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo.mark_investigating(&report.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_approving_linked_request_flips_report() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fx = fixture(&db).await;

        let request = ApprovalRequest {
            id: generate_request_id(),
            event_type: ApprovalEventType::Discrepancy,
            status: ApprovalRequestStatus::Pending,
            register_id: fx.register.id.clone(),
            session_id: Some(fx.session.id.clone()),
            movement_id: None,
            amount_cents: -500,
            description: "Discrepancy of -$5.00".to_string(),
            priority: RequestPriority::Medium,
            requested_by: "emp-1".to_string(),
            requested_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            comments: None,
        };
        db.approvals().insert(&request).await.unwrap();

        let report = shortfall_report(&fx, Some(&request.id));
        db.discrepancies().insert(&report).await.unwrap();

        db.approvals()
            .decide(&request.id, true, "mgr-1", None, Utc::now())
            .await
            .unwrap();

        let flipped = db
            .discrepancies()
            .get_by_id(&report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flipped.status, DiscrepancyStatus::Approved);
    }

    #[tokio::test]
    async fn test_rejecting_linked_request_leaves_report_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let fx = fixture(&db).await;

        let request = ApprovalRequest {
            id: generate_request_id(),
            event_type: ApprovalEventType::Discrepancy,
            status: ApprovalRequestStatus::Pending,
            register_id: fx.register.id.clone(),
            session_id: Some(fx.session.id.clone()),
            movement_id: None,
            amount_cents: -500,
            description: "Discrepancy of -$5.00".to_string(),
            priority: RequestPriority::Medium,
            requested_by: "emp-1".to_string(),
            requested_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            comments: None,
        };
        db.approvals().insert(&request).await.unwrap();

        let report = shortfall_report(&fx, Some(&request.id));
        db.discrepancies().insert(&report).await.unwrap();

        db.approvals()
            .decide(&request.id, false, "mgr-1", Some("recount first"), Utc::now())
            .await
            .unwrap();

        let untouched = db
            .discrepancies()
            .get_by_id(&report.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, DiscrepancyStatus::Pending);
    }
}
