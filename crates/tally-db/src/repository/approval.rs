//! # Approval Request Repository
//!
//! Database operations for the approval request queue.
//!
//! ## Queue Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              How Managers See the Pending Queue                         │
//! │                                                                         │
//! │  urgent   │ 09:12  Discrepancy −$15.00 on Register 2                   │
//! │  high     │ 08:40  Large movement $1,250.00                            │
//! │  medium   │ 09:55  Discrepancy −$4.10 on Register 1                    │
//! │  low      │ 07:02  Session close review                                │
//! │                                                                         │
//! │  Priority bands first, oldest request first within a band.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decisions are terminal. The `decide` UPDATE is guarded by
//! `status = 'pending'`, so a second approve/reject cannot overwrite the
//! first decision's audit fields.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{ApprovalRequest, ApprovalRequestStatus, RequestPriority};

/// All columns of approval_requests, in entity order.
const REQUEST_COLUMNS: &str = r#"
    id, event_type, status, register_id, session_id, movement_id,
    amount_cents, description, priority, requested_by, requested_at,
    approved_by, approved_at, comments
"#;

/// Repository for approval request database operations.
#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    pool: SqlitePool,
}

impl ApprovalRepository {
    /// Creates a new ApprovalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ApprovalRepository { pool }
    }

    /// Inserts a new request.
    pub async fn insert(&self, request: &ApprovalRequest) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_request_tx(&mut conn, request).await
    }

    /// Gets a request by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ApprovalRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM approval_requests WHERE id = ?1");

        let request = sqlx::query_as::<_, ApprovalRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    /// Lists requests in manager triage order.
    ///
    /// Priority bands first (urgent → low), oldest first within a band.
    ///
    /// ## Arguments
    /// * `status` - Optional status filter (e.g., only pending)
    /// * `priority` - Optional priority filter
    pub async fn list(
        &self,
        status: Option<ApprovalRequestStatus>,
        priority: Option<RequestPriority>,
    ) -> DbResult<Vec<ApprovalRequest>> {
        let mut sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_requests WHERE 1 = 1"
        );
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if priority.is_some() {
            sql.push_str(" AND priority = ?");
        }
        sql.push_str(
            r#"
            ORDER BY
                CASE priority
                    WHEN 'urgent' THEN 0
                    WHEN 'high' THEN 1
                    WHEN 'medium' THEN 2
                    ELSE 3
                END,
                requested_at
            "#,
        );

        let mut query = sqlx::query_as::<_, ApprovalRequest>(&sql);
        if let Some(status) = status {
            query = query.bind(status);
        }
        if let Some(priority) = priority {
            query = query.bind(priority);
        }

        let requests = query.fetch_all(&self.pool).await?;

        Ok(requests)
    }

    /// Records a terminal approve/reject decision.
    ///
    /// ## What Happens In One Transaction
    /// 1. The request flips to approved/rejected with the decider's audit
    ///    fields (guarded by `status = 'pending'`)
    /// 2. On approve, a discrepancy report linked to this request flips from
    ///    pending to approved
    ///
    /// A rejected discrepancy request leaves its report pending: the count
    /// difference still exists and must be investigated or resolved.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Request missing or already decided
    pub async fn decide(
        &self,
        id: &str,
        approve: bool,
        decided_by: &str,
        comments: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let status = if approve {
            ApprovalRequestStatus::Approved
        } else {
            ApprovalRequestStatus::Rejected
        };

        debug!(id = %id, status = ?status, "Deciding approval request");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE approval_requests SET
                status = ?2,
                approved_by = ?3,
                approved_at = ?4,
                comments = ?5
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(decided_by)
        .bind(decided_at)
        .bind(comments)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Approval request (pending)", id));
        }

        if approve {
            sqlx::query(
                r#"
                UPDATE discrepancy_reports SET
                    status = 'approved'
                WHERE approval_request_id = ?1 AND status = 'pending'
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

/// Inserts a request on an open connection.
///
/// Shared with the session-close and movement-record transactions, which
/// insert rule-spawned requests alongside their own writes.
pub(crate) async fn insert_request_tx(
    conn: &mut SqliteConnection,
    request: &ApprovalRequest,
) -> DbResult<()> {
    debug!(
        id = %request.id,
        event_type = ?request.event_type,
        priority = ?request.priority,
        "Inserting approval request"
    );

    sqlx::query(
        r#"
        INSERT INTO approval_requests (
            id, event_type, status, register_id, session_id, movement_id,
            amount_cents, description, priority, requested_by, requested_at,
            approved_by, approved_at, comments
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&request.id)
    .bind(request.event_type)
    .bind(request.status)
    .bind(&request.register_id)
    .bind(&request.session_id)
    .bind(&request.movement_id)
    .bind(request.amount_cents)
    .bind(&request.description)
    .bind(request.priority)
    .bind(&request.requested_by)
    .bind(request.requested_at)
    .bind(&request.approved_by)
    .bind(request.approved_at)
    .bind(&request.comments)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Generates a new request ID.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::register::generate_register_id;
    use tally_core::{ApprovalEventType, CashRegister, DEFAULT_BRANCH_ID};

    async fn seeded_register(db: &Database) -> CashRegister {
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
        register
    }

    fn pending_request(
        register_id: &str,
        priority: RequestPriority,
        requested_at: DateTime<Utc>,
    ) -> ApprovalRequest {
        ApprovalRequest {
            id: generate_request_id(),
            event_type: ApprovalEventType::LargeMovement,
            status: ApprovalRequestStatus::Pending,
            register_id: register_id.to_string(),
            session_id: None,
            movement_id: None,
            amount_cents: 150_000,
            description: "Large movement of $1500.00".to_string(),
            priority,
            requested_by: "emp-1".to_string(),
            requested_at,
            approved_by: None,
            approved_at: None,
            comments: None,
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_then_age() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = seeded_register(&db).await;
        let repo = db.approvals();

        let base = Utc::now();
        let old_medium = pending_request(&register.id, RequestPriority::Medium, base);
        let urgent = pending_request(
            &register.id,
            RequestPriority::Urgent,
            base + chrono::Duration::minutes(5),
        );
        let new_medium = pending_request(
            &register.id,
            RequestPriority::Medium,
            base + chrono::Duration::minutes(10),
        );

        repo.insert(&old_medium).await.unwrap();
        repo.insert(&urgent).await.unwrap();
        repo.insert(&new_medium).await.unwrap();

        let queue = repo
            .list(Some(ApprovalRequestStatus::Pending), None)
            .await
            .unwrap();
        let ids: Vec<&str> = queue.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![&urgent.id, &old_medium.id, &new_medium.id]);
    }

    #[tokio::test]
    async fn test_decide_is_terminal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = seeded_register(&db).await;
        let repo = db.approvals();

        let request = pending_request(&register.id, RequestPriority::High, Utc::now());
        repo.insert(&request).await.unwrap();

        repo.decide(&request.id, true, "mgr-1", Some("ok"), Utc::now())
            .await
            .unwrap();

        let decided = repo.get_by_id(&request.id).await.unwrap().unwrap();
        assert_eq!(decided.status, ApprovalRequestStatus::Approved);
        assert_eq!(decided.approved_by.as_deref(), Some("mgr-1"));

        // Second decision bounces off the status guard
        let err = repo
            .decide(&request.id, false, "mgr-2", None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // First decision's audit fields survive
        let unchanged = repo.get_by_id(&request.id).await.unwrap().unwrap();
        assert_eq!(unchanged.approved_by.as_deref(), Some("mgr-1"));
        assert_eq!(unchanged.status, ApprovalRequestStatus::Approved);
    }

    #[tokio::test]
    async fn test_status_filter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let register = seeded_register(&db).await;
        let repo = db.approvals();

        let decided = pending_request(&register.id, RequestPriority::Low, Utc::now());
        let open = pending_request(&register.id, RequestPriority::Low, Utc::now());
        repo.insert(&decided).await.unwrap();
        repo.insert(&open).await.unwrap();
        repo.decide(&decided.id, false, "mgr-1", None, Utc::now())
            .await
            .unwrap();

        let pending = repo
            .list(Some(ApprovalRequestStatus::Pending), None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open.id);

        let rejected = repo
            .list(Some(ApprovalRequestStatus::Rejected), None)
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].id, decided.id);
    }
}
