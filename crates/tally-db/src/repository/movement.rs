//! # Movement Repository
//!
//! Database operations for the append-only movement ledger.
//!
//! ## Append Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Why record() Is Append-Only                             │
//! │                                                                         │
//! │  ❌ WRONG: read balance, compute, write back                           │
//! │     let balance = read_balance();        ← terminal A reads 100        │
//! │     write_balance(balance + 50);         ← terminal B also read 100    │
//! │                                            → one movement lost         │
//! │                                                                         │
//! │  ✅ CORRECT: append movement + delta the register in one transaction   │
//! │     INSERT INTO movements (...)                                        │
//! │     UPDATE cash_registers                                              │
//! │     SET current_balance_cents = current_balance_cents + 5000           │
//! │                                                                         │
//! │  Concurrent appends against the same session compose; the ledger       │
//! │  stays the source of truth and the register column is a cache of it.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements lock when their owning session closes. Amendments run through
//! a guarded UPDATE that checks the session is still active.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::approval::insert_request_tx;
use crate::repository::register::{apply_balance_delta_floored_tx, apply_balance_delta_tx};
use tally_core::{ApprovalRequest, Movement};

/// All columns of movements, in entity order.
const MOVEMENT_COLUMNS: &str = r#"
    id, register_id, session_id, movement_type_id,
    category, amount_cents, description, reference,
    recorded_by, occurred_at, amended_at, created_at
"#;

/// Repository for movement database operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement and applies its balance effect atomically.
    ///
    /// ## What Happens In One Transaction
    /// 1. The movement row is inserted
    /// 2. The register balance moves by `balance_delta_cents`
    ///    (the movement's signed amount; zero for transfers)
    /// 3. An approval request spawned by a large-movement rule is inserted
    ///
    /// ## Arguments
    /// * `enforce_balance_floor` - When true, the balance update refuses to
    ///   take a floor-guarded register below zero and the whole append rolls
    ///   back with [`DbError::BalanceFloor`]. The engine clears this flag
    ///   when a negative-balance rule auto-approved the breach.
    pub async fn record(
        &self,
        movement: &Movement,
        balance_delta_cents: i64,
        enforce_balance_floor: bool,
        request: Option<&ApprovalRequest>,
    ) -> DbResult<()> {
        debug!(
            id = %movement.id,
            session_id = %movement.session_id,
            amount_cents = %movement.amount_cents,
            category = ?movement.category,
            "Recording movement"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO movements (
                id, register_id, session_id, movement_type_id,
                category, amount_cents, description, reference,
                recorded_by, occurred_at, amended_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.register_id)
        .bind(&movement.session_id)
        .bind(&movement.movement_type_id)
        .bind(movement.category)
        .bind(movement.amount_cents)
        .bind(&movement.description)
        .bind(&movement.reference)
        .bind(&movement.recorded_by)
        .bind(movement.occurred_at)
        .bind(movement.amended_at)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        if enforce_balance_floor {
            apply_balance_delta_floored_tx(&mut tx, &movement.register_id, balance_delta_cents)
                .await?;
        } else {
            apply_balance_delta_tx(&mut tx, &movement.register_id, balance_delta_cents).await?;
        }

        if let Some(request) = request {
            insert_request_tx(&mut tx, request).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Gets a movement by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Movement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = ?1");

        let movement = sqlx::query_as::<_, Movement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    /// Lists all movements of a session in occurrence order.
    ///
    /// This is the authoritative input for expected-balance computation at
    /// close time.
    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<Movement>> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            WHERE session_id = ?1
            ORDER BY occurred_at, created_at
            "#
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists all movements of a register in occurrence order.
    pub async fn list_for_register(&self, register_id: &str) -> DbResult<Vec<Movement>> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            WHERE register_id = ?1
            ORDER BY occurred_at, created_at
            "#
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(register_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists movements that occurred in `[from, to)`.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Movement>> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            WHERE occurred_at >= ?1 AND occurred_at < ?2
            ORDER BY occurred_at, created_at
            "#
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists the most recent movements, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Movement>> {
        let sql = format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            ORDER BY occurred_at DESC, created_at DESC
            LIMIT ?1
            "#
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists every movement in occurrence order.
    ///
    /// ## Usage
    /// Reporting input, same bounded-dataset reasoning as
    /// `SessionRepository::list_all`.
    pub async fn list_all(&self) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements ORDER BY occurred_at, created_at"
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Amends a movement while its session is still active.
    ///
    /// ## Partial Update Semantics
    /// `None` keeps the stored value. Category and sign are not amendable;
    /// an amount change moves the register balance by the signed difference
    /// (`balance_delta_cents`, zero when the amount is unchanged or the
    /// movement is a transfer) in the same transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Movement missing or its session closed
    pub async fn amend(
        &self,
        id: &str,
        register_id: &str,
        amount_cents: Option<i64>,
        description: Option<&str>,
        reference: Option<&str>,
        balance_delta_cents: i64,
    ) -> DbResult<()> {
        debug!(id = %id, "Amending movement");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE movements SET
                amount_cents = COALESCE(?2, amount_cents),
                description = COALESCE(?3, description),
                reference = COALESCE(?4, reference),
                amended_at = ?5
            WHERE id = ?1
              AND EXISTS (
                  SELECT 1 FROM register_sessions s
                  WHERE s.id = movements.session_id
                    AND s.status IN ('open', 'suspended')
              )
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .bind(description)
        .bind(reference)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Movement (amendable)", id));
        }

        if balance_delta_cents != 0 {
            apply_balance_delta_tx(&mut tx, register_id, balance_delta_cents).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Counts all movements (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
