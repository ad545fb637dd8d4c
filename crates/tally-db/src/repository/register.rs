//! # Register Repository
//!
//! Database operations for cash registers.
//!
//! ## Balance Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Who Writes current_balance_cents?                          │
//! │                                                                         │
//! │  1. Movement append     → apply_balance_delta_tx (+/- signed amount)   │
//! │  2. Session close       → set_balance_tx (counted closing balance)     │
//! │  3. Admin override      → set_balance (audited correction)             │
//! │                                                                         │
//! │  Deltas are used for movement appends so concurrent appends            │
//! │  compose instead of overwriting each other:                            │
//! │                                                                         │
//! │  ❌ WRONG: absolute update from a stale read                           │
//! │     UPDATE cash_registers SET current_balance_cents = 13000            │
//! │                                                                         │
//! │  ✅ CORRECT: delta update                                              │
//! │     UPDATE cash_registers                                              │
//! │     SET current_balance_cents = current_balance_cents + 4500           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::CashRegister;

/// Repository for cash register database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = RegisterRepository::new(pool);
///
/// let register = repo.get_by_id("uuid-here").await?;
/// let active = repo.list(false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    /// Inserts a new register.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - Name already used in this branch
    pub async fn insert(&self, register: &CashRegister) -> DbResult<()> {
        debug!(id = %register.id, name = %register.name, "Inserting register");

        sqlx::query(
            r#"
            INSERT INTO cash_registers (
                id, branch_id, name, location,
                initial_balance_cents, current_balance_cents,
                allow_negative_balance, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&register.id)
        .bind(&register.branch_id)
        .bind(&register.name)
        .bind(&register.location)
        .bind(register.initial_balance_cents)
        .bind(register.current_balance_cents)
        .bind(register.allow_negative_balance)
        .bind(register.is_active)
        .bind(register.created_at)
        .bind(register.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a register by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(CashRegister))` - Register found
    /// * `Ok(None)` - Register not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashRegister>> {
        let register = sqlx::query_as::<_, CashRegister>(
            r#"
            SELECT
                id, branch_id, name, location,
                initial_balance_cents, current_balance_cents,
                allow_negative_balance, is_active,
                created_at, updated_at
            FROM cash_registers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(register)
    }

    /// Lists registers sorted by name.
    ///
    /// ## Arguments
    /// * `include_inactive` - When false, only active registers are returned
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<CashRegister>> {
        let sql = if include_inactive {
            r#"
            SELECT
                id, branch_id, name, location,
                initial_balance_cents, current_balance_cents,
                allow_negative_balance, is_active,
                created_at, updated_at
            FROM cash_registers
            ORDER BY name
            "#
        } else {
            r#"
            SELECT
                id, branch_id, name, location,
                initial_balance_cents, current_balance_cents,
                allow_negative_balance, is_active,
                created_at, updated_at
            FROM cash_registers
            WHERE is_active = 1
            ORDER BY name
            "#
        };

        let registers = sqlx::query_as::<_, CashRegister>(sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(registers)
    }

    /// Activates or deactivates a register.
    ///
    /// ## Why Soft Delete?
    /// Historical sessions and movements still reference the register, so
    /// rows are never removed. Deactivation only blocks new sessions.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = %active, "Setting register active flag");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE cash_registers SET
                is_active = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Register", id));
        }

        Ok(())
    }

    /// Sets the running balance to an absolute value.
    ///
    /// ## When To Call
    /// Admin balance overrides only. Movement appends and session closes
    /// write the balance inside their own transactions.
    pub async fn set_balance(&self, id: &str, balance_cents: i64) -> DbResult<()> {
        debug!(id = %id, balance_cents = %balance_cents, "Overriding register balance");

        let mut conn = self.pool.acquire().await?;
        set_balance_tx(&mut conn, id, balance_cents).await
    }

    /// Counts active registers (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cash_registers WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================
//
// These run against a borrowed connection so session close and movement
// append can fold balance writes into their own transactions.

/// Sets the running balance to an absolute value on an open connection.
pub(crate) async fn set_balance_tx(
    conn: &mut SqliteConnection,
    id: &str,
    balance_cents: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE cash_registers SET
            current_balance_cents = ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(balance_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Register", id));
    }

    Ok(())
}

/// Applies a signed delta to the running balance on an open connection.
pub(crate) async fn apply_balance_delta_tx(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE cash_registers SET
            current_balance_cents = current_balance_cents + ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Register", id));
    }

    Ok(())
}

/// Applies a signed delta, refusing to take a floor-guarded register below
/// zero.
///
/// The engine checks the policy before recording, but two concurrent
/// appends can both pass that check against the same stale balance. This
/// UPDATE re-checks against the live row inside the transaction, so the
/// second append rolls back instead of breaching the floor.
pub(crate) async fn apply_balance_delta_floored_tx(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE cash_registers SET
            current_balance_cents = current_balance_cents + ?2,
            updated_at = ?3
        WHERE id = ?1
          AND (allow_negative_balance = 1 OR current_balance_cents + ?2 >= 0)
        "#,
    )
    .bind(id)
    .bind(delta_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::BalanceFloor {
            register_id: id.to_string(),
        });
    }

    Ok(())
}

/// Generates a new register ID.
pub fn generate_register_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::DEFAULT_BRANCH_ID;

    fn sample_register(name: &str) -> CashRegister {
        let now = Utc::now();
        CashRegister {
            id: generate_register_id(),
            branch_id: DEFAULT_BRANCH_ID.to_string(),
            name: name.to_string(),
            location: Some("Front of store".to_string()),
            initial_balance_cents: 10_000,
            current_balance_cents: 10_000,
            allow_negative_balance: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.registers();

        let register = sample_register("Register 1");
        repo.insert(&register).await.unwrap();

        let found = repo.get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Register 1");
        assert_eq!(found.current_balance_cents, 10_000);
        assert!(!found.allow_negative_balance);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.registers();

        repo.insert(&sample_register("Front Counter")).await.unwrap();

        let err = repo
            .insert(&sample_register("Front Counter"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_set_balance_and_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.registers();

        let register = sample_register("Register 2");
        repo.insert(&register).await.unwrap();

        repo.set_balance(&register.id, 25_000).await.unwrap();
        repo.set_active(&register.id, false).await.unwrap();

        let found = repo.get_by_id(&register.id).await.unwrap().unwrap();
        assert_eq!(found.current_balance_cents, 25_000);
        assert!(!found.is_active);

        // Inactive registers drop out of the default listing
        let active = repo.list(false).await.unwrap();
        assert!(active.iter().all(|r| r.id != register.id));
    }

    #[tokio::test]
    async fn test_set_balance_unknown_register() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db.registers().set_balance("missing", 100).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
