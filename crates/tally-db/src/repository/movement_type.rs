//! # Movement Type Repository
//!
//! Database operations for the movement type catalog.
//!
//! Movement types are reference data: a small, admin-managed list of codes
//! (SALE, REFUND, CASH_DEPOSIT, ...) that classify every ledger entry.
//! Deployments start with the seeded catalog from migration 002 and can
//! add their own types on top.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::MovementType;

/// Repository for movement type database operations.
#[derive(Debug, Clone)]
pub struct MovementTypeRepository {
    pool: SqlitePool,
}

impl MovementTypeRepository {
    /// Creates a new MovementTypeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementTypeRepository { pool }
    }

    /// Inserts a new movement type.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, movement_type: &MovementType) -> DbResult<()> {
        debug!(code = %movement_type.code, "Inserting movement type");

        sqlx::query(
            r#"
            INSERT INTO movement_types (
                id, code, name, category, description,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement_type.id)
        .bind(&movement_type.code)
        .bind(&movement_type.name)
        .bind(movement_type.category)
        .bind(&movement_type.description)
        .bind(movement_type.is_active)
        .bind(movement_type.created_at)
        .bind(movement_type.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a movement type by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MovementType>> {
        let movement_type = sqlx::query_as::<_, MovementType>(
            r#"
            SELECT
                id, code, name, category, description,
                is_active, created_at, updated_at
            FROM movement_types
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement_type)
    }

    /// Gets a movement type by its code (e.g., "SALE").
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<MovementType>> {
        let movement_type = sqlx::query_as::<_, MovementType>(
            r#"
            SELECT
                id, code, name, category, description,
                is_active, created_at, updated_at
            FROM movement_types
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement_type)
    }

    /// Lists movement types sorted by code.
    ///
    /// ## Arguments
    /// * `include_inactive` - When false, only active types are returned
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<MovementType>> {
        let sql = if include_inactive {
            r#"
            SELECT
                id, code, name, category, description,
                is_active, created_at, updated_at
            FROM movement_types
            ORDER BY code
            "#
        } else {
            r#"
            SELECT
                id, code, name, category, description,
                is_active, created_at, updated_at
            FROM movement_types
            WHERE is_active = 1
            ORDER BY code
            "#
        };

        let types = sqlx::query_as::<_, MovementType>(sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(types)
    }

    /// Activates or deactivates a movement type.
    ///
    /// Deactivation blocks new movements of this type. Existing movements
    /// keep their category snapshot, so history is unaffected.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = %active, "Setting movement type active flag");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE movement_types SET
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
            return Err(DbError::not_found("Movement type", id));
        }

        Ok(())
    }
}

/// Generates a new movement type ID.
pub fn generate_movement_type_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::MovementCategory;

    #[tokio::test]
    async fn test_seeded_catalog() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.movement_types();

        let sale = repo.get_by_code("SALE").await.unwrap().unwrap();
        assert_eq!(sale.category, MovementCategory::Income);

        let refund = repo.get_by_code("REFUND").await.unwrap().unwrap();
        assert_eq!(refund.category, MovementCategory::Expense);

        let transfer = repo.get_by_code("TRANSFER_IN").await.unwrap().unwrap();
        assert_eq!(transfer.category, MovementCategory::Transfer);
    }

    #[tokio::test]
    async fn test_insert_custom_type_and_duplicate_code() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.movement_types();

        let now = Utc::now();
        let custom = MovementType {
            id: generate_movement_type_id(),
            code: "PETTY_CASH".to_string(),
            name: "Petty Cash".to_string(),
            category: MovementCategory::Expense,
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        repo.insert(&custom).await.unwrap();

        let duplicate = MovementType {
            id: generate_movement_type_id(),
            ..custom.clone()
        };
        let err = repo.insert(&duplicate).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_deactivate_removes_from_active_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.movement_types();

        let sale = repo.get_by_code("SALE").await.unwrap().unwrap();
        repo.set_active(&sale.id, false).await.unwrap();

        let active = repo.list(false).await.unwrap();
        assert!(active.iter().all(|t| t.code != "SALE"));

        let all = repo.list(true).await.unwrap();
        assert!(all.iter().any(|t| t.code == "SALE"));
    }
}
