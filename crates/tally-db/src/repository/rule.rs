//! # Approval Rule Repository
//!
//! Database operations for approval rules.
//!
//! Rules are ordinary rows, including the three seeded defaults from
//! migration 002. Administrators edit them like any other record; the
//! evaluator in tally-core treats the stored order (created_at) as the
//! evaluation order.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{ApprovalEventType, ApprovalRule};

/// All columns of approval_rules, in entity order.
const RULE_COLUMNS: &str = r#"
    id, name, description, event_type, conditions_json,
    auto_approve, require_manager_approval, is_active,
    created_at, updated_at
"#;

/// Repository for approval rule database operations.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: SqlitePool,
}

impl RuleRepository {
    /// Creates a new RuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RuleRepository { pool }
    }

    /// Inserts a new rule.
    pub async fn insert(&self, rule: &ApprovalRule) -> DbResult<()> {
        debug!(id = %rule.id, name = %rule.name, "Inserting approval rule");

        sqlx::query(
            r#"
            INSERT INTO approval_rules (
                id, name, description, event_type, conditions_json,
                auto_approve, require_manager_approval, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.event_type)
        .bind(&rule.conditions_json)
        .bind(rule.auto_approve)
        .bind(rule.require_manager_approval)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a rule by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ApprovalRule>> {
        let sql = format!("SELECT {RULE_COLUMNS} FROM approval_rules WHERE id = ?1");

        let rule = sqlx::query_as::<_, ApprovalRule>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rule)
    }

    /// Lists rules in stored (creation) order.
    ///
    /// ## Arguments
    /// * `include_inactive` - When false, only active rules are returned
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<ApprovalRule>> {
        let sql = if include_inactive {
            format!("SELECT {RULE_COLUMNS} FROM approval_rules ORDER BY created_at")
        } else {
            format!(
                "SELECT {RULE_COLUMNS} FROM approval_rules WHERE is_active = 1 ORDER BY created_at"
            )
        };

        let rules = sqlx::query_as::<_, ApprovalRule>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// Lists active rules for one event type, in evaluation order.
    ///
    /// This is the rule set the evaluator walks for an event; stored order
    /// is creation order, so older rules win ties.
    pub async fn list_active_for_event(
        &self,
        event_type: ApprovalEventType,
    ) -> DbResult<Vec<ApprovalRule>> {
        let sql = format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM approval_rules
            WHERE event_type = ?1 AND is_active = 1
            ORDER BY created_at
            "#
        );

        let rules = sqlx::query_as::<_, ApprovalRule>(&sql)
            .bind(event_type)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// Updates an existing rule.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Rule doesn't exist
    pub async fn update(&self, rule: &ApprovalRule) -> DbResult<()> {
        debug!(id = %rule.id, "Updating approval rule");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE approval_rules SET
                name = ?2,
                description = ?3,
                event_type = ?4,
                conditions_json = ?5,
                auto_approve = ?6,
                require_manager_approval = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.event_type)
        .bind(&rule.conditions_json)
        .bind(rule.auto_approve)
        .bind(rule.require_manager_approval)
        .bind(rule.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Approval rule", &rule.id));
        }

        Ok(())
    }

    /// Activates or deactivates a rule.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = %active, "Setting rule active flag");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE approval_rules SET
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
            return Err(DbError::not_found("Approval rule", id));
        }

        Ok(())
    }
}

/// Generates a new rule ID.
pub fn generate_rule_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
