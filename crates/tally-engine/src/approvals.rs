//! # Approval Operations
//!
//! The manager-facing side of the rule engine: the pending queue, terminal
//! approve/reject decisions, and rule administration.
//!
//! ## Decision Semantics
//! ```text
//! pending ──approve──► approved (terminal)
//!    │
//!    └────reject─────► rejected (terminal)
//! ```
//! A second decision on the same request fails `ALREADY_RESOLVED` and the
//! first decision's audit fields survive untouched. Approving a
//! discrepancy request also flips its linked report from pending to
//! approved; rejecting leaves the report pending, because the count
//! difference still exists and still needs an explanation.

use chrono::Utc;
use tracing::{debug, info};

use tally_core::rules::calculate_priority;
use tally_core::validation::{validate_notes, validate_rule_conditions, validate_rule_name};
use tally_core::{
    ApprovalEventType, ApprovalRequest, ApprovalRequestStatus, ApprovalRule, CoreError, Money,
    RequestPriority, RuleCondition,
};
use tally_db::repository::approval::generate_request_id;
use tally_db::repository::rule::generate_rule_id;

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

impl Engine {
    /// Creates a manual approval request, outside any rule.
    ///
    /// ## Usage
    /// Escalations a cashier raises by hand ("till drawer jammed, counted
    /// late") that should go through the same manager queue.
    pub async fn create_approval_request(
        &self,
        event_type: ApprovalEventType,
        register_id: &str,
        session_id: Option<String>,
        amount_cents: i64,
        description: &str,
        requested_by: &str,
    ) -> EngineResult<ApprovalRequest> {
        validate_notes(description).map_err(CoreError::Validation)?;

        // Referential sanity before the insert hits a foreign key
        self.db()
            .registers()
            .get_by_id(register_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Register", register_id))?;

        let request = ApprovalRequest {
            id: generate_request_id(),
            event_type,
            status: ApprovalRequestStatus::Pending,
            register_id: register_id.to_string(),
            session_id,
            movement_id: None,
            amount_cents: amount_cents.abs(),
            description: description.to_string(),
            priority: calculate_priority(Money::from_cents(amount_cents), 0.0),
            requested_by: requested_by.to_string(),
            requested_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            comments: None,
        };

        self.db().approvals().insert(&request).await?;

        info!(
            request_id = %request.id,
            event_type = ?event_type,
            priority = ?request.priority,
            "Approval request created"
        );

        Ok(request)
    }

    /// Approves a pending request.
    ///
    /// ## Errors
    /// - `NOT_FOUND` - Request does not exist
    /// - `ALREADY_RESOLVED` - Request was already decided
    pub async fn approve_request(
        &self,
        request_id: &str,
        approver: &str,
        comments: Option<String>,
    ) -> EngineResult<ApprovalRequest> {
        self.decide_request(request_id, true, approver, comments)
            .await
    }

    /// Rejects a pending request. A rejected discrepancy request leaves
    /// its report pending for investigation.
    pub async fn reject_request(
        &self,
        request_id: &str,
        approver: &str,
        comments: Option<String>,
    ) -> EngineResult<ApprovalRequest> {
        self.decide_request(request_id, false, approver, comments)
            .await
    }

    async fn decide_request(
        &self,
        request_id: &str,
        approve: bool,
        approver: &str,
        comments: Option<String>,
    ) -> EngineResult<ApprovalRequest> {
        debug!(request_id = %request_id, approve = approve, "Deciding approval request");

        if let Some(comments) = comments.as_deref() {
            validate_notes(comments).map_err(CoreError::Validation)?;
        }

        // Pre-read for a precise error; the status guard in the UPDATE is
        // the backstop against a concurrent decision.
        let request = self
            .db()
            .approvals()
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Approval request", request_id))?;
        if request.status != ApprovalRequestStatus::Pending {
            return Err(CoreError::RequestAlreadyDecided {
                request_id: request_id.to_string(),
                status: format!("{:?}", request.status).to_lowercase(),
            }
            .into());
        }

        self.db()
            .approvals()
            .decide(request_id, approve, approver, comments.as_deref(), Utc::now())
            .await?;

        info!(
            request_id = %request_id,
            approved = approve,
            approver = %approver,
            "Approval request decided"
        );

        self.db()
            .approvals()
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Approval request", request_id))
    }

    /// Lists requests in manager triage order (priority band, then age).
    pub async fn list_approval_requests(
        &self,
        status: Option<ApprovalRequestStatus>,
        priority: Option<RequestPriority>,
    ) -> EngineResult<Vec<ApprovalRequest>> {
        Ok(self.db().approvals().list(status, priority).await?)
    }
}

// =============================================================================
// Rule Administration
// =============================================================================

impl Engine {
    /// Creates an approval rule.
    ///
    /// An empty condition list is storable but such a rule never fires;
    /// conditions can be added later via [`Engine::update_approval_rule`].
    pub async fn create_approval_rule(
        &self,
        name: &str,
        description: Option<String>,
        event_type: ApprovalEventType,
        conditions: Vec<RuleCondition>,
        auto_approve: bool,
        require_manager_approval: bool,
    ) -> EngineResult<ApprovalRule> {
        validate_rule_name(name).map_err(CoreError::Validation)?;
        validate_rule_conditions(&conditions).map_err(CoreError::Validation)?;

        let conditions_json =
            serde_json::to_string(&conditions).map_err(|e| EngineError::internal(e.to_string()))?;

        let now = Utc::now();
        let rule = ApprovalRule {
            id: generate_rule_id(),
            name: name.trim().to_string(),
            description,
            event_type,
            conditions_json,
            auto_approve,
            require_manager_approval,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.db().rules().insert(&rule).await?;

        info!(rule_id = %rule.id, name = %rule.name, event_type = ?event_type, "Approval rule created");

        Ok(rule)
    }

    /// Replaces a rule's name, description, conditions, and flags.
    pub async fn update_approval_rule(
        &self,
        rule_id: &str,
        name: &str,
        description: Option<String>,
        conditions: Vec<RuleCondition>,
        auto_approve: bool,
        require_manager_approval: bool,
    ) -> EngineResult<ApprovalRule> {
        validate_rule_name(name).map_err(CoreError::Validation)?;
        validate_rule_conditions(&conditions).map_err(CoreError::Validation)?;

        let mut rule = self
            .db()
            .rules()
            .get_by_id(rule_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Approval rule", rule_id))?;

        rule.name = name.trim().to_string();
        rule.description = description;
        rule.conditions_json =
            serde_json::to_string(&conditions).map_err(|e| EngineError::internal(e.to_string()))?;
        rule.auto_approve = auto_approve;
        rule.require_manager_approval = require_manager_approval;
        rule.updated_at = Utc::now();

        self.db().rules().update(&rule).await?;

        info!(rule_id = %rule_id, "Approval rule updated");

        Ok(rule)
    }

    /// Activates or deactivates a rule. Inactive rules are skipped by the
    /// evaluator but keep their configuration.
    pub async fn set_rule_active(&self, rule_id: &str, active: bool) -> EngineResult<()> {
        self.db().rules().set_active(rule_id, active).await?;
        info!(rule_id = %rule_id, active = active, "Approval rule flag updated");
        Ok(())
    }

    /// Lists rules, optionally including deactivated ones.
    pub async fn list_approval_rules(
        &self,
        include_inactive: bool,
    ) -> EngineResult<Vec<ApprovalRule>> {
        Ok(self.db().rules().list(include_inactive).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
