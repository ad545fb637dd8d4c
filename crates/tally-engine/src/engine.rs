//! # Engine Handle
//!
//! The [`Engine`] owns a [`Database`] and exposes every operation as an
//! `impl Engine` block in its topic module. `Engine` is cheap to clone;
//! clones share the underlying connection pool.

use serde_json::Value;
use tracing::{debug, warn};

use tally_core::rules::{self, RuleDecision};
use tally_core::ApprovalEventType;
use tally_db::{Database, DbConfig};

use crate::error::EngineResult;

/// Orchestration handle over the Tally store.
///
/// ## Usage
/// ```rust,ignore
/// let engine = Engine::open(DbConfig::new("./data/tally.db")).await?;
/// let outcome = engine.record_movement(...).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
}

impl Engine {
    /// Wraps an already-connected database.
    pub fn new(db: Database) -> Self {
        Engine { db }
    }

    /// Connects (and migrates, per config) and wraps the database.
    pub async fn open(config: DbConfig) -> EngineResult<Self> {
        let db = Database::new(config).await?;
        Ok(Engine { db })
    }

    /// The underlying database, for callers that need raw repository access.
    pub fn db(&self) -> &Database {
        &self.db
    }
}

// =============================================================================
// Rule Evaluation Wiring
// =============================================================================

/// Owned projection of a rule decision, carrying just what the operations
/// need after the borrowed rule set goes out of scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EventOutcome {
    /// A rule waved the event through; no request needed.
    AutoApproved { rule_name: String },
    /// A rule wants a manager to look at this.
    NeedsApproval { rule_name: String },
    /// No decisive rule matched.
    Pass,
}

impl Engine {
    /// Loads the active rules for an event type and runs the fact through
    /// them.
    ///
    /// An event type with no active rules passes by default, with a
    /// warn-level log so the permissive path stays visible.
    pub(crate) async fn evaluate_event(
        &self,
        event_type: ApprovalEventType,
        fact: &Value,
    ) -> EngineResult<EventOutcome> {
        let active = self.db.rules().list_active_for_event(event_type).await?;

        if active.is_empty() {
            warn!(
                event_type = ?event_type,
                "No active approval rules for event type; passing by default"
            );
            return Ok(EventOutcome::Pass);
        }

        let decision = rules::evaluate(event_type, &active, fact)?;
        let outcome = match decision {
            RuleDecision::AutoApproved { rule } => {
                debug!(event_type = ?event_type, rule = %rule.name, "Rule auto-approved event");
                EventOutcome::AutoApproved {
                    rule_name: rule.name.clone(),
                }
            }
            RuleDecision::NeedsApproval { rule } => {
                debug!(event_type = ?event_type, rule = %rule.name, "Rule requires approval");
                EventOutcome::NeedsApproval {
                    rule_name: rule.name.clone(),
                }
            }
            RuleDecision::Pass => EventOutcome::Pass,
        };

        Ok(outcome)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
