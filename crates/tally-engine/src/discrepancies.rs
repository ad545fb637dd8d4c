//! # Discrepancy Report Operations
//!
//! The lifecycle of a close-time count difference.
//!
//! ## Report Lifecycle
//! ```text
//! pending ──investigate──► investigating ──resolve──► resolved (terminal)
//!    │                           ▲
//!    ├──(linked request approved)┤
//!    ▼                           │
//! approved ──investigate─────────┘
//!    │
//!    └──────────resolve──────────────────► resolved
//! ```
//!
//! A report's balance figures were frozen at detection; resolving only
//! adds the explanation and audit fields, never touches the numbers.

use chrono::Utc;
use tracing::{debug, info};

use tally_core::validation::validate_resolution;
use tally_core::{CoreError, DiscrepancyReport, DiscrepancyStatus};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

impl Engine {
    /// Resolves a report with a mandatory explanation.
    ///
    /// ## Errors
    /// - `NOT_FOUND` - Report does not exist
    /// - `ALREADY_RESOLVED` - Report was already resolved
    /// - `VALIDATION_ERROR` - Empty or oversized resolution text
    pub async fn resolve_discrepancy(
        &self,
        report_id: &str,
        resolver: &str,
        resolution: &str,
    ) -> EngineResult<DiscrepancyReport> {
        debug!(report_id = %report_id, "Resolving discrepancy report");

        validate_resolution(resolution).map_err(CoreError::Validation)?;

        let report = self.require_report(report_id).await?;
        if report.status == DiscrepancyStatus::Resolved {
            return Err(CoreError::ReportAlreadyResolved {
                report_id: report_id.to_string(),
                status: "resolved".to_string(),
            }
            .into());
        }

        self.db()
            .discrepancies()
            .resolve(report_id, resolution.trim(), resolver, Utc::now())
            .await?;

        info!(report_id = %report_id, resolver = %resolver, "Discrepancy report resolved");

        self.require_report(report_id).await
    }

    /// Moves a pending or approved report into investigation.
    pub async fn start_investigation(&self, report_id: &str) -> EngineResult<DiscrepancyReport> {
        let report = self.require_report(report_id).await?;
        match report.status {
            DiscrepancyStatus::Resolved => {
                return Err(CoreError::ReportAlreadyResolved {
                    report_id: report_id.to_string(),
                    status: "resolved".to_string(),
                }
                .into());
            }
            DiscrepancyStatus::Investigating => {
                // Already where the caller wants it
                return Ok(report);
            }
            DiscrepancyStatus::Pending | DiscrepancyStatus::Approved => {}
        }

        self.db()
            .discrepancies()
            .mark_investigating(report_id)
            .await?;

        info!(report_id = %report_id, "Discrepancy report under investigation");

        self.require_report(report_id).await
    }

    /// Lists reports, optionally filtered by status, newest first.
    pub async fn list_discrepancies(
        &self,
        status: Option<DiscrepancyStatus>,
    ) -> EngineResult<Vec<DiscrepancyReport>> {
        Ok(self.db().discrepancies().list(status).await?)
    }

    /// Gets the report attached to a session, if one exists.
    pub async fn get_session_discrepancy(
        &self,
        session_id: &str,
    ) -> EngineResult<Option<DiscrepancyReport>> {
        Ok(self.db().discrepancies().get_by_session(session_id).await?)
    }

    async fn require_report(&self, report_id: &str) -> EngineResult<DiscrepancyReport> {
        self.db()
            .discrepancies()
            .get_by_id(report_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Discrepancy report", report_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
