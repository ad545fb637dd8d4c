//! # Reporting Operations
//!
//! Fetches the rows, applies the caller's [`ReportFilter`], and hands the
//! survivors to the pure rollup math in [`tally_core::reports`]. Filtering
//! happens engine-side over fetched slices: a single-branch deployment
//! holds a bounded number of sessions and movements, and keeping the math
//! out of SQL keeps it testable.

use std::collections::HashMap;

use chrono::NaiveDate;

use tally_core::reports::{
    analytics, daily_summaries, register_report, session_report, AnalyticsSummary, DailySummary,
    RegisterReport, ReportFilter, SessionReport,
};
use tally_core::Movement;

use crate::engine::Engine;
use crate::error::EngineResult;

impl Engine {
    /// Activity rollup for one register, unfiltered.
    pub async fn register_report(&self, register_id: &str) -> EngineResult<RegisterReport> {
        let register = self.get_register(register_id).await?;
        let sessions = self.db().sessions().list_for_register(register_id).await?;
        let movements = self.db().movements().list_for_register(register_id).await?;

        Ok(register_report(&register, &sessions, &movements))
    }

    /// Activity rollups for the registers the filter keeps, deactivated
    /// ones included.
    pub async fn register_reports(
        &self,
        filter: &ReportFilter,
    ) -> EngineResult<Vec<RegisterReport>> {
        let registers = self.db().registers().list(true).await?;
        let sessions = filter.sessions(&self.db().sessions().list_all().await?);
        let movements = filter.movements(&self.db().movements().list_all().await?);

        let reports = registers
            .iter()
            .filter(|register| filter.matches_register(register))
            .map(|register| {
                let register_sessions: Vec<_> = sessions
                    .iter()
                    .filter(|s| s.register_id == register.id)
                    .cloned()
                    .collect();
                let register_movements: Vec<_> = movements
                    .iter()
                    .filter(|m| m.register_id == register.id)
                    .cloned()
                    .collect();
                register_report(register, &register_sessions, &register_movements)
            })
            .collect();

        Ok(reports)
    }

    /// Ledger rollup for one session.
    pub async fn session_report(&self, session_id: &str) -> EngineResult<SessionReport> {
        let session = self.require_session(session_id).await?;
        let movements = self.db().movements().list_for_session(session_id).await?;

        Ok(session_report(&session, &movements))
    }

    /// Ledger rollups for the sessions the filter keeps, newest first.
    pub async fn session_reports(
        &self,
        filter: &ReportFilter,
    ) -> EngineResult<Vec<SessionReport>> {
        let sessions = filter.sessions(&self.db().sessions().list_all().await?);
        let movements = filter.movements(&self.db().movements().list_all().await?);

        let mut by_session: HashMap<&str, Vec<Movement>> = HashMap::new();
        for movement in &movements {
            by_session
                .entry(movement.session_id.as_str())
                .or_default()
                .push(movement.clone());
        }

        let reports = sessions
            .iter()
            .map(|session| {
                let ledger = by_session
                    .get(session.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                session_report(session, ledger)
            })
            .collect();

        Ok(reports)
    }

    /// One summary per calendar day from `from` through `to` inclusive,
    /// zero-filled for quiet days. The filter scopes registers, movement
    /// types, and session statuses; the day range supplies the window.
    pub async fn daily_summaries(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        filter: &ReportFilter,
    ) -> EngineResult<Vec<DailySummary>> {
        let sessions = filter.sessions(&self.db().sessions().list_all().await?);
        let movements = filter.movements(&self.db().movements().list_all().await?);

        Ok(daily_summaries(from, to, &sessions, &movements))
    }

    /// Whole-system rollup: totals, top register, recent movement feed.
    pub async fn analytics(&self, filter: &ReportFilter) -> EngineResult<AnalyticsSummary> {
        let registers: Vec<_> = self
            .db()
            .registers()
            .list(true)
            .await?
            .into_iter()
            .filter(|register| filter.matches_register(register))
            .collect();
        let sessions = filter.sessions(&self.db().sessions().list_all().await?);
        let movements = filter.movements(&self.db().movements().list_all().await?);

        Ok(analytics(&registers, &sessions, &movements))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Utc};
    use tally_db::DbConfig;

    async fn engine() -> Engine {
        Engine::open(DbConfig::in_memory()).await.unwrap()
    }

    async fn record(engine: &Engine, register_id: &str, code: &str, cents: i64) {
        let movement_type = engine
            .db()
            .movement_types()
            .get_by_code(code)
            .await
            .unwrap()
            .unwrap();
        engine
            .record_movement(register_id, &movement_type.id, cents, None, None, "emp-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_register_report_totals() {
        let engine = engine().await;
        let register = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap();
        let session = engine
            .open_session(&register.id, "emp-1", 10_000, None)
            .await
            .unwrap();
        record(&engine, &register.id, "SALE", 5_000).await;
        record(&engine, &register.id, "CASH_WITHDRAWAL", 2_000).await;
        engine
            .close_session(&session.id, "emp-1", 13_000, None)
            .await
            .unwrap();

        let report = engine.register_report(&register.id).await.unwrap();
        assert_eq!(report.total_sessions, 1);
        assert_eq!(report.active_sessions, 0);
        assert_eq!(report.income.cents(), 5_000);
        assert_eq!(report.expense.cents(), 2_000);
        assert_eq!(report.net.cents(), 3_000);
    }

    #[tokio::test]
    async fn test_session_report_recomputes_discrepancy() {
        let engine = engine().await;
        let register = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap();
        let session = engine
            .open_session(&register.id, "emp-1", 10_000, None)
            .await
            .unwrap();
        record(&engine, &register.id, "SALE", 5_000).await;
        engine
            .close_session(&session.id, "emp-1", 14_000, None)
            .await
            .unwrap();

        let report = engine.session_report(&session.id).await.unwrap();
        assert_eq!(report.net.cents(), 5_000);
        // counted 140 vs expected 150
        assert_eq!(report.discrepancy.cents(), -1_000);
        assert!(report.duration_minutes.is_some());
    }

    #[tokio::test]
    async fn test_session_reports_scoped_to_register() {
        let engine = engine().await;
        let r1 = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap();
        let r2 = engine
            .create_register("Front Desk 2", None, 10_000, false)
            .await
            .unwrap();
        engine
            .open_session(&r1.id, "emp-1", 10_000, None)
            .await
            .unwrap();
        engine
            .open_session(&r2.id, "emp-2", 10_000, None)
            .await
            .unwrap();
        record(&engine, &r1.id, "SALE", 5_000).await;

        let scoped = engine
            .session_reports(&ReportFilter::for_register(&r1.id))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].income.cents(), 5_000);

        let all = engine.session_reports(&ReportFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_register_reports_scoped_by_filter() {
        let engine = engine().await;
        let r1 = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap();
        engine
            .create_register("Front Desk 2", None, 10_000, false)
            .await
            .unwrap();

        let scoped = engine
            .register_reports(&ReportFilter::for_register(&r1.id))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].register_id, r1.id);

        let all = engine.register_reports(&ReportFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_daily_summaries_cover_quiet_days() {
        let engine = engine().await;
        let register = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap();
        engine
            .open_session(&register.id, "emp-1", 10_000, None)
            .await
            .unwrap();
        record(&engine, &register.id, "SALE", 5_000).await;

        let today = Utc::now().date_naive();
        let from = today.pred_opt().unwrap().pred_opt().unwrap();

        let summaries = engine
            .daily_summaries(from, today, &ReportFilter::all())
            .await
            .unwrap();
        assert_eq!(summaries.len(), 3);

        // Two quiet days, then today's activity
        assert_eq!(summaries[0].movement_count, 0);
        assert_eq!(summaries[1].movement_count, 0);
        assert_eq!(summaries[2].date.day(), today.day());
        assert_eq!(summaries[2].income.cents(), 5_000);
        assert_eq!(summaries[2].session_count, 1);
    }

    #[tokio::test]
    async fn test_analytics_rollup() {
        let engine = engine().await;
        let r1 = engine
            .create_register("Front Desk 1", None, 10_000, false)
            .await
            .unwrap();
        let r2 = engine
            .create_register("Front Desk 2", None, 10_000, false)
            .await
            .unwrap();
        engine
            .open_session(&r1.id, "emp-1", 10_000, None)
            .await
            .unwrap();
        engine
            .open_session(&r2.id, "emp-2", 10_000, None)
            .await
            .unwrap();
        record(&engine, &r1.id, "SALE", 3_000).await;
        record(&engine, &r2.id, "SALE", 9_000).await;
        record(&engine, &r2.id, "CASH_WITHDRAWAL", 1_000).await;

        let summary = engine.analytics(&ReportFilter::all()).await.unwrap();
        assert_eq!(summary.register_count, 2);
        assert_eq!(summary.active_session_count, 2);
        assert_eq!(summary.movement_count, 3);
        assert_eq!(summary.net.cents(), 11_000);

        let top = summary.top_register.unwrap();
        assert_eq!(top.register_id, r2.id);
        assert_eq!(top.net.cents(), 8_000);
        assert_eq!(summary.recent_movements.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_system_reports_zero() {
        let engine = engine().await;

        let summary = engine.analytics(&ReportFilter::all()).await.unwrap();
        assert_eq!(summary.register_count, 0);
        assert!(summary.top_register.is_none());

        let reports = engine.register_reports(&ReportFilter::all()).await.unwrap();
        assert!(reports.is_empty());
    }
}
