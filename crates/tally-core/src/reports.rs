//! # Reporting Aggregation
//!
//! Pure rollup math for registers, sessions, and calendar days. The engine
//! fetches the rows; everything here just folds slices into summaries, so
//! the same numbers come out no matter which store the rows came from.
//!
//! ## Report Shapes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RegisterReport    one register: sessions, movement totals, activity   │
//! │  SessionReport     one session: totals, duration, discrepancy         │
//! │  DailySummary      one calendar day: totals, counts (zero-filled)      │
//! │  AnalyticsSummary  whole system: totals, top register, recent feed    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`ReportFilter`] scopes the input rows (date window, registers,
//! movement types, session statuses) before any math runs.
//!
//! Empty input rolls up to zeros everywhere; reporting never errors.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ledger::net_movements;
use crate::money::Money;
use crate::types::{CashRegister, Movement, RegisterSession, SessionStatus};

// =============================================================================
// Report Filter
// =============================================================================

/// Scopes the rows a rollup is computed over.
///
/// Empty lists mean "no constraint". The date window applies to a
/// session's `opened_at` and a movement's `occurred_at`, both ends
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub register_ids: Vec<String>,
    pub movement_type_ids: Vec<String>,
    pub session_statuses: Vec<SessionStatus>,
}

impl ReportFilter {
    /// A filter that keeps everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Everything belonging to a single register.
    pub fn for_register(register_id: impl Into<String>) -> Self {
        Self {
            register_ids: vec![register_id.into()],
            ..Self::default()
        }
    }

    pub fn matches_register(&self, register: &CashRegister) -> bool {
        self.register_ids.is_empty() || self.register_ids.iter().any(|id| *id == register.id)
    }

    pub fn matches_session(&self, session: &RegisterSession) -> bool {
        (self.register_ids.is_empty()
            || self.register_ids.iter().any(|id| *id == session.register_id))
            && (self.session_statuses.is_empty()
                || self.session_statuses.contains(&session.status))
            && self.in_window(session.opened_at)
    }

    pub fn matches_movement(&self, movement: &Movement) -> bool {
        (self.register_ids.is_empty()
            || self.register_ids.iter().any(|id| *id == movement.register_id))
            && (self.movement_type_ids.is_empty()
                || self
                    .movement_type_ids
                    .iter()
                    .any(|id| *id == movement.movement_type_id))
            && self.in_window(movement.occurred_at)
    }

    /// The sessions the filter keeps, in input order.
    pub fn sessions(&self, sessions: &[RegisterSession]) -> Vec<RegisterSession> {
        sessions
            .iter()
            .filter(|s| self.matches_session(s))
            .cloned()
            .collect()
    }

    /// The movements the filter keeps, in input order.
    pub fn movements(&self, movements: &[Movement]) -> Vec<Movement> {
        movements
            .iter()
            .filter(|m| self.matches_movement(m))
            .cloned()
            .collect()
    }

    fn in_window(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

// =============================================================================
// Register Report
// =============================================================================

/// Activity rollup for a single register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterReport {
    pub register_id: String,
    pub register_name: String,
    pub total_sessions: usize,
    /// Sessions currently open or suspended.
    pub active_sessions: usize,
    pub total_movements: usize,
    pub income: Money,
    pub expense: Money,
    pub transfer: Money,
    pub net: Money,
    /// Mean closed-session length in minutes; 0 when nothing closed yet.
    pub average_session_minutes: f64,
    /// Most recent session or movement timestamp, if any activity exists.
    #[ts(as = "Option<String>")]
    pub last_activity: Option<DateTime<Utc>>,
}

/// Rolls up one register from its sessions and movements.
///
/// Both slices must already be scoped to this register; the caller's query
/// does the scoping.
pub fn register_report(
    register: &CashRegister,
    sessions: &[RegisterSession],
    movements: &[Movement],
) -> RegisterReport {
    let totals = net_movements(movements);

    let active_sessions = sessions.iter().filter(|s| s.is_active()).count();

    let closed_minutes: Vec<i64> = sessions
        .iter()
        .filter_map(|s| s.closed_at.map(|closed| (closed - s.opened_at).num_minutes()))
        .collect();
    let average_session_minutes = if closed_minutes.is_empty() {
        0.0
    } else {
        closed_minutes.iter().sum::<i64>() as f64 / closed_minutes.len() as f64
    };

    let last_activity = sessions
        .iter()
        .flat_map(|s| [Some(s.opened_at), s.closed_at])
        .chain(movements.iter().map(|m| Some(m.occurred_at)))
        .flatten()
        .max();

    RegisterReport {
        register_id: register.id.clone(),
        register_name: register.name.clone(),
        total_sessions: sessions.len(),
        active_sessions,
        total_movements: totals.count,
        income: totals.income,
        expense: totals.expense,
        transfer: totals.transfer,
        net: totals.net(),
        average_session_minutes,
        last_activity,
    }
}

// =============================================================================
// Session Report
// =============================================================================

/// Rollup of a single session's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionReport {
    pub session_id: String,
    pub register_id: String,
    pub employee_id: String,
    pub status: crate::types::SessionStatus,
    pub movement_count: usize,
    pub income: Money,
    pub expense: Money,
    pub transfer: Money,
    pub net: Money,
    /// Open-to-close length in minutes; None while the session is active.
    pub duration_minutes: Option<i64>,
    /// counted - (opening + net) for closed sessions, zero otherwise.
    pub discrepancy: Money,
}

/// Rolls up one session from its movements.
///
/// The discrepancy is recomputed from the rows handed in rather than read
/// off the session, so the report stays honest even against a store whose
/// stamped figures were tampered with.
pub fn session_report(session: &RegisterSession, movements: &[Movement]) -> SessionReport {
    let totals = net_movements(movements);

    let discrepancy = match session.closing_balance() {
        Some(counted) => counted - (session.opening_balance() + totals.net()),
        None => Money::zero(),
    };

    SessionReport {
        session_id: session.id.clone(),
        register_id: session.register_id.clone(),
        employee_id: session.employee_id.clone(),
        status: session.status,
        movement_count: totals.count,
        income: totals.income,
        expense: totals.expense,
        transfer: totals.transfer,
        net: totals.net(),
        duration_minutes: session
            .closed_at
            .map(|closed| (closed - session.opened_at).num_minutes()),
        discrepancy,
    }
}

// =============================================================================
// Daily Summaries
// =============================================================================

/// Totals for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub income: Money,
    pub expense: Money,
    pub transfer: Money,
    pub net: Money,
    pub movement_count: usize,
    /// Sessions OPENED on this day.
    pub session_count: usize,
}

/// One summary per calendar day from `from` through `to` inclusive.
///
/// ## Rules
/// - Days with no activity still get a row, zero-valued; a dashboard
///   chart needs the gaps, not just the spikes
/// - Movements land on the day of `occurred_at`, sessions on the day
///   they opened
/// - An inverted range (from > to) produces no rows
pub fn daily_summaries(
    from: NaiveDate,
    to: NaiveDate,
    sessions: &[RegisterSession],
    movements: &[Movement],
) -> Vec<DailySummary> {
    let mut by_day: HashMap<NaiveDate, Vec<&Movement>> = HashMap::new();
    for movement in movements {
        by_day
            .entry(movement.occurred_at.date_naive())
            .or_default()
            .push(movement);
    }

    let mut sessions_by_day: HashMap<NaiveDate, usize> = HashMap::new();
    for session in sessions {
        *sessions_by_day
            .entry(session.opened_at.date_naive())
            .or_default() += 1;
    }

    let mut summaries = Vec::new();
    let mut day = from;
    while day <= to {
        let day_movements: Vec<Movement> = by_day
            .get(&day)
            .map(|ms| ms.iter().map(|m| (*m).clone()).collect())
            .unwrap_or_default();
        let totals = net_movements(&day_movements);

        summaries.push(DailySummary {
            date: day,
            income: totals.income,
            expense: totals.expense,
            transfer: totals.transfer,
            net: totals.net(),
            movement_count: totals.count,
            session_count: sessions_by_day.get(&day).copied().unwrap_or(0),
        });

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    summaries
}

// =============================================================================
// Analytics Summary
// =============================================================================

/// The register contributing the most net cash in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TopRegister {
    pub register_id: String,
    pub register_name: String,
    pub net: Money,
}

/// Whole-system rollup for a dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AnalyticsSummary {
    pub register_count: usize,
    pub session_count: usize,
    pub active_session_count: usize,
    pub movement_count: usize,
    pub income: Money,
    pub expense: Money,
    pub transfer: Money,
    pub net: Money,
    /// Best net contributor, if any movements exist.
    pub top_register: Option<TopRegister>,
    /// The 10 most recent movements, newest first.
    pub recent_movements: Vec<Movement>,
}

/// How many recent movements the analytics feed carries.
const RECENT_MOVEMENT_LIMIT: usize = 10;

/// Rolls the whole window up into one summary.
pub fn analytics(
    registers: &[CashRegister],
    sessions: &[RegisterSession],
    movements: &[Movement],
) -> AnalyticsSummary {
    let totals = net_movements(movements);

    let mut net_by_register: HashMap<&str, Money> = HashMap::new();
    for movement in movements {
        let entry = net_by_register
            .entry(movement.register_id.as_str())
            .or_insert_with(Money::zero);
        *entry += movement.signed_amount();
    }

    let top_register = net_by_register
        .iter()
        .max_by_key(|(id, net)| (net.cents(), std::cmp::Reverse(*id)))
        .and_then(|(id, net)| {
            registers
                .iter()
                .find(|r| r.id == *id)
                .map(|register| TopRegister {
                    register_id: register.id.clone(),
                    register_name: register.name.clone(),
                    net: *net,
                })
        });

    let mut recent: Vec<Movement> = movements.to_vec();
    recent.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    recent.truncate(RECENT_MOVEMENT_LIMIT);

    AnalyticsSummary {
        register_count: registers.len(),
        session_count: sessions.len(),
        active_session_count: sessions.iter().filter(|s| s.is_active()).count(),
        movement_count: totals.count,
        income: totals.income,
        expense: totals.expense,
        transfer: totals.transfer,
        net: totals.net(),
        top_register,
        recent_movements: recent,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
