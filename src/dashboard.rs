//! Read model for the dashboard — derived views over session
//! snapshots, never a mutation path.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::reply::{GateSnapshot, RateGate};
use crate::session::{EngagementState, SessionStore, SessionSummary};

/// Aggregate intelligence counts across all sessions.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceTotals {
    pub bank_accounts: usize,
    pub upi_ids: usize,
    pub phishing_links: usize,
    pub phone_numbers: usize,
    pub suspicious_keywords: usize,
}

/// Top-level dashboard summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub complete_sessions: usize,
    pub scam_sessions: usize,
    pub callbacks_initiated: usize,
    pub intelligence_totals: IntelligenceTotals,
    /// Session counts grouped by caller locale ("" for unknown).
    pub sessions_by_locale: BTreeMap<String, usize>,
    pub llm_gate: GateSnapshot,
}

/// Compute the dashboard summary from current store state.
pub async fn summarize(store: &SessionStore, gate: &RateGate) -> DashboardSummary {
    let snapshots = store.all_snapshots().await;

    let mut summary = DashboardSummary {
        total_sessions: snapshots.len(),
        active_sessions: 0,
        complete_sessions: 0,
        scam_sessions: 0,
        callbacks_initiated: 0,
        intelligence_totals: IntelligenceTotals::default(),
        sessions_by_locale: BTreeMap::new(),
        llm_gate: gate.snapshot(),
    };

    for session in &snapshots {
        match session.state {
            EngagementState::New | EngagementState::Active => summary.active_sessions += 1,
            EngagementState::Complete => summary.complete_sessions += 1,
        }
        if session.scam_detected {
            summary.scam_sessions += 1;
        }
        if session.callback_sent {
            summary.callbacks_initiated += 1;
        }

        let intel = &session.intelligence;
        summary.intelligence_totals.bank_accounts += intel.bank_accounts.len();
        summary.intelligence_totals.upi_ids += intel.upi_ids.len();
        summary.intelligence_totals.phishing_links += intel.phishing_links.len();
        summary.intelligence_totals.phone_numbers += intel.phone_numbers.len();
        summary.intelligence_totals.suspicious_keywords += intel.suspicious_keywords.len();

        *summary
            .sessions_by_locale
            .entry(session.meta.locale.clone())
            .or_insert(0) += 1;
    }

    summary
}

/// Most-recently-active session summaries, newest first.
pub async fn recent_sessions(store: &SessionStore, limit: usize) -> Vec<SessionSummary> {
    store.list_recent(limit).await
}
