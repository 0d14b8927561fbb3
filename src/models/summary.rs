//! Dashboard summary

use serde::Serialize;

/// Per-user totals shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub client_count: i64,
    pub time_entry_count: i64,
    pub transaction_count: i64,
    pub total_hours: f64,
    pub total_amount: f64,
}
