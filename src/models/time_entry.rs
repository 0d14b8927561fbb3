//! Time entry model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Hours worked for a client on a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub client_id: i64,
    pub description: String,
    /// Calendar day the work happened on
    pub date: NaiveDate,
    /// Wall-clock start, `HH:MM` or `HH:MM:SS`
    pub start_time: Option<String>,
    /// Wall-clock end, `HH:MM` or `HH:MM:SS`
    pub end_time: Option<String>,
    /// Hours, always positive
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTimeEntryInput {
    pub client_id: i64,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: f64,
}

/// Partial update; `Some(None)` clears an optional time
#[derive(Debug, Clone, Default)]
pub struct UpdateTimeEntryInput {
    pub client_id: Option<i64>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<Option<String>>,
    pub end_time: Option<Option<String>>,
    pub duration: Option<f64>,
}

impl UpdateTimeEntryInput {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.duration.is_none()
    }
}

/// Request body for time entry create and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryPayload {
    pub client_id: Option<i64>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<f64>,
}
