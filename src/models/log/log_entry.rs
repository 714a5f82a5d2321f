//! Run-log line stored in SQLite and exposed via `/logs`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub level: String,
    /// Ingestion run that produced the line, if any.
    pub run_id: Option<String>,
    pub message: String,
}
