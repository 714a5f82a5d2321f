//! `logs` table: run-level log sink readable over HTTP.

use crate::models::log::log_entry::LogEntry;
use chrono::Utc;
use sqlx::SqlitePool;

pub async fn append(
    db: &SqlitePool,
    level: &str,
    run_id: Option<&str>,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO logs (ts, level, run_id, message) VALUES (?, ?, ?, ?)")
        .bind(Utc::now())
        .bind(level)
        .bind(run_id)
        .bind(message)
        .execute(db)
        .await?;
    Ok(())
}

/// Latest `limit` lines, oldest first.
pub async fn recent(db: &SqlitePool, limit: i64) -> Result<Vec<LogEntry>, sqlx::Error> {
    let mut rows: Vec<LogEntry> =
        sqlx::query_as("SELECT id, ts, level, run_id, message FROM logs ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(db)
            .await?;
    rows.reverse();
    Ok(rows)
}
