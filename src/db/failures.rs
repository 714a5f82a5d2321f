//! `parse_failures` table: how often each raw object failed to parse.

use chrono::Utc;
use sqlx::SqlitePool;

/// Count one more failure for `object_key` and return the new total.
pub async fn record(db: &SqlitePool, object_key: &str, error: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO parse_failures (object_key, attempts, last_error, updated_at) VALUES (?, 1, ?, ?)
           ON CONFLICT(object_key) DO UPDATE SET attempts = attempts + 1, last_error = excluded.last_error, updated_at = excluded.updated_at
           RETURNING attempts"#,
    )
    .bind(object_key)
    .bind(error)
    .bind(Utc::now())
    .fetch_one(db)
    .await
}

pub async fn clear(db: &SqlitePool, object_key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM parse_failures WHERE object_key = ?")
        .bind(object_key)
        .execute(db)
        .await?;
    Ok(())
}
