//! `incoming_emails` table: raw messages waiting for the second phase of a staged sync.

use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct StagedEmail {
    pub id: i64,
    pub email_send_to: String,
    pub message_id: String,
    pub email_data: Vec<u8>,
    pub email_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Returns false when the object was already staged by an earlier run.
pub async fn stage(
    db: &SqlitePool,
    email_send_to: &str,
    message_id: &str,
    data: &[u8],
    email_date: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "INSERT INTO incoming_emails (email_send_to, message_id, email_data, email_date, created_at) VALUES (?, ?, ?, ?, ?) ON CONFLICT(message_id) DO NOTHING",
    )
    .bind(email_send_to.trim().to_ascii_lowercase())
    .bind(message_id)
    .bind(data)
    .bind(email_date)
    .bind(Utc::now())
    .execute(db)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Oldest first, so retention evicts in arrival order.
pub async fn pending_for(db: &SqlitePool, email_send_to: &str) -> Result<Vec<StagedEmail>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, email_send_to, message_id, email_data, email_date, created_at FROM incoming_emails WHERE email_send_to = lower(?) ORDER BY created_at ASC, id ASC",
    )
    .bind(email_send_to.trim())
    .fetch_all(db)
    .await
}

pub async fn pending_recipients(db: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT email_send_to FROM incoming_emails ORDER BY email_send_to")
        .fetch_all(db)
        .await
}

pub async fn delete<'e, E>(db: E, id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM incoming_emails WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
