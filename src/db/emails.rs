//! `emails` table: mailbox entries, retention queries.

use crate::models::email::{DbEmail, EmailType};
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

const EMAIL_COLUMNS: &str = "id, user_id, is_read, sender_email, sender_name, subject, preview, body, email_type, attachments, message_id, timestamp, created_at, updated_at";

/// Insert payload for one mailbox entry.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub user_id: i64,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub preview: String,
    pub body: String,
    pub email_type: EmailType,
    pub attachment_urls: Vec<String>,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn count_inbox<'e, E>(db: E, user_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT COUNT(*) FROM emails WHERE user_id = ? AND email_type = ?")
        .bind(user_id)
        .bind(EmailType::Inbox.as_str())
        .fetch_one(db)
        .await
}

/// Oldest inbox entry by creation time; ties go to the lowest id.
pub async fn oldest_inbox_id<'e, E>(db: E, user_id: i64) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        "SELECT id FROM emails WHERE user_id = ? AND email_type = ? ORDER BY created_at ASC, id ASC LIMIT 1",
    )
    .bind(user_id)
    .bind(EmailType::Inbox.as_str())
    .fetch_optional(db)
    .await
}

pub async fn delete_by_id<'e, E>(db: E, id: i64) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query("DELETE FROM emails WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

pub async fn exists_for_user<'e, E>(db: E, user_id: i64, message_id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM emails WHERE user_id = ? AND message_id = ? LIMIT 1")
            .bind(user_id)
            .bind(message_id)
            .fetch_optional(db)
            .await?;
    Ok(found.is_some())
}

pub async fn insert<'e, E>(db: E, email: &NewEmail) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let attachments =
        serde_json::to_string(&email.attachment_urls).unwrap_or_else(|_| "[]".to_string());
    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO emails (user_id, is_read, sender_email, sender_name, subject, preview, body, email_type, attachments, message_id, timestamp, created_at, updated_at) VALUES (?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(email.user_id)
    .bind(&email.sender_email)
    .bind(&email.sender_name)
    .bind(&email.subject)
    .bind(&email.preview)
    .bind(&email.body)
    .bind(email.email_type.as_str())
    .bind(attachments)
    .bind(&email.message_id)
    .bind(email.timestamp)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Newest first by send time.
pub async fn list_inbox(db: &SqlitePool, user_id: i64, limit: i64) -> Result<Vec<DbEmail>, sqlx::Error> {
    let sql = format!(
        "SELECT {EMAIL_COLUMNS} FROM emails WHERE user_id = ? AND email_type = ? ORDER BY timestamp DESC, id DESC LIMIT ?"
    );
    sqlx::query_as::<_, DbEmail>(&sql)
        .bind(user_id)
        .bind(EmailType::Inbox.as_str())
        .bind(limit)
        .fetch_all(db)
        .await
}

pub async fn get(db: &SqlitePool, id: i64) -> Result<Option<DbEmail>, sqlx::Error> {
    let sql = format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ? AND email_type = ?");
    sqlx::query_as::<_, DbEmail>(&sql)
        .bind(id)
        .bind(EmailType::Inbox.as_str())
        .fetch_optional(db)
        .await
}

pub async fn mark_read(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE emails SET is_read = 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
