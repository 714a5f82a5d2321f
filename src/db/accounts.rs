//! `users` table: the core only reads it, except for CLI provisioning.

use crate::models::account::{Account, Role, account::DbAccount};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

/// Case-insensitive address lookup.
pub async fn find_id_by_email<'e, E>(db: E, email: &str) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT id FROM users WHERE lower(email) = lower(?) LIMIT 1")
        .bind(email.trim())
        .fetch_optional(db)
        .await
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Account>, sqlx::Error> {
    let row: Option<DbAccount> =
        sqlx::query_as("SELECT id, email, role_id, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(row.map(Account::from))
}

pub async fn create(db: &SqlitePool, email: &str, role: Role) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO users (email, role_id, created_at) VALUES (?, ?, ?)")
        .bind(email.trim().to_ascii_lowercase())
        .bind(role.id())
        .bind(Utc::now())
        .execute(db)
        .await?;
    Ok(res.last_insert_rowid())
}
