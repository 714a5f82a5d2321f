//! Database helpers: pool bootstrap, migrations and per-table queries.

use crate::app::config::DatabaseConfig;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

pub mod accounts;
pub mod emails;
pub mod failures;
pub mod logs;
pub mod staging;

/// Open the pool described by `config`, creating the SQLite file if needed, and migrate it.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let db_url = ensure_sqlite_path(&config.url);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect(&db_url)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run SQLite migrations to create tables if absent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            role_id INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS emails (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            sender_email TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            subject TEXT NOT NULL,
            preview TEXT NOT NULL,
            body TEXT NOT NULL,
            email_type TEXT NOT NULL,
            attachments TEXT NOT NULL DEFAULT '[]',
            message_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS emails_user_type_created ON emails (user_id, email_type, created_at, id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS incoming_emails (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email_send_to TEXT NOT NULL,
            message_id TEXT NOT NULL UNIQUE,
            email_data BLOB NOT NULL,
            email_date TEXT NOT NULL,
            created_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS parse_failures (
            object_key TEXT PRIMARY KEY,
            attempts INTEGER NOT NULL,
            last_error TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT NOT NULL,
            level TEXT NOT NULL,
            run_id TEXT NULL,
            message TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Ensure SQLite file and parent folder exist for a given sqlx URL.
pub fn ensure_sqlite_path(db_url: &str) -> String {
    if !db_url.starts_with("sqlite:") {
        return db_url.to_string();
    }
    let path_part = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path_only = path_part.split_once('?').map_or(path_part, |(p, _)| p);
    if path_only.is_empty() || path_only == ":memory:" || path_only.starts_with("file:") {
        return db_url.to_string();
    }
    let p = Path::new(path_only);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(p);
    db_url.to_string()
}
