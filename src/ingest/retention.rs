//! Per-account inbox cap, enforced right before each insert.

use crate::db::{emails, emails::NewEmail, staging};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted { id: i64, evicted: Option<i64> },
    /// The account already holds this provider message id.
    Duplicate,
}

/// Evict the single oldest inbox entry when one more insert would exceed `cap`.
pub async fn enforce_retention(
    conn: &mut SqliteConnection,
    user_id: i64,
    cap: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let count = emails::count_inbox(&mut *conn, user_id).await?;
    if count < cap {
        return Ok(None);
    }
    let Some(oldest) = emails::oldest_inbox_id(&mut *conn, user_id).await? else {
        return Ok(None);
    };
    emails::delete_by_id(&mut *conn, oldest).await?;
    info!("evicted email {oldest} of account {user_id} ({count} >= {cap})");
    Ok(Some(oldest))
}

/// Duplicate check, eviction, insert (and removal of the staged source row) in one transaction.
pub async fn persist_with_retention(
    db: &SqlitePool,
    email: &NewEmail,
    cap: i64,
    staged_row: Option<i64>,
) -> Result<PersistOutcome, sqlx::Error> {
    let mut tx = db.begin().await?;

    if emails::exists_for_user(&mut *tx, email.user_id, &email.message_id).await? {
        if let Some(row) = staged_row {
            staging::delete(&mut *tx, row).await?;
        }
        tx.commit().await?;
        return Ok(PersistOutcome::Duplicate);
    }

    let evicted = enforce_retention(&mut tx, email.user_id, cap).await?;
    let id = emails::insert(&mut *tx, email).await?;
    if let Some(row) = staged_row {
        staging::delete(&mut *tx, row).await?;
    }
    tx.commit().await?;
    Ok(PersistOutcome::Inserted { id, evicted })
}
