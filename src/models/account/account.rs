//! Registered mailbox owner.

use super::role::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DbAccount {
    pub id: i64,
    pub email: String,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<DbAccount> for Account {
    fn from(row: DbAccount) -> Self {
        Account {
            id: row.id,
            email: row.email,
            // unknown ids get the least privileged role
            role: Role::from_id(row.role_id).unwrap_or(Role::User),
            created_at: row.created_at,
        }
    }
}
