//! Database row for a stored mailbox entry.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailType {
    Inbox,
    Sent,
}

impl EmailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::Inbox => "inbox",
            EmailType::Sent => "sent",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbEmail {
    pub id: i64,
    pub user_id: i64,
    pub is_read: bool,
    pub sender_email: String,
    pub sender_name: String,
    pub subject: String,
    pub preview: String,
    pub body: String,
    pub email_type: String,
    /// JSON array of attachment URLs.
    pub attachments: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbEmail {
    pub fn attachment_urls(&self) -> Vec<String> {
        serde_json::from_str(&self.attachments).unwrap_or_default()
    }
}
