//! API representation of a stored email.

use super::db_email::DbEmail;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AttachmentLink {
  pub url: String,
  pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ApiEmail {
  pub id: i64,
  pub user_id: i64,
  pub is_read: bool,
  pub sender_email: String,
  pub sender_name: String,
  pub subject: String,
  pub preview: String,
  pub body: String,
  pub message_id: String,
  pub attachments: Vec<AttachmentLink>,
  pub timestamp: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
  pub relative_time: String,
}

impl ApiEmail {
  pub fn from_row(d: DbEmail, now: DateTime<Utc>) -> Self {
    let attachments = d
      .attachment_urls()
      .into_iter()
      .map(|url| AttachmentLink {
        filename: url.rsplit('/').next().unwrap_or_default().to_string(),
        url,
      })
      .collect();
    ApiEmail {
      relative_time: format_relative_time(d.timestamp, now),
      id: d.id,
      user_id: d.user_id,
      is_read: d.is_read,
      sender_email: d.sender_email,
      sender_name: d.sender_name,
      subject: d.subject,
      preview: d.preview,
      body: d.body,
      message_id: d.message_id,
      attachments,
      timestamp: d.timestamp,
      created_at: d.created_at,
    }
  }
}

impl From<DbEmail> for ApiEmail {
  fn from(d: DbEmail) -> Self {
    ApiEmail::from_row(d, Utc::now())
  }
}

/// Human label for list views: "Just now", "5 Minutes ago", "Yesterday", "02 Jan 2006".
pub fn format_relative_time(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let diff = now.signed_duration_since(t);
  let minutes = diff.num_minutes();
  let hours = diff.num_hours();
  match () {
    _ if minutes < 1 => "Just now".to_string(),
    _ if minutes == 1 => "1 Minute ago".to_string(),
    _ if hours < 1 => format!("{minutes} Minutes ago"),
    _ if hours == 1 => "1 Hour ago".to_string(),
    _ if hours < 24 => format!("{hours} Hours ago"),
    _ if hours < 48 => "Yesterday".to_string(),
    _ => t.format("%d %b %Y").to_string(),
  }
}
