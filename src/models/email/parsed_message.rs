//! Envelope data decoded from one raw inbound object.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub name: String,
    pub address: String,
}

impl EmailAddress {
    /// A missing display name falls back to the local part of the address.
    pub fn new(name: Option<String>, address: String) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| match address.split_once('@') {
                Some((local, _)) => local.to_string(),
                None => address.clone(),
            });
        Self { name, address }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedAttachment {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedMessage {
    pub from: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    /// Unix epoch when the Date header is missing or unparseable.
    pub date: DateTime<Utc>,
    pub text_body: String,
    pub html_body: String,
    pub attachments: Vec<ParsedAttachment>,
}

impl ParsedMessage {
    pub fn primary_recipient(&self) -> Option<&EmailAddress> {
        self.to.first()
    }

    pub fn sender(&self) -> Option<&EmailAddress> {
        self.from.first()
    }

    /// HTML wins over plain text for the persisted body.
    pub fn full_body(&self) -> &str {
        if self.html_body.is_empty() {
            &self.text_body
        } else {
            &self.html_body
        }
    }
}
