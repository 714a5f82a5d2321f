//! Maps an envelope's primary recipient to a registered account.

use crate::{
    db::accounts,
    error::{IngestError, IngestResult},
    models::email::ParsedMessage,
    util::with_timeout,
};
use sqlx::SqlitePool;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub account_id: i64,
    pub address: String,
}

pub async fn resolve_address(
    db: &SqlitePool,
    timeout: Duration,
    address: &str,
) -> IngestResult<Recipient> {
    let found = with_timeout(timeout, "account lookup", accounts::find_id_by_email(db, address)).await?;
    match found {
        Some(account_id) => Ok(Recipient {
            account_id,
            address: address.trim().to_ascii_lowercase(),
        }),
        None => Err(IngestError::UnknownRecipient(address.to_string())),
    }
}

/// Only the first `To` address is considered.
pub async fn resolve_recipient(
    db: &SqlitePool,
    timeout: Duration,
    message: &ParsedMessage,
) -> IngestResult<Recipient> {
    let address = message
        .primary_recipient()
        .map(|a| a.address.as_str())
        .filter(|a| a.contains('@'))
        .ok_or(IngestError::NoRecipient)?;
    resolve_address(db, timeout, address).await
}
