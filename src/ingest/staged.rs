//! Two-phase sync. Phase one copies each deliverable raw object into
//! `incoming_emails` and removes it from the bucket; phase two turns the staged
//! rows of one account into mailbox entries.

use super::{Accepted, Ingestor, recipient, retention::PersistOutcome};
use crate::{
    db::{self, staging::StagedEmail},
    error::IngestResult,
    mail,
    models::sync::ObjectOutcome,
    util::with_timeout,
};
use tracing::{Level, debug, info, instrument, warn};

impl Ingestor {
    #[instrument(skip(self, run_id))]
    pub(super) async fn stage_object(&self, key: &str, run_id: &str) -> ObjectOutcome {
        let Accepted {
            raw,
            message,
            recipient,
        } = match self.accept(key, run_id).await {
            Ok(accepted) => accepted,
            Err(outcome) => return outcome,
        };

        let staged = with_timeout(
            self.config.call_timeout,
            "staging insert",
            db::staging::stage(&self.db, &recipient.address, key, &raw, message.date),
        )
        .await;
        match staged {
            Ok(true) => {
                self.delete_source(key, run_id).await;
                ObjectOutcome::Staged
            }
            Ok(false) => {
                debug!("{key} was already staged");
                self.delete_source(key, run_id).await;
                ObjectOutcome::Duplicate
            }
            Err(e) => {
                self.note(Level::ERROR, run_id, format!("{key}: staging failed, keeping source: {e}"))
                    .await;
                ObjectOutcome::SkippedPersistFailure
            }
        }
    }

    /// Drain every account that has staged rows; returns how many rows became mailbox entries.
    pub(super) async fn process_all_staged(&self, run_id: &str) -> u64 {
        let recipients = match with_timeout(
            self.config.call_timeout,
            "staging scan",
            db::staging::pending_recipients(&self.db),
        )
        .await
        {
            Ok(recipients) => recipients,
            Err(e) => {
                self.note(Level::ERROR, run_id, format!("staging scan failed: {e}")).await;
                return 0;
            }
        };

        let mut processed = 0;
        for address in recipients {
            match self.process_staged(&address).await {
                Ok(n) => processed += n,
                Err(e) => {
                    self.note(Level::ERROR, run_id, format!("staged mail of {address}: {e}")).await;
                }
            }
        }
        processed
    }

    /// Phase two for one account, oldest staged row first. Each row is inserted
    /// and removed from staging in the same transaction as its retention check.
    pub async fn process_staged(&self, address: &str) -> IngestResult<u64> {
        let recipient = match recipient::resolve_address(&self.db, self.config.call_timeout, address).await {
            Ok(recipient) => recipient,
            Err(e) if e.is_undeliverable() => {
                // account removed after its mail was staged; rows stay for an operator
                warn!("staged mail waits for unknown account {address}");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let rows = with_timeout(
            self.config.call_timeout,
            "staging fetch",
            db::staging::pending_for(&self.db, &recipient.address),
        )
        .await?;

        let mut processed = 0;
        for row in rows {
            let message = match mail::parse_message(&row.email_data) {
                Ok(message) => message,
                Err(e) => {
                    warn!("staged row {} ({}) no longer parses: {e}", row.id, row.message_id);
                    self.drop_unparsable(&row).await;
                    continue;
                }
            };
            match self.persist(&row.message_id, &message, &recipient, Some(row.id)).await {
                Ok(PersistOutcome::Inserted { id, .. }) => {
                    info!("stored staged {} as email {id} for {address}", row.message_id);
                    processed += 1;
                }
                Ok(PersistOutcome::Duplicate) => {
                    debug!("staged {} already stored for {address}", row.message_id)
                }
                Err(e) => warn!("staged row {} left for retry: {e}", row.id),
            }
        }
        Ok(processed)
    }

    /// The stored bytes never change, so a row that fails to parse is moved
    /// under the quarantine prefix (when set) and removed from staging.
    async fn drop_unparsable(&self, row: &StagedEmail) {
        let prefix = &self.config.quarantine_prefix;
        if !prefix.is_empty() {
            let target = format!("{prefix}{}", row.message_id);
            let moved = with_timeout(
                self.config.call_timeout,
                "quarantine upload",
                self.store.put(&target, &row.email_data, "message/rfc822"),
            )
            .await;
            if let Err(e) = moved {
                warn!("could not quarantine staged row {}: {e}", row.id);
                return;
            }
        }
        let removed = with_timeout(
            self.config.call_timeout,
            "staging delete",
            db::staging::delete(&self.db, row.id),
        )
        .await;
        match removed {
            Ok(()) => warn!("dropped unparsable staged row {} ({})", row.id, row.message_id),
            Err(e) => warn!("could not drop staged row {}: {e}", row.id),
        }
    }
}
