//! Inbound pipeline: raw objects in the bucket become mailbox rows.
//!
//! One pass walks the listing page by page. Every object ends in exactly one
//! [`ObjectOutcome`]; a failure local to one object never ends the pass.

pub mod attachments;
pub mod recipient;
pub mod retention;
pub mod scheduler;
pub mod staged;

pub use scheduler::{Scheduler, SchedulerHandle};

use crate::{
    app::config::{IngestConfig, SyncMode},
    db,
    error::IngestError,
    mail,
    models::{
        email::{EmailType, ParsedMessage},
        sync::{ObjectOutcome, RunReport},
    },
    storage::ObjectStore,
    util::with_timeout,
};
use chrono::Utc;
use recipient::Recipient;
use retention::PersistOutcome;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{Level, debug, error, info, instrument, warn};

/// A fetched object that parsed and has a deliverable recipient.
struct Accepted {
    raw: Vec<u8>,
    message: ParsedMessage,
    recipient: Recipient,
}

pub struct Ingestor {
    db: SqlitePool,
    store: Arc<dyn ObjectStore>,
    config: IngestConfig,
    // passes never interleave inside one process
    run_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(db: SqlitePool, store: Arc<dyn ObjectStore>, config: IngestConfig) -> Self {
        Self {
            db,
            store,
            config,
            run_lock: Mutex::new(()),
        }
    }

    /// One complete pass that cannot be stopped early.
    pub async fn run_once(&self) -> RunReport {
        let (_stop_tx, stop) = watch::channel(false);
        self.run(&stop).await
    }

    /// One pass over the bucket. `stop` is checked between objects.
    pub async fn run(&self, stop: &watch::Receiver<bool>) -> RunReport {
        let _guard = self.run_lock.lock().await;
        let mut report = RunReport::new();
        let run_id = report.run_id.to_string();
        let mut token = None;

        'pages: loop {
            let listing = self
                .store
                .list_page(&self.config.prefix, token.take(), self.config.page_size);
            let page = match with_timeout(self.config.call_timeout, "object listing", listing).await {
                Ok(page) => page,
                Err(e) => {
                    self.note(Level::ERROR, &run_id, format!("listing {:?} failed: {e}", self.config.prefix))
                        .await;
                    report.error = Some(e.to_string());
                    break;
                }
            };

            for key in &page.keys {
                if *stop.borrow() {
                    report.interrupted = true;
                    break 'pages;
                }
                if self.is_internal_key(key) {
                    continue;
                }
                let outcome = match self.config.mode {
                    SyncMode::Eager => self.process_object(key, &run_id).await,
                    SyncMode::Staged => self.stage_object(key, &run_id).await,
                };
                report.record(outcome);
            }

            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        if self.config.mode == SyncMode::Staged && !report.interrupted {
            report.staged_processed = self.process_all_staged(&run_id).await;
        }

        report.finished_at = Utc::now();
        let stats = &report.stats;
        let level = if report.error.is_some() { Level::ERROR } else { Level::INFO };
        self.note(
            level,
            &run_id,
            format!(
                "sync finished: total={} new={} skipped={} failed={} staged_processed={}{}",
                stats.total_emails,
                stats.new_emails,
                stats.skipped_emails,
                stats.failed_emails,
                report.staged_processed,
                if report.interrupted { " (stopped early)" } else { "" }
            ),
        )
        .await;
        report
    }

    /// Relocated attachments and quarantined objects share the bucket with inbound mail.
    fn is_internal_key(&self, key: &str) -> bool {
        let attachments = self.config.attachment_prefix.trim_matches('/');
        let in_attachments = !attachments.is_empty()
            && key.strip_prefix(attachments).is_some_and(|rest| rest.starts_with('/'));
        let in_quarantine =
            !self.config.quarantine_prefix.is_empty() && key.starts_with(&self.config.quarantine_prefix);
        in_attachments || in_quarantine
    }

    /// Single-phase path: fetch, parse, resolve, persist, delete source.
    #[instrument(skip(self, run_id))]
    async fn process_object(&self, key: &str, run_id: &str) -> ObjectOutcome {
        let accepted = match self.accept(key, run_id).await {
            Ok(accepted) => accepted,
            Err(outcome) => return outcome,
        };
        let Accepted {
            message, recipient, ..
        } = accepted;

        match self.persist(key, &message, &recipient, None).await {
            Ok(PersistOutcome::Inserted { id, .. }) => {
                info!("stored email {id} for {}", recipient.address);
                self.delete_source(key, run_id).await;
                ObjectOutcome::Persisted
            }
            Ok(PersistOutcome::Duplicate) => {
                debug!("{key} already stored for {}", recipient.address);
                self.delete_source(key, run_id).await;
                ObjectOutcome::Duplicate
            }
            Err(e) => {
                self.note(Level::ERROR, run_id, format!("{key}: persist failed, keeping source: {e}"))
                    .await;
                ObjectOutcome::SkippedPersistFailure
            }
        }
    }

    /// Shared front half of both sync modes. `Err` carries the terminal outcome.
    async fn accept(&self, key: &str, run_id: &str) -> Result<Accepted, ObjectOutcome> {
        if key.is_empty() {
            return Err(ObjectOutcome::SkippedNoKey);
        }

        let raw = match with_timeout(self.config.call_timeout, "object fetch", self.store.get(key)).await {
            Ok(raw) => raw,
            Err(e) => {
                self.note(Level::WARN, run_id, format!("{key}: fetch failed: {e}")).await;
                return Err(ObjectOutcome::SkippedFetchFailure);
            }
        };
        if raw.is_empty() {
            debug!("{key} is empty, skipping");
            return Err(ObjectOutcome::SkippedEmpty);
        }

        let message = match mail::parse_message(&raw) {
            Ok(message) => message,
            Err(e) => return Err(self.parse_failed(key, &raw, &e, run_id).await),
        };
        self.forget_parse_failures(key).await;

        match recipient::resolve_recipient(&self.db, self.config.call_timeout, &message).await {
            Ok(recipient) => Ok(Accepted {
                raw,
                message,
                recipient,
            }),
            Err(e) if e.is_undeliverable() => {
                self.note(Level::WARN, run_id, format!("{key}: {e}, dropping")).await;
                self.delete_source(key, run_id).await;
                Err(ObjectOutcome::SkippedUnresolved)
            }
            Err(e) => {
                self.note(Level::ERROR, run_id, format!("{key}: recipient lookup failed: {e}"))
                    .await;
                Err(ObjectOutcome::SkippedPersistFailure)
            }
        }
    }

    /// Relocate attachments, build the row, then evict-and-insert atomically.
    async fn persist(
        &self,
        message_id: &str,
        message: &ParsedMessage,
        recipient: &Recipient,
        staged_row: Option<i64>,
    ) -> Result<PersistOutcome, IngestError> {
        let attachment_urls = attachments::relocate_attachments(
            self.store.as_ref(),
            self.config.call_timeout,
            &self.config.attachment_prefix,
            message_id,
            &message.attachments,
        )
        .await;

        let (sender_email, sender_name) = message
            .sender()
            .map(|s| (s.address.clone(), s.name.clone()))
            .unwrap_or_default();
        let email = db::emails::NewEmail {
            user_id: recipient.account_id,
            sender_email,
            sender_name,
            subject: message.subject.clone(),
            preview: mail::generate_preview(&message.text_body, &message.html_body),
            body: message.full_body().to_string(),
            email_type: EmailType::Inbox,
            attachment_urls,
            message_id: message_id.to_string(),
            timestamp: message.date,
        };

        with_timeout(
            self.config.call_timeout,
            "mailbox insert",
            retention::persist_with_retention(&self.db, &email, self.config.retention_cap, staged_row),
        )
        .await
    }

    /// Count the failure; past the attempt bound, move the object under the quarantine prefix.
    async fn parse_failed(&self, key: &str, raw: &[u8], err: &IngestError, run_id: &str) -> ObjectOutcome {
        self.note(Level::WARN, run_id, format!("{key}: {err}")).await;
        let max = self.config.max_parse_attempts;
        if max <= 0 {
            return ObjectOutcome::SkippedParseFailure;
        }

        let attempts = match with_timeout(
            self.config.call_timeout,
            "parse failure bookkeeping",
            db::failures::record(&self.db, key, &err.to_string()),
        )
        .await
        {
            Ok(n) => n,
            Err(e) => {
                warn!("could not record parse failure of {key}: {e}");
                return ObjectOutcome::SkippedParseFailure;
            }
        };
        if attempts < max {
            return ObjectOutcome::SkippedParseFailure;
        }

        let target = format!("{}{key}", self.config.quarantine_prefix);
        let moved = with_timeout(
            self.config.call_timeout,
            "quarantine upload",
            self.store.put(&target, raw, "message/rfc822"),
        )
        .await;
        if let Err(e) = moved {
            warn!("could not quarantine {key}: {e}");
            return ObjectOutcome::SkippedParseFailure;
        }
        if let Err(e) = with_timeout(self.config.call_timeout, "source delete", self.store.delete(key)).await {
            warn!("quarantined {key} but could not delete it: {e}");
            return ObjectOutcome::SkippedParseFailure;
        }
        self.forget_parse_failures(key).await;
        self.note(
            Level::WARN,
            run_id,
            format!("{key}: quarantined to {target} after {attempts} failed parses"),
        )
        .await;
        ObjectOutcome::Quarantined
    }

    async fn forget_parse_failures(&self, key: &str) {
        if self.config.max_parse_attempts <= 0 {
            return;
        }
        let cleared = with_timeout(
            self.config.call_timeout,
            "parse failure bookkeeping",
            db::failures::clear(&self.db, key),
        )
        .await;
        if let Err(e) = cleared {
            debug!("could not clear parse failures of {key}: {e}");
        }
    }

    /// A failed delete is only logged: the next pass sees the object again and treats it as a duplicate.
    async fn delete_source(&self, key: &str, run_id: &str) {
        if let Err(e) = with_timeout(self.config.call_timeout, "source delete", self.store.delete(key)).await {
            self.note(Level::WARN, run_id, format!("{key}: source delete failed: {e}")).await;
        }
    }

    /// Log through tracing and append to the `logs` table.
    async fn note(&self, level: Level, run_id: &str, message: String) {
        let label = if level == Level::ERROR {
            error!(%run_id, "{message}");
            "error"
        } else if level == Level::WARN {
            warn!(%run_id, "{message}");
            "warn"
        } else {
            info!(%run_id, "{message}");
            "info"
        };
        let appended = with_timeout(
            self.config.call_timeout,
            "log append",
            db::logs::append(&self.db, label, Some(run_id), &message),
        )
        .await;
        if let Err(e) = appended {
            warn!("could not write run log: {e}");
        }
    }
}
