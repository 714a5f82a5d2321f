//! Per-object outcomes and per-run statistics of an ingestion pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Terminal state reached by one listed raw object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectOutcome {
    /// Parsed, persisted, source deleted.
    Persisted,
    /// Copied into the staging table, source deleted.
    Staged,
    /// Already present for the account; source deleted.
    Duplicate,
    SkippedNoKey,
    /// Zero-byte object (folder markers); left in place.
    SkippedEmpty,
    SkippedFetchFailure,
    SkippedParseFailure,
    /// Moved under the quarantine prefix after repeated parse failures.
    Quarantined,
    /// No matching account; source deleted.
    SkippedUnresolved,
    SkippedPersistFailure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub total_emails: u64,
    pub new_emails: u64,
    pub skipped_emails: u64,
    pub failed_emails: u64,
}

impl SyncStats {
    pub fn record(&mut self, outcome: ObjectOutcome) {
        self.total_emails += 1;
        match outcome {
            ObjectOutcome::Persisted | ObjectOutcome::Staged => self.new_emails += 1,
            ObjectOutcome::Duplicate
            | ObjectOutcome::SkippedNoKey
            | ObjectOutcome::SkippedEmpty
            | ObjectOutcome::SkippedUnresolved
            | ObjectOutcome::Quarantined => self.skipped_emails += 1,
            ObjectOutcome::SkippedFetchFailure
            | ObjectOutcome::SkippedParseFailure
            | ObjectOutcome::SkippedPersistFailure => self.failed_emails += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: SyncStats,
    pub outcomes: BTreeMap<ObjectOutcome, u64>,
    /// Staged rows turned into mailbox entries during this run.
    pub staged_processed: u64,
    /// The pass returned early because a stop was requested.
    pub interrupted: bool,
    /// Run-level failure (listing the bucket); per-object failures only show up in `outcomes`.
    pub error: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            stats: SyncStats::default(),
            outcomes: BTreeMap::new(),
            staged_processed: 0,
            interrupted: false,
            error: None,
        }
    }

    pub fn record(&mut self, outcome: ObjectOutcome) {
        self.stats.record(outcome);
        *self.outcomes.entry(outcome).or_default() += 1;
    }

    pub fn count(&self, outcome: ObjectOutcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
