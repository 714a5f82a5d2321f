pub mod sync_stats;

pub use sync_stats::{ObjectOutcome, RunReport, SyncStats};
