//! mailbucket library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration, shared state
//! - `ingest`: bucket-to-mailbox pipeline and its scheduler
//! - `mail`: MIME parsing and preview text
//! - `storage`: object store backends (S3, local directory, memory)
//! - `http`: Axum router and handlers
//! - `db`: migrations and SQLite helpers
//! - `models`: typed records used across layers
//! - `error`: ingestion failure taxonomy
//! - `util`: tracing, timeouts, key sanitising

pub mod app;
pub mod db;
pub mod error;
pub mod http;
pub mod ingest;
pub mod mail;
pub mod models;
pub mod storage;
pub mod util;
