//! Typed records shared by the storage, ingestion and HTTP layers.

pub mod account;
pub mod email;
pub mod log;
pub mod sync;
