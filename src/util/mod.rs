//! Utility functions: tracing, object-key sanitising, call timeouts.

use crate::error::{IngestError, IngestResult};
use std::{future::Future, time::Duration};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize pretty CLI logging.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt()
    .with_env_filter(filter)
    .with_target(false)
    .pretty()
    .init();
}

/// Run an external call under a deadline; an elapsed deadline becomes `TransientIOTimeout`.
pub async fn with_timeout<T, E, F>(limit: Duration, what: &str, fut: F) -> IngestResult<T>
where
  F: Future<Output = Result<T, E>>,
  E: Into<IngestError>,
{
  match tokio::time::timeout(limit, fut).await {
    Ok(res) => res.map_err(Into::into),
    Err(_) => Err(IngestError::TransientIOTimeout(what.to_string())),
  }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
pub fn sanitize_path_component(input: &str) -> String {
  let out: String = input
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect();
  // ".." must never survive as a whole component
  if out.is_empty() || out.chars().all(|c| c == '.') {
    "unknown".to_string()
  } else {
    out
  }
}

/// Same as [`sanitize_path_component`] but keeps `/` separators, dropping empty segments.
pub fn sanitize_slash_path(input: &str) -> String {
  let out = input
    .split('/')
    .filter(|s| !s.is_empty())
    .map(sanitize_path_component)
    .collect::<Vec<_>>()
    .join("/");
  if out.is_empty() { "unknown".to_string() } else { out }
}
