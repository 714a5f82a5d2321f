//! On-demand ingestion pass.

use super::auth::Caller;
use crate::{app::AppState, models::account::Capability};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

/// Runs one pass and returns its report; waits if the scheduler is mid-pass.
pub async fn trigger_sync(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
  if let Err(rejection) = caller.require(Capability::TriggerSync) {
    return rejection.into_response();
  }
  info!("sync requested by {}", caller.account.email);
  let report = state.ingestor.run_once().await;
  let status = if report.error.is_some() {
    StatusCode::SERVICE_UNAVAILABLE
  } else {
    StatusCode::OK
  };
  (status, Json(report)).into_response()
}
