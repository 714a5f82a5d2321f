//! Run log API.

use super::auth::Caller;
use crate::{app::AppState, db, models::account::Capability};
use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
  pub limit: Option<i64>,
}

pub async fn list_logs(
  State(state): State<AppState>,
  caller: Caller,
  Query(params): Query<LogParams>,
) -> impl IntoResponse {
  if let Err(rejection) = caller.require(Capability::ReadAnyMailbox) {
    return rejection.into_response();
  }
  let limit = params.limit.unwrap_or(200).clamp(1, 1000);
  match db::logs::recent(&state.db, limit).await {
    Ok(logs) => Json(logs).into_response(),
    Err(e) => {
      error!("list_logs error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}
