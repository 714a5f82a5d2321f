//! Mailbox read and admin endpoints.

use super::auth::Caller;
use crate::{
  app::AppState,
  db,
  models::{account::Capability, email::api_email::ApiEmail},
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, warn};

/// Caller's inbox, newest first. Staged mail for the caller is processed first.
pub async fn list_my_emails(State(state): State<AppState>, caller: Caller) -> impl IntoResponse {
  if let Err(rejection) = caller.require(Capability::ReadOwnMailbox) {
    return rejection.into_response();
  }
  inbox_response(&state, caller.account.id, &caller.account.email).await
}

/// Admin view of any account's inbox.
pub async fn list_user_emails(
  State(state): State<AppState>,
  caller: Caller,
  Path(user_id): Path<i64>,
) -> impl IntoResponse {
  if let Err(rejection) = caller.require(Capability::ReadAnyMailbox) {
    return rejection.into_response();
  }
  match db::accounts::find_by_id(&state.db, user_id).await {
    Ok(Some(account)) => inbox_response(&state, account.id, &account.email).await,
    Ok(None) => (StatusCode::NOT_FOUND, "account not found").into_response(),
    Err(e) => {
      error!("account lookup error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

async fn inbox_response(state: &AppState, user_id: i64, address: &str) -> axum::response::Response {
  if let Err(e) = state.ingestor.process_staged(address).await {
    warn!("staged mail of {address} not processed: {e}");
  }
  match db::emails::list_inbox(&state.db, user_id, state.config.ingest.retention_cap).await {
    Ok(rows) => {
      let now = Utc::now();
      let emails: Vec<ApiEmail> = rows.into_iter().map(|r| ApiEmail::from_row(r, now)).collect();
      Json(emails).into_response()
    }
    Err(e) => {
      error!("list_inbox error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}

/// One email. Opening your own email marks it read.
pub async fn get_email(
  State(state): State<AppState>,
  caller: Caller,
  Path(id): Path<i64>,
) -> impl IntoResponse {
  let row = match db::emails::get(&state.db, id).await {
    Ok(Some(row)) => row,
    Ok(None) => return (StatusCode::NOT_FOUND, "email not found").into_response(),
    Err(e) => {
      error!("get_email error: {e}");
      return (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response();
    }
  };

  let owner = row.user_id == caller.account.id;
  if !owner && !caller.account.role.can(Capability::ReadAnyMailbox) {
    return (StatusCode::NOT_FOUND, "email not found").into_response();
  }

  let mut email = ApiEmail::from(row);
  if owner && !email.is_read {
    match db::emails::mark_read(&state.db, id).await {
      Ok(()) => email.is_read = true,
      Err(e) => warn!("mark_read {id} failed: {e}"),
    }
  }
  Json(email).into_response()
}

pub async fn delete_email(
  State(state): State<AppState>,
  caller: Caller,
  Path(id): Path<i64>,
) -> impl IntoResponse {
  if let Err(rejection) = caller.require(Capability::DeleteEmail) {
    return rejection.into_response();
  }
  match db::emails::delete_by_id(&state.db, id).await {
    Ok(0) => (StatusCode::NOT_FOUND, "email not found").into_response(),
    Ok(_) => StatusCode::NO_CONTENT.into_response(),
    Err(e) => {
      error!("delete_email error: {e}");
      (StatusCode::INTERNAL_SERVER_ERROR, "db error").into_response()
    }
  }
}
