//! Caller identification. The upstream gateway authenticates the request and
//! forwards the account id in `X-User-Id`.

use crate::{
  app::AppState,
  db,
  models::account::{Account, Capability},
};
use axum::{
  async_trait,
  extract::FromRequestParts,
  http::{StatusCode, request::Parts},
};
use tracing::error;

pub const CALLER_HEADER: &str = "x-user-id";

pub type AuthRejection = (StatusCode, &'static str);

#[derive(Debug, Clone)]
pub struct Caller {
  pub account: Account,
}

impl Caller {
  pub fn require(&self, capability: Capability) -> Result<(), AuthRejection> {
    if self.account.role.can(capability) {
      Ok(())
    } else {
      Err((StatusCode::FORBIDDEN, "not allowed"))
    }
  }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
  type Rejection = AuthRejection;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(CALLER_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<i64>().ok())
      .ok_or((StatusCode::UNAUTHORIZED, "missing or invalid X-User-Id"))?;

    match db::accounts::find_by_id(&state.db, id).await {
      Ok(Some(account)) => Ok(Caller { account }),
      Ok(None) => Err((StatusCode::UNAUTHORIZED, "unknown account")),
      Err(e) => {
        error!("caller lookup error: {e}");
        Err((StatusCode::INTERNAL_SERVER_ERROR, "db error"))
      }
    }
  }
}
