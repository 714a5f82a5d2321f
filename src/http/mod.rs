//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod emails;
pub mod logs;
pub mod sync;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/emails", get(emails::list_my_emails))
        .route(
            "/emails/:id",
            get(emails::get_email).delete(emails::delete_email),
        )
        .route("/users/:id/emails", get(emails::list_user_emails))
        .route("/sync", post(sync::trigger_sync))
        .route("/logs", get(logs::list_logs))
        .with_state(state)
}
