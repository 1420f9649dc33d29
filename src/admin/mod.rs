//! Administrative API.
//!
//! Read-only status and membership views plus a forced regeneration, all
//! behind a bearer token.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/groups", get(get_groups))
        .route("/admin/regenerate", post(regenerate_group))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
