//! HTTP routes

pub mod admin;
pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{auth::require_auth, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/mrr", get(admin::get_mrr))
        .route(
            "/admin/accounts/{account_id}/venue-sync",
            post(admin::sync_account_venues),
        )
        .route("/admin/venue-sync", post(admin::sync_all_venues))
        .route_layer(middleware::from_fn_with_state(
            state.auth_state(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", admin_routes)
        .with_state(state)
}
