pub mod api;
pub mod webhooks;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;

use crate::handlers::api::health_check;
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Public, webhook and protected routes combined, with state applied
///
/// Cross-cutting layers (CORS, rate limiting, security headers) are added by
/// the binary.
pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    let protected_routes = api::create_api_router().layer(middleware::from_fn_with_state(
        app_state.clone(),
        auth_middleware,
    ));

    let public_routes = Router::new().route("/", get(health_check));

    public_routes
        .merge(webhooks::create_webhook_router())
        .merge(protected_routes)
        .with_state(app_state)
}
