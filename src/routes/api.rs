use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, agents};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router with protected routes
///
/// Note: Authentication middleware is applied by [`super::create_app_router`]
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Agent tools, called by the external voice worker
        .route("/agent/switchboard/tools", get(agents::switchboard_tools))
        .route(
            "/agent/switchboard/tools/{name}",
            post(agents::call_switchboard_tool),
        )
        .route(
            "/agent/switchboard/greeting/{room_name}",
            get(agents::switchboard_greeting),
        )
        .route("/agent/consultation/tools", get(agents::consultation_tools))
        .route(
            "/agent/consultation/tools/{name}",
            post(agents::call_consultation_tool),
        )
        // Inspection
        .route("/rooms", get(admin::list_rooms))
        .route("/rooms/stats", get(admin::room_stats))
        .route("/rooms/{room_name}", get(admin::get_room))
        .route("/transfers", get(admin::list_transfers))
        .route("/transfers/{transfer_id}", get(admin::get_transfer))
        .layer(TraceLayer::new_for_http())
}
