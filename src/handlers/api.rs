use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// `GET /` health check with a short summary of the live registry
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.router.stats();
    Json(json!({
        "status": "OK",
        "rooms": stats.total_rooms,
        "transfers": state.transfers.attempts().len(),
    }))
}
