//! Read-only inspection of rooms and transfer attempts

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::core::router::{RoomSnapshot, RoomStats};
use crate::core::transfer::TransferAttempt;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// `GET /rooms`
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSnapshot>> {
    Json(state.router.rooms())
}

/// `GET /rooms/stats`
pub async fn room_stats(State(state): State<Arc<AppState>>) -> Json<RoomStats> {
    Json(state.router.stats())
}

/// `GET /rooms/{name}`
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> AppResult<Json<RoomSnapshot>> {
    state
        .router
        .room(&room_name)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Room {room_name}")))
}

/// `GET /transfers`
pub async fn list_transfers(State(state): State<Arc<AppState>>) -> Json<Vec<TransferAttempt>> {
    Json(state.transfers.attempts())
}

/// `GET /transfers/{id}`
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(transfer_id): Path<String>,
) -> AppResult<Json<TransferAttempt>> {
    state
        .transfers
        .attempt(&transfer_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Transfer {transfer_id}")))
}
