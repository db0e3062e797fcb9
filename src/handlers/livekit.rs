//! LiveKit webhook handler
//!
//! Room and participant events keep the call router in sync with LiveKit. The
//! first telephony participant in a caller room gets a switchboard session.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::session::{SessionRequest, SessionRole};
use crate::core::transfer::is_consultation_room;
use crate::errors::app_error::AppError;
use crate::livekit::{LiveKitError, WebhookAction};
use crate::state::AppState;

/// `POST /livekit/webhook`
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let action = match state.webhooks.verify(&body, authorization) {
        Ok(action) => action,
        Err(LiveKitError::NotConfigured(message)) => {
            return AppError::NotConfigured(message).into_response();
        }
        Err(e) => {
            warn!(error = %e, "Rejected LiveKit webhook");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Invalid webhook signature",
                    "code": "INVALID_SIGNATURE",
                })),
            )
                .into_response();
        }
    };

    apply_webhook_action(&state, action).await;
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Apply a verified webhook event to the router
pub async fn apply_webhook_action(state: &Arc<AppState>, action: WebhookAction) {
    match action {
        WebhookAction::ParticipantJoined {
            room_name,
            participant,
        } => {
            state
                .router
                .handle_participant_joined(&room_name, &participant);

            let needs_session = state.router.is_telephony_participant(&participant)
                && !is_consultation_room(&room_name)
                && state.router.session(&room_name).is_none();
            if needs_session {
                start_switchboard_session(state, &room_name).await;
            }
        }
        WebhookAction::ParticipantLeft {
            room_name,
            identity,
        } => {
            state.router.handle_participant_left(&room_name, &identity);
        }
        WebhookAction::RoomFinished { room_name } => {
            let session = state
                .router
                .finish_room(&room_name)
                .and_then(|record| record.session);
            if let Some(session) = session {
                if let Err(e) = session.close().await {
                    warn!(room_name = %room_name, error = %e, "Failed to close session of finished room");
                }
            }
        }
        WebhookAction::Ignored(event) => {
            debug!(event = %event, "Ignoring LiveKit webhook event");
        }
    }
}

/// Launch the switchboard agent into a caller room and greet the caller
async fn start_switchboard_session(state: &Arc<AppState>, room_name: &str) {
    let caller = state.router.caller_info(room_name).unwrap_or_default();
    let request = SessionRequest {
        room_name: room_name.to_string(),
        role: SessionRole::Switchboard,
        metadata: json!({
            "caller_phone": caller.phone,
            "caller_name": caller.display_name,
        }),
    };

    let session = match state.launcher.launch(request).await {
        Ok(session) => session,
        Err(e) => {
            error!(room_name = %room_name, error = %e, "Failed to launch switchboard session");
            return;
        }
    };

    if !state.router.attach_session(room_name, session.clone()) {
        if let Err(e) = session.close().await {
            warn!(room_name = %room_name, error = %e, "Failed to close unattached session");
        }
        return;
    }
    info!(room_name = %room_name, "Switchboard session started");

    let greeting = state.switchboard.greeting(room_name).await;
    if let Err(e) = session.say(&greeting).await {
        warn!(room_name = %room_name, error = %e, "Failed to deliver greeting");
    }
}
