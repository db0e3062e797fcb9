//! Webhook routes
//!
//! These are public: Twilio and LiveKit cannot send our API secret. LiveKit
//! requests carry a signed token verified by the handler.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{livekit, twilio};
use crate::state::AppState;
use std::sync::Arc;

pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/twilio/voice", post(twilio::voice))
        .route("/twilio/voice-fallback", post(twilio::voice_fallback))
        .route("/twilio/status", post(twilio::status))
        .route("/twilio/sms", post(twilio::sms))
        .route("/twilio/sms-fallback", post(twilio::sms_fallback))
        .route("/twilio/recording", post(twilio::recording))
        .route("/twilio/health", get(twilio::health))
        .route("/livekit/webhook", post(livekit::webhook))
        .layer(TraceLayer::new_for_http())
}
