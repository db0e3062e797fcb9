//! Twilio webhook handlers
//!
//! Twilio posts form-encoded webhooks for inbound calls, call status changes,
//! inbound SMS and finished recordings. Voice and SMS endpoints answer with a
//! TwiML document; status and recording endpoints acknowledge with `OK`.
//!
//! None of these handlers fail: malformed requests and internal errors still
//! produce a valid TwiML response so the caller hears something sensible.

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::directory::CallLogEntry;
use crate::core::router::CallerInfo;
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::{MessagingResponse, VoiceResponse, normalize_phone_number, phone_digits, rfc3339_now};

const CALL_ERROR: &str =
    "I'm sorry, there was an error processing your call. Please try again later.";
const CONNECT_TROUBLE: &str =
    "I'm sorry, I'm having trouble connecting you right now. Please try again later.";
const SMS_ERROR: &str = "I'm sorry, there was an error processing your message.";
const SMS_FALLBACK: &str = "I'm sorry, I'm having trouble processing your message right now. Please try calling us instead.";
const SMS_ACK: &str = "Thank you for your message. I'll make sure it gets to the right person. For immediate assistance, please call us.";

/// Call statuses after which Twilio sends no further updates
const FINAL_CALL_STATUSES: &[&str] = &["completed", "busy", "no-answer", "failed", "canceled"];

// =============================================================================
// Webhook payloads
// =============================================================================

/// Voice and status webhook parameters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallWebhook {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub call_duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsWebhook {
    #[serde(default)]
    pub message_sid: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordingWebhook {
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub recording_sid: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub recording_status: Option<String>,
    #[serde(default)]
    pub recording_duration: Option<String>,
}

fn twiml(xml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        xml,
    )
        .into_response()
}

fn acknowledge() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], "OK").into_response()
}

fn caller_from_webhook(call: &CallWebhook) -> CallerInfo {
    let mut caller = CallerInfo::default();
    if let Some(phone) = call.from.as_deref().and_then(normalize_phone_number) {
        caller.caller_id = phone_digits(&phone);
        caller.phone = phone;
    }
    if let Some(call_sid) = &call.call_sid {
        caller
            .raw_sip_metadata
            .insert("call_sid".to_string(), call_sid.clone());
    }
    caller
}

// =============================================================================
// Voice
// =============================================================================

/// Register a fresh caller room and dial it over SIP
async fn route_inbound_call(state: &AppState, call: &CallWebhook) -> AppResult<String> {
    let sip_host = state
        .config
        .sip
        .sip_host
        .as_deref()
        .ok_or_else(|| AppError::NotConfigured("LIVEKIT_SIP_HOST".to_string()))?;

    let caller = caller_from_webhook(call);
    let room_name = state.router.create_unique_room_name(&caller);
    let caller_phone = caller.phone.clone();
    state.router.register_room(&room_name, caller, None);

    let entry = CallLogEntry {
        caller_phone: caller_phone.clone(),
        room_name: Some(room_name.clone()),
        status: "incoming".to_string(),
        outcome: Some(format!("Incoming call from {caller_phone}")),
        ..Default::default()
    };
    if let Err(e) = state.directory.log_call(&entry).await {
        warn!(room_name = %room_name, error = %e, "Failed to log incoming call");
    }

    info!(
        room_name = %room_name,
        call_sid = call.call_sid.as_deref().unwrap_or_default(),
        "Routing inbound call to LiveKit"
    );

    Ok(VoiceResponse::new()
        .dial_sip(&format!("sip:{room_name}@{sip_host}"))
        .say(CONNECT_TROUBLE)
        .to_xml())
}

/// `POST /twilio/voice`
pub async fn voice(
    State(state): State<Arc<AppState>>,
    form: Result<Form<CallWebhook>, FormRejection>,
) -> Response {
    let call = match form {
        Ok(Form(call)) => call,
        Err(e) => {
            warn!(error = %e, "Malformed voice webhook");
            return twiml(VoiceResponse::new().say(CALL_ERROR).to_xml());
        }
    };

    info!(
        call_sid = call.call_sid.as_deref().unwrap_or_default(),
        from = call.from.as_deref().unwrap_or_default(),
        to = call.to.as_deref().unwrap_or_default(),
        direction = call.direction.as_deref().unwrap_or_default(),
        "Incoming voice call"
    );

    match route_inbound_call(&state, &call).await {
        Ok(xml) => twiml(xml),
        Err(e) => {
            error!(error = %e, "Failed to route inbound call");
            twiml(VoiceResponse::new().say(CALL_ERROR).to_xml())
        }
    }
}

/// `POST /twilio/voice-fallback`
pub async fn voice_fallback(
    State(state): State<Arc<AppState>>,
    form: Result<Form<CallWebhook>, FormRejection>,
) -> Response {
    let call = form.map(|Form(call)| call).unwrap_or_default();
    let caller_phone = call.from.clone().unwrap_or_default();
    warn!(from = %caller_phone, "Voice webhook fallback triggered");

    let entry = CallLogEntry {
        caller_phone,
        status: "failed".to_string(),
        outcome: Some("Voice webhook fallback triggered".to_string()),
        ..Default::default()
    };
    if let Err(e) = state.directory.log_call(&entry).await {
        warn!(error = %e, "Failed to log voice fallback");
    }

    twiml(VoiceResponse::new().say(CONNECT_TROUBLE).to_xml())
}

/// `POST /twilio/status`
pub async fn status(
    State(state): State<Arc<AppState>>,
    form: Result<Form<CallWebhook>, FormRejection>,
) -> Response {
    let call = form.map(|Form(call)| call).unwrap_or_default();
    let call_status = call.call_status.clone().unwrap_or_default();

    info!(
        call_sid = call.call_sid.as_deref().unwrap_or_default(),
        call_status = %call_status,
        duration = call.call_duration.as_deref().unwrap_or_default(),
        "Call status update"
    );

    if FINAL_CALL_STATUSES.contains(&call_status.as_str()) {
        let entry = CallLogEntry {
            caller_phone: call.from.clone().unwrap_or_else(|| "Unknown".to_string()),
            status: if call_status == "completed" {
                "completed".to_string()
            } else {
                "failed".to_string()
            },
            outcome: Some(format!("Call ended with status: {call_status}")),
            ..Default::default()
        };
        if let Err(e) = state.directory.log_call(&entry).await {
            warn!(error = %e, "Failed to log call status");
        }
    }

    acknowledge()
}

// =============================================================================
// SMS
// =============================================================================

async fn reply_to_sms(state: &AppState, sms: &SmsWebhook) -> AppResult<String> {
    let from = sms.from.as_deref().unwrap_or_default();
    let employee = state
        .directory
        .get_employee_by_phone(from)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let reply = match employee {
        Some(employee) => format!(
            "Hi {}, I received your message. How can I help you?",
            employee.full_name()
        ),
        None => SMS_ACK.to_string(),
    };
    Ok(MessagingResponse::new().message(&reply).to_xml())
}

/// `POST /twilio/sms`
pub async fn sms(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SmsWebhook>, FormRejection>,
) -> Response {
    let sms = match form {
        Ok(Form(sms)) => sms,
        Err(e) => {
            warn!(error = %e, "Malformed SMS webhook");
            return twiml(MessagingResponse::new().message(SMS_ERROR).to_xml());
        }
    };

    info!(
        message_sid = sms.message_sid.as_deref().unwrap_or_default(),
        from = sms.from.as_deref().unwrap_or_default(),
        to = sms.to.as_deref().unwrap_or_default(),
        "Incoming SMS"
    );

    match reply_to_sms(&state, &sms).await {
        Ok(xml) => twiml(xml),
        Err(e) => {
            error!(error = %e, "Failed to handle SMS");
            twiml(MessagingResponse::new().message(SMS_ERROR).to_xml())
        }
    }
}

/// `POST /twilio/sms-fallback`
pub async fn sms_fallback(form: Result<Form<SmsWebhook>, FormRejection>) -> Response {
    let sms = form.map(|Form(sms)| sms).unwrap_or_default();
    warn!(
        from = sms.from.as_deref().unwrap_or_default(),
        "SMS webhook fallback triggered"
    );
    twiml(MessagingResponse::new().message(SMS_FALLBACK).to_xml())
}

// =============================================================================
// Recording and health
// =============================================================================

/// `POST /twilio/recording`
///
/// Recordings are not stored; the event is logged and acknowledged.
pub async fn recording(form: Result<Form<RecordingWebhook>, FormRejection>) -> Response {
    let recording = form.map(|Form(recording)| recording).unwrap_or_default();
    info!(
        call_sid = recording.call_sid.as_deref().unwrap_or_default(),
        recording_sid = recording.recording_sid.as_deref().unwrap_or_default(),
        status = recording.recording_status.as_deref().unwrap_or_default(),
        duration = recording.recording_duration.as_deref().unwrap_or_default(),
        url = recording.recording_url.as_deref().unwrap_or_default(),
        "Recording webhook"
    );
    acknowledge()
}

/// `GET /twilio/health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "twilio-webhooks",
        "timestamp": rfc3339_now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_from_webhook() {
        let call = CallWebhook {
            call_sid: Some("CA123".into()),
            from: Some("+1 (555) 123-4567".into()),
            ..Default::default()
        };
        let caller = caller_from_webhook(&call);
        assert_eq!(caller.phone, "+15551234567");
        assert_eq!(caller.caller_id, "15551234567");
        assert_eq!(caller.raw_sip_metadata.get("call_sid").map(String::as_str), Some("CA123"));
    }

    #[test]
    fn test_anonymous_caller_keeps_defaults() {
        let caller = caller_from_webhook(&CallWebhook::default());
        assert!(!caller.has_phone());
        assert_eq!(caller, CallerInfo::default());
    }
}
