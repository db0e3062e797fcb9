use livekit_api::access_token::TokenVerifier;
use livekit_api::webhooks::WebhookReceiver;
use livekit_protocol as proto;
use tracing::debug;

use super::error::{LiveKitError, LiveKitResult};
use super::platform::to_participant;
use crate::core::platform::Participant;

/// Router-relevant meaning of a LiveKit webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    ParticipantJoined {
        room_name: String,
        participant: Participant,
    },
    ParticipantLeft {
        room_name: String,
        identity: String,
    },
    RoomFinished {
        room_name: String,
    },
    Ignored(String),
}

pub fn action_from_event(event: &proto::WebhookEvent) -> WebhookAction {
    let room_name = event
        .room
        .as_ref()
        .map(|room| room.name.clone())
        .unwrap_or_default();

    match (event.event.as_str(), &event.participant) {
        ("participant_joined", Some(info)) if !room_name.is_empty() => {
            WebhookAction::ParticipantJoined {
                room_name,
                participant: to_participant(info),
            }
        }
        ("participant_left", Some(info)) if !room_name.is_empty() => {
            WebhookAction::ParticipantLeft {
                room_name,
                identity: info.identity.clone(),
            }
        }
        ("room_finished", _) if !room_name.is_empty() => WebhookAction::RoomFinished { room_name },
        (other, _) => WebhookAction::Ignored(other.to_string()),
    }
}

/// Verifies webhook signatures with the LiveKit API key and secret
pub struct WebhookVerifier {
    receiver: Option<WebhookReceiver>,
}

impl WebhookVerifier {
    pub fn new(credentials: Option<(String, String)>) -> Self {
        Self {
            receiver: credentials.map(|(api_key, api_secret)| {
                WebhookReceiver::new(TokenVerifier::with_api_key(&api_key, &api_secret))
            }),
        }
    }

    /// Verify the signed body and translate it into a router action
    pub fn verify(&self, body: &str, authorization: &str) -> LiveKitResult<WebhookAction> {
        let receiver = self.receiver.as_ref().ok_or_else(|| {
            LiveKitError::NotConfigured("LiveKit credentials required to verify webhooks".into())
        })?;
        let token = authorization
            .strip_prefix("Bearer ")
            .unwrap_or(authorization)
            .trim();

        let event = receiver
            .receive(body, token)
            .map_err(|e| LiveKitError::Webhook(e.to_string()))?;
        debug!(event = %event.event, "LiveKit webhook verified");
        Ok(action_from_event(&event))
    }
}
