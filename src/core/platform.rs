//! Media platform abstraction
//!
//! The switchboard needs five things from the real-time media platform: create and
//! delete rooms, place an outbound telephone leg into a room, list a room's
//! participants and move a participant between rooms. [`MediaPlatform`] is the seam;
//! the LiveKit implementation lives in [`crate::livekit`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform-assigned participant type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    #[default]
    Standard,
    Sip,
    Agent,
    Other,
}

/// A participant as reported by the media platform or its webhooks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub identity: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub kind: ParticipantKind,
}

impl Participant {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn with_kind(mut self, kind: ParticipantKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Outbound telephone leg to place into a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCallRequest {
    pub room_name: String,
    /// Number to dial, E.164
    pub phone_number: String,
    /// Identity the answered leg will have inside the room
    pub participant_identity: String,
    pub participant_name: String,
    pub participant_metadata: Option<String>,
}

/// Result of placing an outbound leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCall {
    pub participant_identity: String,
    pub sip_call_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Media platform not configured: {0}")]
    NotConfigured(String),

    #[error("Request to media platform failed: {0}")]
    Request(String),

    #[error("Media platform rejected {operation}: {code} {message}")]
    Rejected {
        operation: &'static str,
        code: String,
        message: String,
    },

    #[error("Invalid response from media platform: {0}")]
    InvalidResponse(String),

    #[error("Participant {identity} not found in room {room}")]
    ParticipantNotFound { room: String, identity: String },
}

pub type PlatformResult<T> = Result<T, PlatformError>;

#[async_trait]
pub trait MediaPlatform: Send + Sync {
    async fn create_room(&self, room_name: &str) -> PlatformResult<()>;

    async fn delete_room(&self, room_name: &str) -> PlatformResult<()>;

    /// Dial a telephone number into a room; the leg joins once answered
    async fn place_outbound_call(&self, request: &OutboundCallRequest)
    -> PlatformResult<PlacedCall>;

    async fn list_participants(&self, room_name: &str) -> PlatformResult<Vec<Participant>>;

    /// Move a live participant, media included, from one room to another
    async fn move_participant(
        &self,
        room_name: &str,
        identity: &str,
        destination_room: &str,
    ) -> PlatformResult<()>;
}
