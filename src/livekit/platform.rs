use async_trait::async_trait;
use livekit_api::services::room::CreateRoomOptions;
use livekit_api::services::sip::CreateSIPParticipantOptions;
use livekit_protocol as proto;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::api::{self, LiveKitApi};
use crate::core::platform::{
    MediaPlatform, OutboundCallRequest, Participant, ParticipantKind, PlacedCall, PlatformError,
    PlatformResult,
};

/// Consultation rooms close on their own if the transfer never cleans up
const CONSULTATION_EMPTY_TIMEOUT_SECS: u32 = 300;

/// How long the employee's phone rings before the leg is dropped
const RINGING_TIMEOUT: Duration = Duration::from_secs(45);

fn participant_kind(kind: proto::participant_info::Kind) -> ParticipantKind {
    match kind {
        proto::participant_info::Kind::Standard => ParticipantKind::Standard,
        proto::participant_info::Kind::Sip => ParticipantKind::Sip,
        proto::participant_info::Kind::Agent => ParticipantKind::Agent,
        _ => ParticipantKind::Other,
    }
}

pub(crate) fn to_participant(info: &proto::ParticipantInfo) -> Participant {
    let kind = proto::participant_info::Kind::try_from(info.kind)
        .map(participant_kind)
        .unwrap_or(ParticipantKind::Other);
    Participant {
        identity: info.identity.clone(),
        name: info.name.clone(),
        metadata: info.metadata.clone(),
        kind,
    }
}

/// [`MediaPlatform`] backed by the LiveKit server API
pub struct LiveKitPlatform {
    api: Option<Arc<LiveKitApi>>,
    outbound_trunk_id: Option<String>,
}

impl LiveKitPlatform {
    pub fn new(api: Option<Arc<LiveKitApi>>, outbound_trunk_id: Option<String>) -> Self {
        Self {
            api,
            outbound_trunk_id,
        }
    }
}

#[async_trait]
impl MediaPlatform for LiveKitPlatform {
    async fn create_room(&self, room_name: &str) -> PlatformResult<()> {
        let api = api::require(&self.api)?;
        let options = CreateRoomOptions {
            empty_timeout: CONSULTATION_EMPTY_TIMEOUT_SECS,
            ..Default::default()
        };
        api::call("CreateRoom", api.rooms().create_room(room_name, options)).await?;
        info!(room_name = %room_name, "LiveKit room created");
        Ok(())
    }

    async fn delete_room(&self, room_name: &str) -> PlatformResult<()> {
        let api = api::require(&self.api)?;
        match api::call("DeleteRoom", api.rooms().delete_room(room_name)).await {
            Ok(()) => {
                info!(room_name = %room_name, "LiveKit room deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn place_outbound_call(
        &self,
        request: &OutboundCallRequest,
    ) -> PlatformResult<PlacedCall> {
        let Some(trunk_id) = self.outbound_trunk_id.clone() else {
            return Err(PlatformError::NotConfigured(
                "SIP_OUTBOUND_TRUNK_ID must be set to place outbound calls".to_string(),
            ));
        };
        let api = api::require(&self.api)?;

        let options = CreateSIPParticipantOptions {
            participant_identity: request.participant_identity.clone(),
            participant_name: Some(request.participant_name.clone()),
            participant_metadata: request.participant_metadata.clone(),
            ringing_timeout: Some(RINGING_TIMEOUT),
            ..Default::default()
        };
        let placed = api::call(
            "CreateSIPParticipant",
            api.sip().create_sip_participant(
                trunk_id,
                request.phone_number.clone(),
                request.room_name.clone(),
                options,
            ),
        )
        .await?;

        let identity = if placed.participant_identity.is_empty() {
            request.participant_identity.clone()
        } else {
            placed.participant_identity
        };
        info!(
            room_name = %request.room_name,
            participant_identity = %identity,
            "Outbound SIP call placed"
        );
        Ok(PlacedCall {
            participant_identity: identity,
            sip_call_id: Some(placed.sip_call_id).filter(|id| !id.is_empty()),
        })
    }

    async fn list_participants(&self, room_name: &str) -> PlatformResult<Vec<Participant>> {
        let api = api::require(&self.api)?;
        let participants =
            api::call("ListParticipants", api.rooms().list_participants(room_name)).await?;
        Ok(participants.iter().map(to_participant).collect())
    }

    async fn move_participant(
        &self,
        room_name: &str,
        identity: &str,
        destination_room: &str,
    ) -> PlatformResult<()> {
        let api = api::require(&self.api)?;
        let moved = api::call(
            "MoveParticipant",
            api.rooms().move_participant(room_name, identity, destination_room),
        )
        .await;
        match moved {
            Ok(()) => {
                info!(
                    room_name = %room_name,
                    identity = %identity,
                    destination_room = %destination_room,
                    "Participant moved"
                );
                Ok(())
            }
            Err(e) if e.is_not_found() => Err(PlatformError::ParticipantNotFound {
                room: room_name.to_string(),
                identity: identity.to_string(),
            }),
            Err(e) => {
                warn!(room_name = %room_name, identity = %identity, error = %e, "Move participant failed");
                Err(e.into())
            }
        }
    }
}
