//! Agent sessions through LiveKit agent dispatch
//!
//! A session is an agent worker explicitly dispatched into a room. Spoken
//! instructions reach the worker as reliable data packets on
//! [`INSTRUCTIONS_TOPIC`]; closing the session deletes the dispatch.

use async_trait::async_trait;
use livekit_api::services::room::SendDataOptions;
use livekit_protocol as proto;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use super::api::{self, LiveKitApi};
use crate::config::SipConfig;
use crate::core::session::{
    ConversationalSession, SessionError, SessionHandle, SessionLauncher, SessionRequest,
    SessionResult, SessionRole,
};

pub const INSTRUCTIONS_TOPIC: &str = "switchboard.instructions";

pub struct AgentDispatchLauncher {
    api: Option<Arc<LiveKitApi>>,
    switchboard_agent: String,
    consultation_agent: String,
}

impl AgentDispatchLauncher {
    pub fn new(api: Option<Arc<LiveKitApi>>, sip: &SipConfig) -> Self {
        Self {
            api,
            switchboard_agent: sip.switchboard_agent_name.clone(),
            consultation_agent: sip.consultation_agent_name.clone(),
        }
    }

    fn agent_name(&self, role: SessionRole) -> &str {
        match role {
            SessionRole::Switchboard => &self.switchboard_agent,
            SessionRole::Consultation => &self.consultation_agent,
        }
    }
}

#[async_trait]
impl SessionLauncher for AgentDispatchLauncher {
    async fn launch(&self, request: SessionRequest) -> SessionResult<SessionHandle> {
        let client = api::require(&self.api)?;
        let agent_name = self.agent_name(request.role);
        let mut metadata = request.metadata;
        if let Value::Object(map) = &mut metadata {
            map.insert("role".to_string(), json!(request.role.as_str()));
        }

        let dispatch = api::call(
            "CreateDispatch",
            client
                .dispatch()
                .create_dispatch(proto::CreateAgentDispatchRequest {
                    agent_name: agent_name.to_string(),
                    room: request.room_name.clone(),
                    metadata: metadata.to_string(),
                }),
        )
        .await?;

        info!(
            room_name = %request.room_name,
            agent_name = %agent_name,
            dispatch_id = %dispatch.id,
            "Agent dispatched"
        );

        Ok(Arc::new(DispatchedSession {
            api: client.clone(),
            room_name: request.room_name,
            dispatch_id: dispatch.id,
        }))
    }
}

/// One dispatched agent in one room
pub struct DispatchedSession {
    api: Arc<LiveKitApi>,
    room_name: String,
    dispatch_id: String,
}

impl DispatchedSession {
    pub fn dispatch_id(&self) -> &str {
        &self.dispatch_id
    }
}

#[async_trait]
impl ConversationalSession for DispatchedSession {
    fn room_name(&self) -> &str {
        &self.room_name
    }

    async fn say(&self, instructions: &str) -> SessionResult<()> {
        let payload = json!({ "type": "say", "text": instructions }).to_string();
        let options = SendDataOptions {
            kind: proto::data_packet::Kind::Reliable,
            topic: Some(INSTRUCTIONS_TOPIC.to_string()),
            ..Default::default()
        };
        api::call(
            "SendData",
            self.api
                .rooms()
                .send_data(&self.room_name, payload.into_bytes(), options),
        )
        .await
        .map_err(|e| SessionError::DeliveryFailed(e.to_string()))?;
        debug!(room_name = %self.room_name, "Instruction delivered to agent");
        Ok(())
    }

    async fn close(&self) -> SessionResult<()> {
        let deleted = api::call(
            "DeleteDispatch",
            self.api
                .dispatch()
                .delete_dispatch(self.dispatch_id.as_str(), self.room_name.as_str()),
        )
        .await;
        match deleted {
            Ok(_) => {
                info!(room_name = %self.room_name, dispatch_id = %self.dispatch_id, "Agent dispatch closed");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(SessionError::CloseFailed(e.to_string())),
        }
    }
}
