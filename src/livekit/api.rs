//! Typed LiveKit server API clients
//!
//! `RoomService`, `SIP` and `AgentDispatchService` calls go through the
//! `livekit-api` service clients, which sign a per-call access token with the
//! grants each method needs.

use livekit_api::services::agent_dispatch::AgentDispatchClient;
use livekit_api::services::room::RoomClient;
use livekit_api::services::sip::SIPClient;
use livekit_api::services::ServiceResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::{LiveKitError, LiveKitResult};

/// Upper bound for a single server API call
pub(crate) const API_TIMEOUT: Duration = Duration::from_secs(15);

/// Service clients sharing one API key
pub struct LiveKitApi {
    rooms: RoomClient,
    sip: SIPClient,
    dispatch: AgentDispatchClient,
}

impl LiveKitApi {
    /// `http_url` is the HTTP(S) form of the LiveKit URL
    pub fn new(http_url: &str, api_key: &str, api_secret: &str) -> Self {
        let host = http_url.trim_end_matches('/');
        Self {
            rooms: RoomClient::with_api_key(host, api_key, api_secret),
            sip: SIPClient::with_api_key(host, api_key, api_secret),
            dispatch: AgentDispatchClient::with_api_key(host, api_key, api_secret),
        }
    }

    /// `None` when the key or secret is missing
    pub fn from_credentials(
        http_url: &str,
        credentials: Option<(String, String)>,
    ) -> Option<Arc<Self>> {
        credentials
            .map(|(api_key, api_secret)| Arc::new(Self::new(http_url, &api_key, &api_secret)))
    }

    pub fn rooms(&self) -> &RoomClient {
        &self.rooms
    }

    pub fn sip(&self) -> &SIPClient {
        &self.sip
    }

    pub fn dispatch(&self) -> &AgentDispatchClient {
        &self.dispatch
    }
}

pub(crate) fn require(api: &Option<Arc<LiveKitApi>>) -> LiveKitResult<&Arc<LiveKitApi>> {
    api.as_ref().ok_or_else(|| {
        LiveKitError::NotConfigured("LIVEKIT_API_KEY and LIVEKIT_API_SECRET must be set".into())
    })
}

/// Await a service call under [`API_TIMEOUT`], tagging errors with the method
pub(crate) async fn call<T, F>(method: &'static str, request: F) -> LiveKitResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    debug!(method, "LiveKit API call");
    match tokio::time::timeout(API_TIMEOUT, request).await {
        Ok(result) => result.map_err(|e| LiveKitError::from_service(method, e)),
        Err(_) => Err(LiveKitError::Timeout {
            method,
            after: API_TIMEOUT,
        }),
    }
}
