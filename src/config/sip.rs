/// SIP trunk and agent dispatch settings
///
/// `sip_host` is the LiveKit SIP endpoint inbound calls are dialled to, e.g.
/// `abc123.sip.livekit.cloud`. `outbound_trunk_id` is required to place the
/// employee call leg of a warm transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipConfig {
    pub sip_host: Option<String>,
    pub outbound_trunk_id: Option<String>,
    /// Agent name dispatched into caller rooms
    pub switchboard_agent_name: String,
    /// Agent name dispatched into consultation rooms
    pub consultation_agent_name: String,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            sip_host: None,
            outbound_trunk_id: None,
            switchboard_agent_name: "switchboard".to_string(),
            consultation_agent_name: "consultation".to_string(),
        }
    }
}
