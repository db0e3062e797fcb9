//! Consultation agent
//!
//! Runs in the consultation room while the employee decides. It briefs the
//! employee about the waiting caller and exposes a single tool, `record_decision`,
//! which feeds the transfer's one-shot decision signal.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::session::{AgentTools, ConversationalSession, FunctionCallRequest, ToolDefinition};
use crate::core::transfer::{Decision, DecisionSignal, RecordOutcome};

pub const RECORD_DECISION_TOOL: &str = "record_decision";
const REPROMPT: &str = "Please answer with accept, decline, or message.";

/// Caller context shown to the employee
#[derive(Debug, Clone, Default)]
pub struct ConsultationBrief {
    pub caller_name: String,
    pub caller_phone: String,
    pub caller_reason: String,
    pub conversation_summary: Option<String>,
}

impl ConsultationBrief {
    pub fn greeting(&self) -> String {
        let mut greeting = format!(
            "Hello! You have a call from {}, phone {}, regarding {}.",
            self.caller_name, self.caller_phone, self.caller_reason
        );
        if let Some(summary) = self
            .conversation_summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            greeting.push(' ');
            greeting.push_str(summary);
        }
        greeting.push_str(
            " Would you like to accept the call, decline it, or have me take a message instead?",
        );
        greeting
    }
}

/// The only tool a consultation session may call
pub fn record_decision_tool() -> ToolDefinition {
    ToolDefinition::function(
        RECORD_DECISION_TOOL,
        "Record whether the employee accepts the call, declines it, or wants a message taken",
        &[
            ("decision", "One of: accept, decline, message", true),
            ("note", "Optional note from the employee", false),
        ],
    )
}

pub struct ConsultationAgent {
    transfer_id: String,
    room_name: String,
    greeting: String,
    signal: Arc<DecisionSignal>,
}

impl ConsultationAgent {
    pub fn new(room_name: &str, brief: &ConsultationBrief, signal: Arc<DecisionSignal>) -> Self {
        Self {
            transfer_id: signal.transfer_id().to_string(),
            room_name: room_name.to_string(),
            greeting: brief.greeting(),
            signal,
        }
    }

    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Speak the briefing; failure is logged, the wait still runs
    pub async fn begin(&self, session: &dyn ConversationalSession) {
        if let Err(e) = session.say(&self.greeting).await {
            warn!(
                transfer_id = %self.transfer_id,
                room_name = %self.room_name,
                error = %e,
                "Failed to deliver consultation greeting"
            );
        }
    }

    /// Record the employee's answer; invalid input gets a reprompt and records nothing
    pub fn record_decision(&self, decision: &str, note: Option<String>) -> String {
        let decision = match decision.parse::<Decision>() {
            Ok(decision) => decision,
            Err(e) => {
                info!(transfer_id = %self.transfer_id, error = %e, "Invalid decision");
                return REPROMPT.to_string();
            }
        };

        match self.signal.record(decision, note) {
            RecordOutcome::Recorded => match decision {
                Decision::Accept => "Thank you. I'm connecting the caller to you now.",
                Decision::Decline => "Understood. I'll let the caller know you're unavailable.",
                Decision::Message => "Understood. I'll offer to take a message from the caller.",
            }
            .to_string(),
            RecordOutcome::AlreadyDecided(existing) => format!(
                "Your decision to {} has already been recorded.",
                existing.as_str()
            ),
        }
    }
}

#[async_trait]
impl AgentTools for ConsultationAgent {
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![record_decision_tool()]
    }

    async fn call_tool(&self, request: &FunctionCallRequest) -> String {
        if request.name != RECORD_DECISION_TOOL {
            warn!(transfer_id = %self.transfer_id, tool = %request.name, "Unknown consultation tool");
            return REPROMPT.to_string();
        }
        match request.arg("decision") {
            Some(decision) => self.record_decision(&decision, request.arg("note")),
            None => REPROMPT.to_string(),
        }
    }
}
