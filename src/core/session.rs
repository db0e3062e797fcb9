//! Conversational session seam
//!
//! The voice pipeline (STT, LLM, TTS) runs outside the gateway. The gateway only
//! needs to launch an agent session into a room, ask it to speak, and close it.
//! Agents expose tools to that pipeline using the function-calling shapes below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Tool Definitions
// =============================================================================

/// Tool definition advertised to the conversational model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: FunctionDefinition,
}

/// Function definition for tool calling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    /// Function tool with a JSON-schema object of string properties
    ///
    /// `params` lists `(name, description, required)`.
    pub fn function(name: &str, description: &str, params: &[(&str, &str, bool)]) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for (param, param_description, is_required) in params {
            properties.insert(
                (*param).to_string(),
                serde_json::json!({ "type": "string", "description": param_description }),
            );
            if *is_required {
                required.push(Value::String((*param).to_string()));
            }
        }

        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: Some(description.to_string()),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })),
            },
        }
    }
}

/// Function call issued by the conversational model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    /// Room the calling session is attached to
    pub room_name: String,
    /// Function name
    #[serde(default)]
    pub name: String,
    /// JSON arguments
    #[serde(default)]
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl FunctionCallRequest {
    /// String argument, trimmed; empty strings count as absent
    pub fn arg(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|value| match value {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
    }
}

/// Tool surface an agent exposes to its conversational session
#[async_trait]
pub trait AgentTools: Send + Sync {
    fn tool_definitions(&self) -> Vec<ToolDefinition>;

    /// Run a tool and return the text the agent should say
    async fn call_tool(&self, request: &FunctionCallRequest) -> String;
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session launcher not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to launch session: {0}")]
    LaunchFailed(String),

    #[error("Failed to deliver instruction: {0}")]
    DeliveryFailed(String),

    #[error("Failed to close session: {0}")]
    CloseFailed(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Which agent persona a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Switchboard,
    Consultation,
}

impl SessionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionRole::Switchboard => "switchboard",
            SessionRole::Consultation => "consultation",
        }
    }
}

/// Parameters for launching an agent session into a room
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub room_name: String,
    pub role: SessionRole,
    /// Opaque context handed to the session (e.g. transfer id, caller summary)
    pub metadata: Value,
}

/// A live agent session attached to one room
#[async_trait]
pub trait ConversationalSession: Send + Sync {
    fn room_name(&self) -> &str;

    /// Ask the session to say something, e.g. a greeting
    async fn say(&self, instructions: &str) -> SessionResult<()>;

    async fn close(&self) -> SessionResult<()>;
}

/// Opaque handle to a session, shared between the router and the orchestrator
pub type SessionHandle = Arc<dyn ConversationalSession>;

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, request: SessionRequest) -> SessionResult<SessionHandle>;
}
