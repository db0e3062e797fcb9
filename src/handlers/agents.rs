//! Agent tool endpoints
//!
//! The external voice worker calls these when its model invokes a tool. Each
//! call names the room the session runs in; the result is the text to speak.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::auth::Auth;
use crate::core::agents::record_decision_tool;
use crate::core::session::{AgentTools, FunctionCallRequest, ToolDefinition};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallBody {
    pub room_name: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub call_id: Option<String>,
}

impl ToolCallBody {
    fn into_request(self, name: String) -> AppResult<FunctionCallRequest> {
        if self.room_name.trim().is_empty() {
            return Err(AppError::BadRequest("room_name is required".to_string()));
        }
        Ok(FunctionCallRequest {
            room_name: self.room_name,
            name,
            arguments: self.arguments,
            call_id: self.call_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub room_name: String,
    pub greeting: String,
}

/// `GET /agent/switchboard/tools`
pub async fn switchboard_tools(State(state): State<Arc<AppState>>) -> Json<Vec<ToolDefinition>> {
    Json(state.switchboard.tool_definitions())
}

/// `POST /agent/switchboard/tools/{name}`
pub async fn call_switchboard_tool(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(name): Path<String>,
    Json(body): Json<ToolCallBody>,
) -> AppResult<Json<ToolCallResponse>> {
    let request = body.into_request(name)?;
    debug!(client = ?auth.id, room_name = %request.room_name, tool = %request.name, "Switchboard tool request");
    let result = state.switchboard.call_tool(&request).await;
    Ok(Json(ToolCallResponse { result }))
}

/// `GET /agent/switchboard/greeting/{room}`
pub async fn switchboard_greeting(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Json<GreetingResponse> {
    let greeting = state.switchboard.greeting(&room_name).await;
    Json(GreetingResponse {
        room_name,
        greeting,
    })
}

/// `GET /agent/consultation/tools`
pub async fn consultation_tools() -> Json<Vec<ToolDefinition>> {
    Json(vec![record_decision_tool()])
}

/// `POST /agent/consultation/tools/{name}`
///
/// The room must belong to a transfer that is still waiting for a decision.
pub async fn call_consultation_tool(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<Auth>,
    Path(name): Path<String>,
    Json(body): Json<ToolCallBody>,
) -> AppResult<Json<ToolCallResponse>> {
    let request = body.into_request(name)?;
    debug!(client = ?auth.id, room_name = %request.room_name, tool = %request.name, "Consultation tool request");
    let agent = state
        .transfers
        .consultation_agent(&request.room_name)
        .ok_or_else(|| {
            AppError::NotFound(format!("No active consultation in room {}", request.room_name))
        })?;
    let result = agent.call_tool(&request).await;
    Ok(Json(ToolCallResponse { result }))
}
