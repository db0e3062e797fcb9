//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `twilio` - Twilio voice, SMS, status and recording webhooks
//! - `livekit` - LiveKit room and participant webhooks
//! - `agents` - Tool endpoints for the switchboard and consultation agents
//! - `admin` - Room and transfer inspection

pub mod admin;
pub mod agents;
pub mod api;
pub mod livekit;
pub mod twilio;
