//! Switchboard gateway
//!
//! Answers inbound SIP calls in LiveKit rooms with an AI receptionist that
//! looks people up in the employee directory. Callers are either warm
//! transferred through a private consultation room or leave a message that
//! is delivered to the employee by SMS and email.

pub mod auth;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod livekit;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod utils;

pub use config::ServerConfig;
pub use core::*;
pub use errors::app_error::{AppError, AppResult};
pub use errors::auth_error::{AuthError, AuthResult};
pub use state::{AppState, Services};
