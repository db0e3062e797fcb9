//! LiveKit integration
//!
//! - [`LiveKitApi`]: typed server API clients sharing one API key
//! - [`LiveKitPlatform`]: rooms, outbound SIP legs and participant moves
//! - [`AgentDispatchLauncher`]: agent sessions via explicit dispatch
//! - [`WebhookVerifier`]: signed room and participant events

mod api;
mod dispatch;
mod error;
mod platform;
mod webhook;

pub use api::LiveKitApi;
pub use dispatch::{AgentDispatchLauncher, DispatchedSession, INSTRUCTIONS_TOPIC};
pub use error::{LiveKitError, LiveKitResult};
pub use platform::LiveKitPlatform;
pub use webhook::{WebhookAction, WebhookVerifier, action_from_event};
