use livekit_api::services::{ServiceError, TwirpError, TwirpErrorCode};
use std::time::Duration;
use thiserror::Error;

use crate::core::platform::PlatformError;
use crate::core::session::SessionError;

#[derive(Debug, Error)]
pub enum LiveKitError {
    #[error("LiveKit not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to sign LiveKit access token for {method}: {message}")]
    Token {
        method: &'static str,
        message: String,
    },

    #[error("LiveKit {method} request failed: {message}")]
    Http {
        method: &'static str,
        message: String,
    },

    #[error("LiveKit {method} returned {code}: {message}")]
    Twirp {
        method: &'static str,
        code: String,
        message: String,
    },

    #[error("Invalid LiveKit response from {method}: {message}")]
    Decode {
        method: &'static str,
        message: String,
    },

    #[error("LiveKit {method} timed out after {after:?}")]
    Timeout {
        method: &'static str,
        after: Duration,
    },

    #[error("Webhook verification failed: {0}")]
    Webhook(String),
}

pub type LiveKitResult<T> = Result<T, LiveKitError>;

impl LiveKitError {
    pub(crate) fn from_service(method: &'static str, error: ServiceError) -> Self {
        match error {
            ServiceError::Env(e) => LiveKitError::NotConfigured(e.to_string()),
            ServiceError::AccessToken(e) => LiveKitError::Token {
                method,
                message: e.to_string(),
            },
            ServiceError::Twirp(TwirpError::Twirp(TwirpErrorCode { code, msg })) => {
                LiveKitError::Twirp {
                    method,
                    code,
                    message: msg,
                }
            }
            ServiceError::Twirp(TwirpError::Prost(e)) => LiveKitError::Decode {
                method,
                message: e.to_string(),
            },
            ServiceError::Twirp(other) => LiveKitError::Http {
                method,
                message: other.to_string(),
            },
        }
    }

    /// Twirp `not_found`, e.g. deleting a room that is already gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, LiveKitError::Twirp { code, .. } if code == TwirpErrorCode::NOT_FOUND)
    }
}

impl From<LiveKitError> for PlatformError {
    fn from(error: LiveKitError) -> Self {
        match error {
            LiveKitError::NotConfigured(msg) => PlatformError::NotConfigured(msg),
            LiveKitError::Twirp {
                method,
                code,
                message,
            } => PlatformError::Rejected {
                operation: method,
                code,
                message,
            },
            LiveKitError::Decode { message, .. } => PlatformError::InvalidResponse(message),
            other => PlatformError::Request(other.to_string()),
        }
    }
}

impl From<LiveKitError> for SessionError {
    fn from(error: LiveKitError) -> Self {
        match error {
            LiveKitError::NotConfigured(msg) => SessionError::NotConfigured(msg),
            other => SessionError::LaunchFailed(other.to_string()),
        }
    }
}
