//! Employee notifications
//!
//! SMS and email are independent channels. A send never returns an error to
//! the caller; the outcome of each attempt is reported in a
//! [`NotificationResult`] so callers can record per-channel delivery.

mod sendgrid;
mod twilio;

pub use sendgrid::SendGridEmail;
pub use twilio::TwilioSms;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::utils::twiml::xml_escape;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn sent(provider_message_id: Option<String>) -> Self {
        Self {
            success: true,
            provider_message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            provider_message_id: None,
            error: Some(error.into()),
        }
    }
}

impl From<NotifyResult<Option<String>>> for NotificationResult {
    fn from(result: NotifyResult<Option<String>>) -> Self {
        match result {
            Ok(id) => NotificationResult::sent(id),
            Err(e) => NotificationResult::failed(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },
}

pub type NotifyResult<T> = Result<T, NotifyError>;

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> NotificationResult;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// `is_html` selects `text/html` over `text/plain` for `body`
    async fn send_email(&self, to: &str, subject: &str, body: &str, is_html: bool)
    -> NotificationResult;
}

// =============================================================================
// Message templates
// =============================================================================

/// Details of a waiting caller, used in transfer heads-ups
#[derive(Debug, Clone)]
pub struct CallerSummary<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub reason: &'a str,
}

pub fn message_sms(employee_name: &str, caller_phone: &str, message_text: &str) -> String {
    format!(
        "Hi {employee_name},\n\n\
         You have a new message from {caller_phone}:\n\n\
         \"{message_text}\"\n\n\
         This message was taken by our switchboard assistant. Please respond when convenient."
    )
}

pub fn transfer_sms(employee_name: &str, caller: &CallerSummary<'_>) -> String {
    format!(
        "Hi {employee_name},\n\n\
         You have an incoming call transfer:\n\n\
         Caller: {}\nPhone: {}\nReason: {}\n\n\
         Please prepare to receive the call.",
        caller.name, caller.phone, caller.reason
    )
}

/// Subject and HTML body for a taken message
pub fn message_email(employee_name: &str, caller_phone: &str, message_text: &str) -> (String, String) {
    let subject = format!("New Message from {caller_phone}");
    let body = format!(
        "<html><body>\
         <h2>New Message</h2>\
         <p>Hi {},</p>\
         <p>You have a new message from <strong>{}</strong>:</p>\
         <blockquote>{}</blockquote>\
         <p>This message was taken by our switchboard assistant. Please respond when convenient.</p>\
         </body></html>",
        xml_escape(employee_name),
        xml_escape(caller_phone),
        xml_escape(message_text)
    );
    (subject, body)
}

/// Subject and HTML body for a transfer heads-up
pub fn transfer_email(employee_name: &str, caller: &CallerSummary<'_>) -> (String, String) {
    let subject = format!("Incoming Call Transfer from {}", caller.name);
    let body = format!(
        "<html><body>\
         <h2>Incoming Call Transfer</h2>\
         <p>Hi {},</p>\
         <ul>\
         <li><strong>Caller:</strong> {}</li>\
         <li><strong>Phone:</strong> {}</li>\
         <li><strong>Reason:</strong> {}</li>\
         </ul>\
         <p>Please prepare to receive the call.</p>\
         </body></html>",
        xml_escape(employee_name),
        xml_escape(caller.name),
        xml_escape(caller.phone),
        xml_escape(caller.reason)
    );
    (subject, body)
}
