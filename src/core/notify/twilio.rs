use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::{NotificationResult, NotifyError, NotifyResult, SmsSender};
use crate::utils::{error_body, http_client};

const TWILIO_API_URL: &str = "https://api.twilio.com";

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

/// SMS through the Twilio Messages API
pub struct TwilioSms {
    client: reqwest::Client,
    base_url: String,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

impl TwilioSms {
    pub fn new(
        account_sid: Option<String>,
        auth_token: Option<String>,
        from_number: Option<String>,
    ) -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            base_url: TWILIO_API_URL.to_string(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send(&self, to: &str, body: &str) -> NotifyResult<Option<String>> {
        let (Some(sid), Some(token), Some(from)) =
            (&self.account_sid, &self.auth_token, &self.from_number)
        else {
            return Err(NotifyError::NotConfigured("Twilio SMS"));
        };

        let response = self
            .client
            .post(format!(
                "{}/2010-04-01/Accounts/{sid}/Messages.json",
                self.base_url
            ))
            .basic_auth(sid, Some(token))
            .form(&[("To", to), ("From", from.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            return Err(NotifyError::Status { status, message });
        }

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;
        Ok(resource.sid)
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send_sms(&self, to: &str, body: &str) -> NotificationResult {
        let result = self.send(to, body).await;
        match &result {
            Ok(sid) => info!(to = %to, message_sid = ?sid, "SMS sent"),
            Err(e) => warn!(to = %to, error = %e, "SMS send failed"),
        }
        result.into()
    }
}
