use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use super::{EmailSender, NotificationResult, NotifyError, NotifyResult};
use crate::utils::{error_body, http_client};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com";

fn content_type(is_html: bool) -> &'static str {
    if is_html { "text/html" } else { "text/plain" }
}

/// Email through the SendGrid v3 mail send API
pub struct SendGridEmail {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from_address: Option<String>,
    from_name: String,
}

impl SendGridEmail {
    pub fn new(api_key: Option<String>, from_address: Option<String>, from_name: String) -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            base_url: SENDGRID_API_URL.to_string(),
            api_key,
            from_address,
            from_name,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> NotifyResult<Option<String>> {
        let (Some(api_key), Some(from)) = (&self.api_key, &self.from_address) else {
            return Err(NotifyError::NotConfigured("SendGrid email"));
        };

        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": from, "name": self.from_name },
            "subject": subject,
            "content": [{ "type": content_type(is_html), "value": body }],
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let (status, message) = error_body(response).await;
            return Err(NotifyError::Status { status, message });
        }

        Ok(response
            .headers()
            .get("X-Message-Id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }
}

#[async_trait]
impl EmailSender for SendGridEmail {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> NotificationResult {
        let result = self.send(to, subject, body, is_html).await;
        match &result {
            Ok(id) => info!(to = %to, message_id = ?id, "Email sent"),
            Err(e) => warn!(to = %to, error = %e, "Email send failed"),
        }
        result.into()
    }
}
