//! Minimal TwiML document builders
//!
//! Only the verbs the webhook handlers use are supported: `<Say>`, `<Dial><Sip>`,
//! `<Hangup>` for voice and `<Message>` for messaging. All text is XML-escaped.

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Escape the five XML special characters
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Builder for a `<Response>` answering a voice webhook
#[derive(Debug, Clone, Default)]
pub struct VoiceResponse {
    verbs: Vec<String>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: &str) -> Self {
        self.verbs.push(format!("<Say>{}</Say>", xml_escape(text)));
        self
    }

    /// Dial a SIP URI, e.g. the LiveKit SIP endpoint for a room
    pub fn dial_sip(mut self, sip_uri: &str) -> Self {
        self.verbs
            .push(format!("<Dial><Sip>{}</Sip></Dial>", xml_escape(sip_uri)));
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push("<Hangup/>".to_string());
        self
    }

    pub fn to_xml(&self) -> String {
        format!("{XML_HEADER}<Response>{}</Response>", self.verbs.concat())
    }
}

/// Builder for a `<Response>` answering a messaging webhook
#[derive(Debug, Clone, Default)]
pub struct MessagingResponse {
    messages: Vec<String>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, text: &str) -> Self {
        self.messages
            .push(format!("<Message>{}</Message>", xml_escape(text)));
        self
    }

    pub fn to_xml(&self) -> String {
        format!("{XML_HEADER}<Response>{}</Response>", self.messages.concat())
    }
}
