use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::platform::Participant;
use crate::utils::{normalize_phone_number, phone_digits};

pub const UNKNOWN_PHONE: &str = "Unknown";
pub const UNKNOWN_CALLER_NAME: &str = "Unknown Caller";
pub const UNKNOWN_CALLER_ID: &str = "unknown";

/// Metadata keys that carry the caller's number in JSON participant metadata
const PHONE_KEYS: &[&str] = &[
    "sip.phoneNumber",
    "phone_number",
    "phoneNumber",
    "phone",
    "from",
    "caller_phone",
];
const NAME_KEYS: &[&str] = &["caller_name", "callerName", "display_name", "name"];

/// Identity of the person on the phone, derived once at call start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerInfo {
    pub phone: String,
    pub display_name: String,
    pub caller_id: String,
    /// Flattened key/value pairs from JSON participant metadata
    pub raw_sip_metadata: BTreeMap<String, String>,
}

impl Default for CallerInfo {
    fn default() -> Self {
        Self {
            phone: UNKNOWN_PHONE.to_string(),
            display_name: UNKNOWN_CALLER_NAME.to_string(),
            caller_id: UNKNOWN_CALLER_ID.to_string(),
            raw_sip_metadata: BTreeMap::new(),
        }
    }
}

impl CallerInfo {
    pub fn has_phone(&self) -> bool {
        self.phone != UNKNOWN_PHONE
    }

    pub fn has_name(&self) -> bool {
        self.display_name != UNKNOWN_CALLER_NAME
    }

    fn set_phone(&mut self, raw: &str) {
        if let Some(phone) = normalize_phone_number(raw) {
            self.phone = phone;
        }
    }

    fn set_name(&mut self, raw: &str) {
        let name = raw.trim();
        if !name.is_empty() {
            self.display_name = name.to_string();
        }
    }
}

/// Text after `marker`, up to the next whitespace
fn after_marker<'a>(field: &'a str, marker: &str) -> Option<&'a str> {
    let start = field.find(marker)? + marker.len();
    let rest = &field[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end]).filter(|value| !value.is_empty())
}

/// Best-effort caller identity from a telephony participant; never fails
///
/// Sources, later ones refining earlier ones:
/// - metadata: JSON attributes (`sip.phoneNumber`, `phone_number`, ...) or a `sip:` URI
/// - identity: `caller:<id>`, `phone:<number>`, LiveKit's `sip_<number>`
/// - name: `caller:<display name>`, `phone:<number>`
pub fn extract_caller_info(participant: &Participant) -> CallerInfo {
    let mut info = CallerInfo::default();

    let metadata = participant.metadata.trim();
    if !metadata.is_empty() {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(metadata) {
            for (key, value) in &map {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => continue,
                    other => other.to_string(),
                };
                info.raw_sip_metadata.insert(key.clone(), text);
            }
            let phone = PHONE_KEYS
                .iter()
                .find_map(|k| info.raw_sip_metadata.get(*k).cloned());
            if let Some(phone) = phone {
                info.set_phone(&phone);
            }
            let name = NAME_KEYS
                .iter()
                .find_map(|k| info.raw_sip_metadata.get(*k).cloned());
            if let Some(name) = name {
                info.set_name(&name);
            }
        } else if let Some(uri) = after_marker(metadata, "sip:") {
            info.set_phone(uri);
        }
    }

    let identity = participant.identity.trim();
    if let Some(id) = after_marker(identity, "caller:") {
        info.caller_id = id.to_string();
    } else if let Some(number) = after_marker(identity, "phone:") {
        info.set_phone(number);
    } else if let Some(number) = identity.strip_prefix("sip_") {
        info.set_phone(number);
    }

    let name = participant.name.trim();
    if let Some(start) = name.find("caller:") {
        info.set_name(&name[start + "caller:".len()..]);
    } else if let Some(number) = after_marker(name, "phone:") {
        info.set_phone(number);
    }

    if info.caller_id == UNKNOWN_CALLER_ID && info.has_phone() {
        info.caller_id = phone_digits(&info.phone);
    }

    info
}
