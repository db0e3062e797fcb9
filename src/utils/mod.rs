pub mod phone;
pub use phone::{normalize_phone_number, phone_digits, validate_phone_number};
pub mod twiml;
pub use twiml::{MessagingResponse, VoiceResponse};
pub mod timestamp;
pub use timestamp::{compact_timestamp, rfc3339_now};
pub mod http;
pub use http::{error_body, http_client};
