//! Provider Client Tests
//!
//! HTTP clients for the directory, SMS, email and LiveKit server APIs against
//! wiremock servers.

use serde_json::json;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, path_regex, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use switchboard_gateway::core::directory::{
    DirectoryClient, DirectoryError, NewMessage, SupabaseDirectory,
};
use switchboard_gateway::core::notify::{EmailSender, SendGridEmail, SmsSender, TwilioSms};
use switchboard_gateway::config::SipConfig;
use switchboard_gateway::core::platform::{MediaPlatform, OutboundCallRequest, PlatformError};
use switchboard_gateway::core::session::{SessionLauncher, SessionRequest, SessionRole};
use switchboard_gateway::livekit::{
    AgentDispatchLauncher, INSTRUCTIONS_TOPIC, LiveKitApi, LiveKitPlatform,
};

fn employee_row(id: &str, first_name: &str, last_name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "first_name": first_name,
        "last_name": last_name,
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "phone_number": "+46701234567",
        "department_id": "dep-1",
        "department_name": "Sales",
        "office": "Stockholm",
        "roles": ["Account Manager"],
        "status": "available"
    })
}

// =============================================================================
// Directory
// =============================================================================

#[tokio::test]
async fn test_directory_employee_by_phone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/employees"))
        .and(query_param("phone_number", "eq.+46701234567"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "emp-1",
            "first_name": "Erik",
            "last_name": "Lund",
            "email": "erik.lund@example.com",
            "phone_number": "+46701234567",
            "department_id": "dep-1",
            "departments": { "name": "Sales" },
            "status": "available"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let directory = SupabaseDirectory::new(Some(server.uri()), Some("anon-key".into()));
    let employee = directory
        .get_employee_by_phone("+46701234567")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(employee.full_name(), "Erik Lund");
    assert_eq!(employee.department_name.as_deref(), Some("Sales"));
    assert!(employee.roles.is_empty());
}

#[tokio::test]
async fn test_directory_full_name_search_filters_and_dedupes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/search_employees"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            employee_row("emp-1", "Erik", "Lund"),
            employee_row("emp-2", "Erik", "Berg"),
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let directory = SupabaseDirectory::new(Some(server.uri()), Some("anon-key".into()));
    let employees = directory.search_employees("Erik Lund", None).await.unwrap();

    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].id, "emp-1");
}

#[tokio::test]
async fn test_directory_save_message_returns_row_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "to_employee_id": "emp-1",
            "message_text": "Call me back"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 42 }])))
        .mount(&server)
        .await;

    let directory = SupabaseDirectory::new(Some(server.uri()), Some("anon-key".into()));
    let id = directory
        .save_message(&NewMessage::pending("+15551234567", "emp-1", "Call me back"))
        .await
        .unwrap();

    assert_eq!(id, "42");
}

#[tokio::test]
async fn test_directory_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let directory = SupabaseDirectory::new(Some(server.uri()), Some("anon-key".into()));
    let err = directory.get_departments().await.unwrap_err();

    assert!(matches!(err, DirectoryError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_directory_availability_defaults_to_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_employee_available"))
        .and(body_partial_json(json!({ "p_employee_id": "emp-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .mount(&server)
        .await;

    let directory = SupabaseDirectory::new(Some(server.uri()), Some("anon-key".into()));
    assert!(!directory.is_employee_available("emp-1").await.unwrap());
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_twilio_sms_sends_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(body_string_contains("To=%2B46701234567"))
        .and(body_string_contains("From=%2B15550000000"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM42" })))
        .expect(1)
        .mount(&server)
        .await;

    let sms = TwilioSms::new(
        Some("AC123".into()),
        Some("token".into()),
        Some("+15550000000".into()),
    )
    .with_base_url(server.uri());
    let result = sms.send_sms("+46701234567", "New message").await;

    assert!(result.success);
    assert_eq!(result.provider_message_id.as_deref(), Some("SM42"));
}

#[tokio::test]
async fn test_twilio_sms_rejection_is_a_failed_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid To number"))
        .mount(&server)
        .await;

    let sms = TwilioSms::new(
        Some("AC123".into()),
        Some("token".into()),
        Some("+15550000000".into()),
    )
    .with_base_url(server.uri());
    let result = sms.send_sms("not-a-number", "hi").await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("400"));
}

#[tokio::test]
async fn test_sendgrid_returns_message_id_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.key"))
        .and(body_partial_json(json!({
            "from": { "email": "switchboard@example.com", "name": "Switchboard" },
            "subject": "New message from +15551234567"
        })))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "msg-abc"))
        .mount(&server)
        .await;

    let email = SendGridEmail::new(
        Some("SG.key".into()),
        Some("switchboard@example.com".into()),
        "Switchboard".into(),
    )
    .with_base_url(server.uri());
    let result = email
        .send_email("erik@example.com", "New message from +15551234567", "<p>hi</p>", true)
        .await;

    assert!(result.success);
    assert_eq!(result.provider_message_id.as_deref(), Some("msg-abc"));
}

#[tokio::test]
async fn test_sendgrid_content_type_follows_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_partial_json(json!({
            "content": [{ "type": "text/plain", "value": "Call Anna back" }]
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_partial_json(json!({
            "content": [{ "type": "text/html", "value": "<p>Call Anna back</p>" }]
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let email = SendGridEmail::new(
        Some("SG.key".into()),
        Some("switchboard@example.com".into()),
        "Switchboard".into(),
    )
    .with_base_url(server.uri());

    let plain = email
        .send_email("erik@example.com", "Message", "Call Anna back", false)
        .await;
    let html = email
        .send_email("erik@example.com", "Message", "<p>Call Anna back</p>", true)
        .await;

    assert!(plain.success);
    assert!(html.success);
    assert_eq!(plain.provider_message_id, None);
}

// =============================================================================
// LiveKit server API
// =============================================================================

fn platform(server: &MockServer, trunk: Option<&str>) -> LiveKitPlatform {
    LiveKitPlatform::new(
        LiveKitApi::from_credentials(
            &server.uri(),
            Some(("APIkey".into(), "a-secret-that-is-long-enough-for-signing".into())),
        ),
        trunk.map(str::to_string),
    )
}

/// Protobuf string fields travel as raw UTF-8
fn contains_bytes(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

/// Decoded claims segment of the bearer token on a captured request
fn bearer_claims(request: &wiremock::Request) -> serde_json::Value {
    let authorization = request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap();
    let token = authorization.strip_prefix("Bearer ").unwrap();
    let payload = token.split('.').nth(1).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

fn twirp_not_found(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({ "code": "not_found", "msg": message }))
}

#[tokio::test]
async fn test_livekit_create_room() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("RoomService.+CreateRoom$"))
        .and(header("content-type", "application/protobuf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    platform(&server, None)
        .create_room("consultation_t1_1")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(contains_bytes(&requests[0].body, "consultation_t1_1"));
    assert_eq!(bearer_claims(&requests[0])["video"]["roomCreate"], true);
}

#[tokio::test]
async fn test_livekit_delete_missing_room_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("RoomService.+DeleteRoom$"))
        .respond_with(twirp_not_found("room not found"))
        .mount(&server)
        .await;

    platform(&server, None).delete_room("gone").await.unwrap();
}

#[tokio::test]
async fn test_livekit_outbound_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("SIP.+CreateSIPParticipant$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let placed = platform(&server, Some("ST_trunk"))
        .place_outbound_call(&OutboundCallRequest {
            room_name: "consultation_t1_1".into(),
            phone_number: "+46701234567".into(),
            participant_identity: "employee_46701234567".into(),
            participant_name: "Erik Lund".into(),
            participant_metadata: None,
        })
        .await
        .unwrap();

    assert_eq!(placed.participant_identity, "employee_46701234567");
    assert_eq!(placed.sip_call_id, None);

    let requests = server.received_requests().await.unwrap();
    let body = &requests[0].body;
    assert!(contains_bytes(body, "ST_trunk"));
    assert!(contains_bytes(body, "+46701234567"));
    assert!(contains_bytes(body, "consultation_t1_1"));
    assert_eq!(bearer_claims(&requests[0])["sip"]["call"], true);
}

#[tokio::test]
async fn test_livekit_move_token_grants_destination_room() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("RoomService.+MoveParticipant$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    platform(&server, None)
        .move_participant("consultation_1", "employee_1", "call_1")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let video = &bearer_claims(&requests[0])["video"];
    assert_eq!(video["roomAdmin"], true);
    assert_eq!(video["room"], "consultation_1");
    assert_eq!(video["destinationRoom"], "call_1");
}

#[tokio::test]
async fn test_livekit_move_unknown_participant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("RoomService.+MoveParticipant$"))
        .respond_with(twirp_not_found("participant not found"))
        .mount(&server)
        .await;

    let err = platform(&server, None)
        .move_participant("consultation_t1_1", "employee_1", "call_1")
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::ParticipantNotFound { .. }));
}

#[tokio::test]
async fn test_livekit_permission_denied_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("RoomService.+CreateRoom$"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "code": "permission_denied", "msg": "no room create" })),
        )
        .mount(&server)
        .await;

    let err = platform(&server, None)
        .create_room("consultation_t1_1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlatformError::Rejected { operation: "CreateRoom", ref code, .. } if code == "permission_denied"
    ));
}

#[tokio::test]
async fn test_dispatched_session_sends_instructions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("AgentDispatchService.+CreateDispatch$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex("RoomService.+SendData$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let launcher = AgentDispatchLauncher::new(
        LiveKitApi::from_credentials(
            &server.uri(),
            Some(("APIkey".into(), "a-secret-that-is-long-enough-for-signing".into())),
        ),
        &SipConfig::default(),
    );
    let session = launcher
        .launch(SessionRequest {
            room_name: "call_1".into(),
            role: SessionRole::Switchboard,
            metadata: json!({}),
        })
        .await
        .unwrap();
    session.say("Hello there").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(contains_bytes(&requests[0].body, "call_1"));
    assert_eq!(bearer_claims(&requests[0])["video"]["room"], "call_1");
    assert!(contains_bytes(&requests[1].body, INSTRUCTIONS_TOPIC));
    assert!(contains_bytes(&requests[1].body, "Hello there"));
}
