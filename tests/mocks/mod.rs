//! In-memory collaborators for integration tests
//!
//! Each mock records what it was asked to do and can be told to fail, so tests
//! can drive the switchboard through failure paths without any network.

// Not every test binary uses every mock
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use switchboard_gateway::config::ServerConfig;
use switchboard_gateway::core::directory::{
    CallLogEntry, CompanyInfoRecord, DepartmentRecord, DirectoryClient, DirectoryError,
    DirectoryResult, EmployeeRecord, MessageStatusUpdate, NewMessage,
};
use switchboard_gateway::core::notify::{EmailSender, NotificationResult, SmsSender};
use switchboard_gateway::core::platform::{
    MediaPlatform, OutboundCallRequest, Participant, ParticipantKind, PlacedCall, PlatformError,
    PlatformResult,
};
use switchboard_gateway::core::session::{
    ConversationalSession, SessionError, SessionHandle, SessionLauncher, SessionRequest,
    SessionResult, SessionRole,
};
use switchboard_gateway::core::transfer::{TransferAttempt, TransferStatus};
use switchboard_gateway::state::{AppState, Services};

pub const CALLER_ROOM: &str = "call_20240101_120000_15551234567";
pub const CALLER_IDENTITY: &str = "sip_+15551234567";
pub const EMPLOYEE_ID: &str = "emp-1";
pub const EMPLOYEE_PHONE: &str = "+46701234567";

// =============================================================================
// Media platform
// =============================================================================

#[derive(Default)]
pub struct MockPlatform {
    pub fail_create_room: AtomicBool,
    pub fail_outbound: AtomicBool,
    pub fail_move: AtomicBool,
    /// When set, placed legs never show up in the room
    pub employee_never_joins: AtomicBool,
    pub created_rooms: Mutex<Vec<String>>,
    pub deleted_rooms: Mutex<Vec<String>>,
    pub placed_calls: Mutex<Vec<OutboundCallRequest>>,
    pub moves: Mutex<Vec<(String, String, String)>>,
    participants: Mutex<HashMap<String, Vec<Participant>>>,
}

#[async_trait]
impl MediaPlatform for MockPlatform {
    async fn create_room(&self, room_name: &str) -> PlatformResult<()> {
        if self.fail_create_room.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("room service down".into()));
        }
        self.created_rooms.lock().push(room_name.to_string());
        Ok(())
    }

    async fn delete_room(&self, room_name: &str) -> PlatformResult<()> {
        self.deleted_rooms.lock().push(room_name.to_string());
        self.participants.lock().remove(room_name);
        Ok(())
    }

    async fn place_outbound_call(&self, request: &OutboundCallRequest) -> PlatformResult<PlacedCall> {
        self.placed_calls.lock().push(request.clone());
        if self.fail_outbound.load(Ordering::SeqCst) {
            return Err(PlatformError::Rejected {
                operation: "CreateSIPParticipant",
                code: "unavailable".into(),
                message: "busy here".into(),
            });
        }
        if !self.employee_never_joins.load(Ordering::SeqCst) {
            self.participants
                .lock()
                .entry(request.room_name.clone())
                .or_default()
                .push(
                    Participant::new(request.participant_identity.clone())
                        .with_name(request.participant_name.clone())
                        .with_kind(ParticipantKind::Sip),
                );
        }
        Ok(PlacedCall {
            participant_identity: request.participant_identity.clone(),
            sip_call_id: Some("SCL_test".into()),
        })
    }

    async fn list_participants(&self, room_name: &str) -> PlatformResult<Vec<Participant>> {
        Ok(self
            .participants
            .lock()
            .get(room_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn move_participant(
        &self,
        room_name: &str,
        identity: &str,
        destination_room: &str,
    ) -> PlatformResult<()> {
        if self.fail_move.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("move failed".into()));
        }
        self.moves.lock().push((
            room_name.to_string(),
            identity.to_string(),
            destination_room.to_string(),
        ));
        Ok(())
    }
}

// =============================================================================
// Sessions
// =============================================================================

pub struct MockSession {
    pub room_name: String,
    pub role: SessionRole,
    pub said: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

#[async_trait]
impl ConversationalSession for MockSession {
    fn room_name(&self) -> &str {
        &self.room_name
    }

    async fn say(&self, instructions: &str) -> SessionResult<()> {
        self.said.lock().push(instructions.to_string());
        Ok(())
    }

    async fn close(&self) -> SessionResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

type LaunchHook = Box<dyn Fn(&SessionRequest) + Send + Sync>;

#[derive(Default)]
pub struct MockLauncher {
    pub fail: AtomicBool,
    pub sessions: Mutex<Vec<Arc<MockSession>>>,
    /// Runs while a launch is in flight, e.g. to finish the room under it
    pub on_launch: Mutex<Option<LaunchHook>>,
}

impl MockLauncher {
    pub fn sessions_for(&self, role: SessionRole) -> Vec<Arc<MockSession>> {
        self.sessions
            .lock()
            .iter()
            .filter(|s| s.role == role)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(&self, request: SessionRequest) -> SessionResult<SessionHandle> {
        if let Some(hook) = self.on_launch.lock().as_ref() {
            hook(&request);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::LaunchFailed("no agent workers".into()));
        }
        let session = Arc::new(MockSession {
            room_name: request.room_name,
            role: request.role,
            said: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.sessions.lock().push(session.clone());
        Ok(session)
    }
}

// =============================================================================
// Directory
// =============================================================================

pub fn employee() -> EmployeeRecord {
    EmployeeRecord {
        id: EMPLOYEE_ID.to_string(),
        first_name: "Erik".to_string(),
        last_name: "Lund".to_string(),
        email: "erik.lund@example.com".to_string(),
        phone_number: EMPLOYEE_PHONE.to_string(),
        department_id: Some("dep-1".to_string()),
        department_name: Some("Sales".to_string()),
        office: Some("Stockholm".to_string()),
        roles: vec!["Account Manager".to_string()],
        status: "available".to_string(),
    }
}

pub struct MockDirectory {
    pub employees: Vec<EmployeeRecord>,
    pub available: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_save_message: AtomicBool,
    pub call_logs: Mutex<Vec<CallLogEntry>>,
    pub messages: Mutex<Vec<NewMessage>>,
    pub status_updates: Mutex<Vec<(String, MessageStatusUpdate)>>,
    next_id: AtomicUsize,
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self {
            employees: vec![employee()],
            available: AtomicBool::new(true),
            fail_reads: AtomicBool::new(false),
            fail_save_message: AtomicBool::new(false),
            call_logs: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }
}

impl MockDirectory {
    fn check_reads(&self) -> DirectoryResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DirectoryError::Request("connection refused".into()));
        }
        Ok(())
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn search_employees(
        &self,
        query: &str,
        department: Option<&str>,
    ) -> DirectoryResult<Vec<EmployeeRecord>> {
        self.check_reads()?;
        let query = query.to_lowercase();
        Ok(self
            .employees
            .iter()
            .filter(|e| query.is_empty() || e.full_name().to_lowercase().contains(&query))
            .filter(|e| department.is_none() || e.department_name.as_deref() == department)
            .cloned()
            .collect())
    }

    async fn get_employee_by_id(&self, employee_id: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        self.check_reads()?;
        Ok(self.employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn get_employee_by_phone(&self, phone: &str) -> DirectoryResult<Option<EmployeeRecord>> {
        self.check_reads()?;
        Ok(self
            .employees
            .iter()
            .find(|e| e.phone_number == phone)
            .cloned())
    }

    async fn is_employee_available(&self, _employee_id: &str) -> DirectoryResult<bool> {
        self.check_reads()?;
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn get_departments(&self) -> DirectoryResult<Vec<DepartmentRecord>> {
        self.check_reads()?;
        Ok(vec![DepartmentRecord {
            id: "dep-1".to_string(),
            name: "Sales".to_string(),
            description: Some("New customers and quotes".to_string()),
            routing_priority: 1,
        }])
    }

    async fn get_company_info(&self) -> DirectoryResult<Option<CompanyInfoRecord>> {
        self.check_reads()?;
        Ok(Some(CompanyInfoRecord {
            id: "company-1".to_string(),
            company_name: "Nordlys AB".to_string(),
            greeting_message: "Thank you for calling Nordlys. How may I direct your call?"
                .to_string(),
            business_hours: json!({}),
            settings: json!({}),
        }))
    }

    async fn is_company_open(&self) -> DirectoryResult<bool> {
        self.check_reads()?;
        Ok(true)
    }

    async fn log_call(&self, entry: &CallLogEntry) -> DirectoryResult<String> {
        self.call_logs.lock().push(entry.clone());
        Ok(self.next_id())
    }

    async fn save_message(&self, message: &NewMessage) -> DirectoryResult<String> {
        if self.fail_save_message.load(Ordering::SeqCst) {
            return Err(DirectoryError::Status {
                status: 500,
                message: "insert failed".into(),
            });
        }
        self.messages.lock().push(message.clone());
        Ok(self.next_id())
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        update: &MessageStatusUpdate,
    ) -> DirectoryResult<()> {
        self.status_updates
            .lock()
            .push((message_id.to_string(), update.clone()));
        Ok(())
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Default)]
pub struct MockSms {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SmsSender for MockSms {
    async fn send_sms(&self, to: &str, body: &str) -> NotificationResult {
        if self.fail.load(Ordering::SeqCst) {
            return NotificationResult::failed("Twilio returned 400: invalid number");
        }
        self.sent.lock().push((to.to_string(), body.to_string()));
        NotificationResult::sent(Some(format!("SM{}", self.sent.lock().len())))
    }
}

#[derive(Default)]
pub struct MockEmail {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<(String, String)>>,
    pub html: Mutex<Vec<bool>>,
}

#[async_trait]
impl EmailSender for MockEmail {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _body: &str,
        is_html: bool,
    ) -> NotificationResult {
        if self.fail.load(Ordering::SeqCst) {
            return NotificationResult::failed("SendGrid returned 401");
        }
        self.sent.lock().push((to.to_string(), subject.to_string()));
        self.html.lock().push(is_html);
        NotificationResult::sent(Some("msg-1".to_string()))
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub state: Arc<AppState>,
    pub platform: Arc<MockPlatform>,
    pub launcher: Arc<MockLauncher>,
    pub directory: Arc<MockDirectory>,
    pub sms: Arc<MockSms>,
    pub email: Arc<MockEmail>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let platform = Arc::new(MockPlatform::default());
        let launcher = Arc::new(MockLauncher::default());
        let directory = Arc::new(MockDirectory::default());
        let sms = Arc::new(MockSms::default());
        let email = Arc::new(MockEmail::default());

        let state = AppState::with_services(
            config,
            Services {
                directory: directory.clone(),
                sms: sms.clone(),
                email: email.clone(),
                platform: platform.clone(),
                launcher: launcher.clone(),
            },
        );

        Self {
            state,
            platform,
            launcher,
            directory,
            sms,
            email,
        }
    }

    /// Register the caller room with the caller's SIP leg connected
    pub fn caller_dials_in(&self) {
        let caller = Participant::new(CALLER_IDENTITY)
            .with_name("Anna Svensson")
            .with_kind(ParticipantKind::Sip);
        self.state
            .router
            .handle_participant_joined(CALLER_ROOM, &caller);
    }

    pub fn attempt(&self) -> Option<TransferAttempt> {
        self.state.transfers.attempts().into_iter().next()
    }

    /// Wait until the single in-flight attempt is waiting for the employee
    pub async fn wait_for_decision_phase(&self) -> TransferAttempt {
        for _ in 0..500 {
            if let Some(attempt) = self.attempt() {
                if attempt.status == TransferStatus::AwaitingDecision {
                    return attempt;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("transfer never reached awaiting_decision");
    }
}
