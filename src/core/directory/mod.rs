//! Employee directory
//!
//! Read access to employees, departments and company information, plus the
//! two writes the switchboard needs: call logs and taken messages.
//!
//! # Implementations
//!
//! - [`SupabaseDirectory`]: PostgREST tables and RPC functions over HTTP
//! - [`CachedDirectory`]: wraps any client and caches company info and departments

mod cached;
mod rest;

pub use cached::CachedDirectory;
pub use rest::SupabaseDirectory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub status: String,
}

impl EmployeeRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub routing_priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfoRecord {
    pub id: String,
    pub company_name: String,
    #[serde(default)]
    pub greeting_message: String,
    #[serde(default)]
    pub business_hours: Value,
    #[serde(default)]
    pub settings: Value,
}

/// Row written to `call_logs`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallLogEntry {
    pub caller_phone: String,
    pub caller_name: Option<String>,
    pub employee_id: Option<String>,
    pub room_name: Option<String>,
    pub status: String,
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Failed,
    Read,
}

/// Row written to `messages`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMessage {
    pub from_caller: String,
    pub to_employee_id: String,
    pub message_text: String,
    pub delivered_via: Vec<String>,
    pub status: MessageStatus,
}

impl NewMessage {
    pub fn pending(from_caller: &str, to_employee_id: &str, message_text: &str) -> Self {
        Self {
            from_caller: from_caller.to_string(),
            to_employee_id: to_employee_id.to_string(),
            message_text: message_text.to_string(),
            delivered_via: vec!["voice".to_string()],
            status: MessageStatus::Pending,
        }
    }
}

/// Final delivery state of a saved message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageStatusUpdate {
    pub status: MessageStatus,
    pub delivered_via: Vec<String>,
    pub delivery_details: Value,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory not configured: {0}")]
    NotConfigured(String),

    #[error("Directory request failed: {0}")]
    Request(String),

    #[error("Directory returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid directory response: {0}")]
    InvalidResponse(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

// =============================================================================
// Client
// =============================================================================

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Search available employees by name or role, optionally within a department
    async fn search_employees(
        &self,
        query: &str,
        department: Option<&str>,
    ) -> DirectoryResult<Vec<EmployeeRecord>>;

    async fn get_employee_by_id(&self, employee_id: &str) -> DirectoryResult<Option<EmployeeRecord>>;

    async fn get_employee_by_phone(&self, phone: &str) -> DirectoryResult<Option<EmployeeRecord>>;

    async fn is_employee_available(&self, employee_id: &str) -> DirectoryResult<bool>;

    /// Departments ordered by routing priority
    async fn get_departments(&self) -> DirectoryResult<Vec<DepartmentRecord>>;

    async fn get_company_info(&self) -> DirectoryResult<Option<CompanyInfoRecord>>;

    async fn is_company_open(&self) -> DirectoryResult<bool>;

    /// Returns the id of the new call log row
    async fn log_call(&self, entry: &CallLogEntry) -> DirectoryResult<String>;

    /// Returns the id of the new message row
    async fn save_message(&self, message: &NewMessage) -> DirectoryResult<String>;

    async fn update_message_status(
        &self,
        message_id: &str,
        update: &MessageStatusUpdate,
    ) -> DirectoryResult<()>;
}

/// Canonical department name for a spoken alias
///
/// Unknown names pass through unchanged; empty input means "any department".
pub fn canonical_department(department: &str) -> Option<String> {
    let trimmed = department.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = match trimmed.to_lowercase().as_str() {
        "ledningen" | "management" => "Management",
        "försäljning" | "sales" => "Sales",
        "kundservice" | "support" => "Support",
        _ => trimmed,
    };
    Some(canonical.to_string())
}
