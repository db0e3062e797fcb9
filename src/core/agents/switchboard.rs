//! Switchboard agent
//!
//! The receptionist persona that answers every inbound call. Each tool is a thin
//! call into the directory, notifiers or transfer orchestrator and returns the
//! sentence the agent should say. Collaborator failures never escape: they are
//! logged and turned into an apologetic reply.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info, warn};

use crate::core::directory::{
    CallLogEntry, DirectoryClient, EmployeeRecord, MessageStatus, MessageStatusUpdate, NewMessage,
    canonical_department,
};
use crate::core::notify::{
    CallerSummary, EmailSender, NotificationResult, SmsSender, message_email, message_sms,
    transfer_email, transfer_sms,
};
use crate::core::router::{CallRouter, CallerInfo, UNKNOWN_CALLER_NAME, UNKNOWN_PHONE};
use crate::core::session::{AgentTools, FunctionCallRequest, ToolDefinition};
use crate::core::transfer::{
    CallerDetails, EmployeeTarget, TransferRequest, WarmTransferOrchestrator,
};

pub const DEFAULT_GREETING: &str = "Thank you for calling. How may I direct your call?";
const DEFAULT_REASON: &str = "No specific reason provided";
const DIRECTORY_UNAVAILABLE: &str =
    "Sorry, I'm having trouble accessing the employee directory right now. Please try again later.";
const TRANSFER_UNAVAILABLE: &str =
    "I'm having trouble with the transfer right now. Would you like me to take a message instead?";

pub struct SwitchboardAgent {
    directory: Arc<dyn DirectoryClient>,
    sms: Arc<dyn SmsSender>,
    email: Arc<dyn EmailSender>,
    router: Arc<CallRouter>,
    transfers: Arc<WarmTransferOrchestrator>,
}

impl SwitchboardAgent {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        sms: Arc<dyn SmsSender>,
        email: Arc<dyn EmailSender>,
        router: Arc<CallRouter>,
        transfers: Arc<WarmTransferOrchestrator>,
    ) -> Self {
        Self {
            directory,
            sms,
            email,
            router,
            transfers,
        }
    }

    // =========================================================================
    // Call start
    // =========================================================================

    /// Opening line for a call, personalised when the caller's name is known
    pub async fn greeting(&self, room_name: &str) -> String {
        let greeting = self.get_company_greeting().await;
        match self.router.caller_info(room_name) {
            Some(caller) if caller.has_name() => format!("Hello {}, {greeting}", caller.display_name),
            _ => greeting,
        }
    }

    pub async fn get_company_greeting(&self) -> String {
        match self.directory.get_company_info().await {
            Ok(Some(info)) if !info.greeting_message.trim().is_empty() => info.greeting_message,
            Ok(_) => DEFAULT_GREETING.to_string(),
            Err(e) => {
                error!(error = %e, "Failed to load company greeting");
                DEFAULT_GREETING.to_string()
            }
        }
    }

    pub fn get_current_date_and_time(&self) -> String {
        let now = OffsetDateTime::now_utc();
        let format = format_description!(
            "[month repr:long] [day padding:none], [year] at [hour repr:12 padding:none]:[minute] [period]"
        );
        match now.format(&format) {
            Ok(formatted) => format!("The current date and time is {formatted} UTC"),
            Err(e) => {
                error!(error = %e, "Failed to format current time");
                "Sorry, I can't tell the time right now.".to_string()
            }
        }
    }

    // =========================================================================
    // Directory
    // =========================================================================

    pub async fn search_employees(&self, query: &str, department: &str) -> String {
        let department = canonical_department(department);
        info!(query = %query, department = ?department, "Searching employees");

        let employees = match self
            .directory
            .search_employees(query, department.as_deref())
            .await
        {
            Ok(employees) => employees,
            Err(e) => {
                error!(error = %e, "Employee search failed");
                return DIRECTORY_UNAVAILABLE.to_string();
            }
        };

        if employees.is_empty() {
            let names = match self.directory.get_departments().await {
                Ok(departments) => departments
                    .into_iter()
                    .map(|d| d.name)
                    .collect::<Vec<_>>()
                    .join(", "),
                Err(e) => {
                    warn!(error = %e, "Failed to list departments");
                    String::new()
                }
            };
            if names.is_empty() {
                return "Sorry, I couldn't find any available employees matching your search."
                    .to_string();
            }
            return format!(
                "Sorry, I couldn't find any available employees matching your search. \
                 Available departments are: {names}."
            );
        }

        let mut result = format!("Found {} available employee(s):\n\n", employees.len());
        for employee in &employees {
            result.push_str(&describe_employee(employee));
            result.push('\n');
        }
        result
    }

    pub async fn get_employee_by_phone(&self, phone_number: &str) -> String {
        match self.directory.get_employee_by_phone(phone_number).await {
            Ok(Some(employee)) => format!(
                "Found employee:\n\n{}  Email: {}\n  Status: {}\n",
                describe_employee(&employee),
                employee.email,
                employee.status
            ),
            Ok(None) => {
                format!("Sorry, I couldn't find any employee with phone number {phone_number}.")
            }
            Err(e) => {
                error!(error = %e, "Employee lookup by phone failed");
                DIRECTORY_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn check_employee_availability(&self, employee_id: &str) -> String {
        match self.directory.is_employee_available(employee_id).await {
            Ok(true) => format!("Employee {employee_id} is currently available."),
            Ok(false) => format!("Employee {employee_id} is not available at the moment."),
            Err(e) => {
                error!(employee_id = %employee_id, error = %e, "Availability check failed");
                "Sorry, I couldn't check the employee's availability right now.".to_string()
            }
        }
    }

    pub async fn get_departments(&self) -> String {
        let departments = match self.directory.get_departments().await {
            Ok(departments) => departments,
            Err(e) => {
                error!(error = %e, "Failed to load departments");
                return "Sorry, I couldn't retrieve the department list right now.".to_string();
            }
        };
        if departments.is_empty() {
            return "No departments are currently configured.".to_string();
        }

        let mut result = String::from("Available departments:\n\n");
        for department in departments {
            result.push_str(&format!("• {}\n", department.name));
            if let Some(description) = department.description.filter(|d| !d.is_empty()) {
                result.push_str(&format!("  {description}\n"));
            }
        }
        result
    }

    pub async fn check_company_hours(&self) -> String {
        match self.directory.is_company_open().await {
            Ok(true) => "Yes, we are currently open and available to help you.".to_string(),
            Ok(false) => "We are currently closed, but I can still take a message for you or \
                          help you find the information you need."
                .to_string(),
            Err(e) => {
                error!(error = %e, "Company hours check failed");
                "I'm having trouble checking our business hours right now, but I'm here to help you."
                    .to_string()
            }
        }
    }

    // =========================================================================
    // Transfer and messages
    // =========================================================================

    async fn find_employee(&self, employee_id: &str) -> Result<EmployeeRecord, String> {
        match self.directory.get_employee_by_id(employee_id).await {
            Ok(Some(employee)) => Ok(employee),
            Ok(None) => Err(format!("Sorry, I couldn't find employee with ID {employee_id}.")),
            Err(e) => {
                error!(employee_id = %employee_id, error = %e, "Employee lookup failed");
                Err(DIRECTORY_UNAVAILABLE.to_string())
            }
        }
    }

    /// Caller fields from the tool call, falling back to what the router extracted
    fn caller_for(&self, room_name: &str, phone: Option<String>, name: Option<String>) -> (String, String) {
        let known = self.router.caller_info(room_name).unwrap_or_else(CallerInfo::default);
        let phone = phone.unwrap_or(known.phone);
        let name = name.unwrap_or(known.display_name);
        (phone, name)
    }

    async fn send_sms(&self, to: &str, body: &str) -> NotificationResult {
        if to.trim().is_empty() {
            return NotificationResult::failed("no phone number on file");
        }
        self.sms.send_sms(to, body).await
    }

    async fn send_email(&self, to: &str, subject: &str, html: &str) -> NotificationResult {
        if to.trim().is_empty() {
            return NotificationResult::failed("no email address on file");
        }
        self.email.send_email(to, subject, html, true).await
    }

    async fn log_call(&self, entry: CallLogEntry) {
        if let Err(e) = self.directory.log_call(&entry).await {
            warn!(room_name = ?entry.room_name, error = %e, "Failed to log call");
        }
    }

    pub async fn initiate_warm_transfer(
        &self,
        room_name: &str,
        employee_id: &str,
        caller_phone: Option<String>,
        caller_name: Option<String>,
        caller_reason: Option<String>,
        conversation_summary: Option<String>,
    ) -> String {
        let employee = match self.find_employee(employee_id).await {
            Ok(employee) => employee,
            Err(reply) => return reply,
        };
        let employee_name = employee.full_name();

        match self.directory.is_employee_available(employee_id).await {
            Ok(true) => {}
            Ok(false) => {
                return format!(
                    "Sorry, {employee_name} is not available at the moment. \
                     Would you like me to take a message instead?"
                );
            }
            Err(e) => {
                error!(employee_id = %employee_id, error = %e, "Availability check failed");
                return TRANSFER_UNAVAILABLE.to_string();
            }
        }

        let (caller_phone, caller_name) = self.caller_for(room_name, caller_phone, caller_name);
        let caller_reason = caller_reason.unwrap_or_else(|| DEFAULT_REASON.to_string());

        let caller = CallerSummary {
            name: &caller_name,
            phone: &caller_phone,
            reason: &caller_reason,
        };
        let sms_body = transfer_sms(&employee_name, &caller);
        let (subject, html) = transfer_email(&employee_name, &caller);
        let (sms, email) = tokio::join!(
            self.send_sms(&employee.phone_number, &sms_body),
            self.send_email(&employee.email, &subject, &html)
        );
        info!(
            employee_id = %employee_id,
            sms = sms.success,
            email = email.success,
            "Transfer heads-up sent"
        );

        let outcome = self
            .transfers
            .execute(TransferRequest {
                caller_room: room_name.to_string(),
                employee: EmployeeTarget {
                    id: employee.id.clone(),
                    name: employee_name.clone(),
                    phone: employee.phone_number.clone(),
                },
                caller: CallerDetails {
                    name: caller_name.clone(),
                    phone: caller_phone.clone(),
                    reason: caller_reason,
                },
                conversation_summary,
            })
            .await;

        let status = outcome.status();
        self.log_call(CallLogEntry {
            caller_phone,
            caller_name: Some(caller_name).filter(|n| n != UNKNOWN_CALLER_NAME),
            employee_id: Some(employee.id.clone()),
            room_name: Some(room_name.to_string()),
            status: format!("transfer_{}", status.as_str()),
            outcome: Some(format!(
                "Warm transfer to {employee_name}: {}",
                status.as_str()
            )),
        })
        .await;

        outcome.caller_message(&employee_name)
    }

    pub async fn take_message(
        &self,
        room_name: &str,
        employee_id: &str,
        message_text: &str,
        caller_phone: Option<String>,
    ) -> String {
        let employee = match self.find_employee(employee_id).await {
            Ok(employee) => employee,
            Err(reply) => return reply,
        };
        let employee_name = employee.full_name();
        let (caller_phone, _) = self.caller_for(room_name, caller_phone, None);

        let message_id = match self
            .directory
            .save_message(&NewMessage::pending(&caller_phone, employee_id, message_text))
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!(employee_id = %employee_id, error = %e, "Failed to save message");
                None
            }
        };

        let sms_body = message_sms(&employee_name, &caller_phone, message_text);
        let (subject, html) = message_email(&employee_name, &caller_phone, message_text);
        let (sms, email) = tokio::join!(
            self.send_sms(&employee.phone_number, &sms_body),
            self.send_email(&employee.email, &subject, &html)
        );

        let mut delivered_via = Vec::new();
        if sms.success {
            delivered_via.push("sms".to_string());
        }
        if email.success {
            delivered_via.push("email".to_string());
        }

        if let Some(message_id) = &message_id {
            let update = MessageStatusUpdate {
                status: if delivered_via.is_empty() {
                    MessageStatus::Failed
                } else {
                    MessageStatus::Delivered
                },
                delivered_via: delivered_via.clone(),
                delivery_details: json!({ "sms": sms, "email": email }),
            };
            if let Err(e) = self.directory.update_message_status(message_id, &update).await {
                warn!(message_id = %message_id, error = %e, "Failed to update message status");
            }
        }

        info!(
            employee_id = %employee_id,
            message_id = ?message_id,
            delivered_via = ?delivered_via,
            "Message taken"
        );

        self.log_call(CallLogEntry {
            caller_phone: caller_phone.clone(),
            caller_name: None,
            employee_id: Some(employee.id.clone()),
            room_name: Some(room_name.to_string()),
            status: "message_taken".to_string(),
            outcome: Some(format!(
                "Message taken for {employee_name}: {}",
                message_text.chars().take(100).collect::<String>()
            )),
        })
        .await;

        if message_id.is_none() && delivered_via.is_empty() {
            return "Sorry, I'm having trouble recording your message right now. Please try again."
                .to_string();
        }

        let delivery = match delivered_via.as_slice() {
            [] => " They will receive it as soon as possible.".to_string(),
            [one] => format!(" I've sent it to them by {}.", channel_name(one)),
            _ => " I've sent it to them by text message and email.".to_string(),
        };
        format!(
            "I've recorded your message for {employee_name}.{delivery} \
             Is there anything else I can help you with?"
        )
    }
}

fn channel_name(channel: &str) -> &str {
    match channel {
        "sms" => "text message",
        other => other,
    }
}

fn describe_employee(employee: &EmployeeRecord) -> String {
    let roles = if employee.roles.is_empty() {
        "N/A".to_string()
    } else {
        employee.roles.join(", ")
    };
    format!(
        "• {}\n  Department: {}\n  Phone: {}\n  Office: {}\n  Roles: {}\n  ID: {}\n",
        employee.full_name(),
        employee.department_name.as_deref().unwrap_or("N/A"),
        employee.phone_number,
        employee.office.as_deref().unwrap_or("N/A"),
        roles,
        employee.id
    )
}

fn missing(param: &str) -> String {
    format!("I need the {} to do that.", param.replace('_', " "))
}

#[async_trait]
impl AgentTools for SwitchboardAgent {
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "search_employees",
                "Search for available employees by name, role, or department",
                &[
                    ("query", "Employee name or role to search for", false),
                    ("department", "Department name, e.g. Management, Sales, Support", false),
                ],
            ),
            ToolDefinition::function(
                "check_employee_availability",
                "Check if a specific employee is available",
                &[("employee_id", "The ID of the employee to check", true)],
            ),
            ToolDefinition::function("get_departments", "List all departments", &[]),
            ToolDefinition::function(
                "initiate_warm_transfer",
                "Brief an employee in a consultation call and connect the caller if they accept",
                &[
                    ("employee_id", "The ID of the employee to transfer to", true),
                    ("caller_phone", "The caller's phone number, if known", false),
                    ("caller_name", "The caller's name, if known", false),
                    ("caller_reason", "Why the caller is calling", false),
                    ("conversation_summary", "Short summary of the conversation so far", false),
                ],
            ),
            ToolDefinition::function(
                "take_message",
                "Record a message for an employee and deliver it by SMS and email",
                &[
                    ("employee_id", "The ID of the employee the message is for", true),
                    ("message_text", "The message content", true),
                    ("caller_phone", "The caller's phone number, if known", false),
                ],
            ),
            ToolDefinition::function(
                "check_company_hours",
                "Check if the company is currently open",
                &[],
            ),
            ToolDefinition::function(
                "get_company_greeting",
                "Get the company greeting message",
                &[],
            ),
            ToolDefinition::function(
                "get_current_date_and_time",
                "Get the current date and time",
                &[],
            ),
            ToolDefinition::function(
                "get_employee_by_phone",
                "Look up an employee by phone number",
                &[("phone_number", "The phone number to search for", true)],
            ),
        ]
    }

    async fn call_tool(&self, request: &FunctionCallRequest) -> String {
        let room = request.room_name.as_str();
        info!(room_name = %room, tool = %request.name, "Switchboard tool called");

        match request.name.as_str() {
            "search_employees" => {
                self.search_employees(
                    &request.arg("query").unwrap_or_default(),
                    &request.arg("department").unwrap_or_default(),
                )
                .await
            }
            "check_employee_availability" => match request.arg("employee_id") {
                Some(id) => self.check_employee_availability(&id).await,
                None => missing("employee_id"),
            },
            "get_departments" => self.get_departments().await,
            "initiate_warm_transfer" => match request.arg("employee_id") {
                Some(id) => {
                    self.initiate_warm_transfer(
                        room,
                        &id,
                        request.arg("caller_phone").filter(|p| p != UNKNOWN_PHONE),
                        request.arg("caller_name"),
                        request.arg("caller_reason"),
                        request.arg("conversation_summary"),
                    )
                    .await
                }
                None => missing("employee_id"),
            },
            "take_message" => match (request.arg("employee_id"), request.arg("message_text")) {
                (Some(id), Some(text)) => {
                    self.take_message(room, &id, &text, request.arg("caller_phone"))
                        .await
                }
                (None, _) => missing("employee_id"),
                (_, None) => missing("message_text"),
            },
            "check_company_hours" => self.check_company_hours().await,
            "get_company_greeting" => self.get_company_greeting().await,
            "get_current_date_and_time" => self.get_current_date_and_time(),
            "get_employee_by_phone" => match request.arg("phone_number") {
                Some(phone) => self.get_employee_by_phone(&phone).await,
                None => missing("phone_number"),
            },
            other => {
                warn!(tool = %other, "Unknown switchboard tool");
                format!("Sorry, I don't know how to {}.", other.replace('_', " "))
            }
        }
    }
}
