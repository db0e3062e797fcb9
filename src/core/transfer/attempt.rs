use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use super::decision::RecordedDecision;
use crate::core::platform::PlatformError;
use crate::core::session::SessionError;
use crate::utils::{compact_timestamp, phone_digits};

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    ConsultationRoomReady,
    Calling,
    AwaitingDecision,
    Completed,
    Rejected,
    Message,
    Failed,
}

impl TransferStatus {
    /// Position in the lifecycle; all terminal states share the last rank
    fn rank(&self) -> u8 {
        match self {
            TransferStatus::Pending => 0,
            TransferStatus::ConsultationRoomReady => 1,
            TransferStatus::Calling => 2,
            TransferStatus::AwaitingDecision => 3,
            TransferStatus::Completed
            | TransferStatus::Rejected
            | TransferStatus::Message
            | TransferStatus::Failed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 4
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::ConsultationRoomReady => "consultation_room_ready",
            TransferStatus::Calling => "calling",
            TransferStatus::AwaitingDecision => "awaiting_decision",
            TransferStatus::Completed => "completed",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Message => "message",
            TransferStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Invalid transfer transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Transfer attempt not found: {0}")]
    NotFound(String),
}

pub type TransferResult<T> = Result<T, TransferError>;

// =============================================================================
// Attempt
// =============================================================================

/// One execution of the warm transfer workflow
#[derive(Debug, Clone, Serialize)]
pub struct TransferAttempt {
    pub transfer_id: String,
    pub caller_room_name: String,
    pub consultation_room_name: Option<String>,
    pub employee_id: String,
    pub employee_name: String,
    pub employee_phone: String,
    /// Identity of the employee's leg inside the consultation room
    pub employee_identity: Option<String>,
    pub status: TransferStatus,
    #[serde(skip)]
    pub created_at: Instant,
    pub decision: Option<RecordedDecision>,
}

impl TransferAttempt {
    pub fn new(
        transfer_id: String,
        caller_room_name: &str,
        employee_id: &str,
        employee_name: &str,
        employee_phone: &str,
    ) -> Self {
        Self {
            transfer_id,
            caller_room_name: caller_room_name.to_string(),
            consultation_room_name: None,
            employee_id: employee_id.to_string(),
            employee_name: employee_name.to_string(),
            employee_phone: employee_phone.to_string(),
            employee_identity: None,
            status: TransferStatus::Pending,
            created_at: Instant::now(),
            decision: None,
        }
    }

    /// Move forward in the lifecycle; never backwards, never out of a terminal state
    pub fn advance(&mut self, next: TransferStatus) -> TransferResult<()> {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return Err(TransferError::InvalidTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Set the terminal status; returns false if one was already set
    pub fn finish(&mut self, terminal: TransferStatus) -> bool {
        if self.status.is_terminal() || !terminal.is_terminal() {
            return false;
        }
        self.status = terminal;
        true
    }
}

/// `transfer_<timestamp>_<8 hex chars>`
pub fn new_transfer_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("transfer_{}_{}", compact_timestamp(), &suffix[..8])
}

/// `consultation_<timestamp>_<employee digits>_<suffix>`
///
/// `None` when the employee phone has no dialable digits.
const CONSULTATION_ROOM_PREFIX: &str = "consultation_";

/// Rooms created for the employee side of a transfer
pub fn is_consultation_room(room_name: &str) -> bool {
    room_name.starts_with(CONSULTATION_ROOM_PREFIX)
}

pub fn consultation_room_name(employee_phone: &str, transfer_id: &str) -> Option<String> {
    let digits = phone_digits(employee_phone);
    if digits.is_empty() {
        return None;
    }
    let suffix = transfer_id.rsplit('_').next().unwrap_or(transfer_id);
    Some(format!(
        "{CONSULTATION_ROOM_PREFIX}{}_{}_{}",
        compact_timestamp(),
        digits,
        suffix
    ))
}

pub fn employee_identity(employee_phone: &str) -> String {
    format!("employee_{}", phone_digits(employee_phone))
}

// =============================================================================
// Outcome
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Declined,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ConsultationRoomUnavailable,
    EmployeeUnreachable,
    ConsultationSessionUnavailable,
    EmployeeNotConnected,
    RelocationFailed,
    Abandoned,
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ConsultationRoomUnavailable => "could not prepare consultation room",
            FailureReason::EmployeeUnreachable => "could not reach employee",
            FailureReason::ConsultationSessionUnavailable => "could not start consultation",
            FailureReason::EmployeeNotConnected => "employee not connected",
            FailureReason::RelocationFailed => "could not connect employee to caller",
            FailureReason::Abandoned => "caller left before a decision",
            FailureReason::Internal => "internal error",
        }
    }
}

/// Final result of a transfer attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Completed {
        transfer_id: String,
        consultation_room: String,
        employee_identity: String,
    },
    Rejected {
        transfer_id: String,
        reason: RejectionReason,
    },
    Message {
        transfer_id: String,
        note: Option<String>,
    },
    Failed {
        transfer_id: String,
        reason: FailureReason,
    },
}

impl TransferOutcome {
    pub fn failed(transfer_id: &str, reason: FailureReason) -> Self {
        TransferOutcome::Failed {
            transfer_id: transfer_id.to_string(),
            reason,
        }
    }

    pub fn status(&self) -> TransferStatus {
        match self {
            TransferOutcome::Completed { .. } => TransferStatus::Completed,
            TransferOutcome::Rejected { .. } => TransferStatus::Rejected,
            TransferOutcome::Message { .. } => TransferStatus::Message,
            TransferOutcome::Failed { .. } => TransferStatus::Failed,
        }
    }

    pub fn transfer_id(&self) -> &str {
        match self {
            TransferOutcome::Completed { transfer_id, .. }
            | TransferOutcome::Rejected { transfer_id, .. }
            | TransferOutcome::Message { transfer_id, .. }
            | TransferOutcome::Failed { transfer_id, .. } => transfer_id,
        }
    }

    /// What the switchboard agent tells the caller
    pub fn caller_message(&self, employee_name: &str) -> String {
        match self {
            TransferOutcome::Completed { .. } => {
                format!("I'm connecting you to {employee_name} now. Please hold on.")
            }
            TransferOutcome::Rejected { .. } => format!(
                "I'm sorry, but {employee_name} is not available to take your call right now. \
                 Would you like me to take a message instead?"
            ),
            TransferOutcome::Message { .. } => format!(
                "{employee_name} would prefer to take a message. \
                 Would you like me to take a message for them instead?"
            ),
            TransferOutcome::Failed {
                reason: FailureReason::EmployeeUnreachable | FailureReason::EmployeeNotConnected,
                ..
            } => format!(
                "I'm sorry, I couldn't reach {employee_name}. Would you like me to take a message instead?"
            ),
            TransferOutcome::Failed { .. } => "I'm having trouble with the transfer right now. \
                 Would you like me to take a message instead?"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> TransferAttempt {
        TransferAttempt::new(
            new_transfer_id(),
            "call_1",
            "emp-1",
            "Erik Lund",
            "+46701234567",
        )
    }

    #[tokio::test]
    async fn test_status_advances_forward_only() {
        let mut attempt = attempt();
        attempt.advance(TransferStatus::ConsultationRoomReady).unwrap();
        attempt.advance(TransferStatus::AwaitingDecision).unwrap();
        assert!(attempt.advance(TransferStatus::Calling).is_err());
        assert_eq!(attempt.status, TransferStatus::AwaitingDecision);
    }

    #[tokio::test]
    async fn test_terminal_status_is_immutable() {
        let mut attempt = attempt();
        assert!(attempt.finish(TransferStatus::Rejected));
        assert!(!attempt.finish(TransferStatus::Completed));
        assert!(!attempt.finish(TransferStatus::Failed));
        assert!(attempt.advance(TransferStatus::Completed).is_err());
        assert_eq!(attempt.status, TransferStatus::Rejected);
    }

    #[tokio::test]
    async fn test_finish_requires_terminal_status() {
        let mut attempt = attempt();
        assert!(!attempt.finish(TransferStatus::Calling));
        assert_eq!(attempt.status, TransferStatus::Pending);
    }

    #[test]
    fn test_generated_names() {
        let id = new_transfer_id();
        assert!(id.starts_with("transfer_"));
        assert_eq!(id.rsplit('_').next().unwrap().len(), 8);

        let room = consultation_room_name("+46 70-123 45 67", &id).unwrap();
        assert!(room.starts_with("consultation_"));
        assert!(room.contains("_46701234567_"));
        assert!(room.ends_with(id.rsplit('_').next().unwrap()));

        assert!(consultation_room_name("reception", &id).is_none());
        assert!(is_consultation_room(&room));
        assert!(!is_consultation_room("call_20240101_120000_15551234567"));
        assert_eq!(employee_identity("+46701234567"), "employee_46701234567");
    }

    #[test]
    fn test_caller_messages() {
        let completed = TransferOutcome::Completed {
            transfer_id: "t".into(),
            consultation_room: "c".into(),
            employee_identity: "e".into(),
        };
        assert_eq!(
            completed.caller_message("Erik"),
            "I'm connecting you to Erik now. Please hold on."
        );

        let unreachable = TransferOutcome::failed("t", FailureReason::EmployeeUnreachable);
        assert!(unreachable.caller_message("Erik").contains("couldn't reach Erik"));
        assert!(unreachable.caller_message("Erik").contains("take a message"));

        let internal = TransferOutcome::failed("t", FailureReason::Internal);
        assert!(!internal.caller_message("Erik").contains("Erik"));
        assert_eq!(internal.status(), TransferStatus::Failed);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = TransferOutcome::Rejected {
            transfer_id: "t".into(),
            reason: RejectionReason::TimedOut,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "timed_out");
    }
}
