//! Warm transfer
//!
//! A warm transfer briefs the employee in a separate consultation room before
//! the caller is connected. The employee answers with a [`Decision`]; the
//! orchestrator then relocates the employee into the caller's room or falls
//! back to message-taking.

mod attempt;
mod decision;
mod orchestrator;

pub use attempt::{
    FailureReason, RejectionReason, TransferAttempt, TransferError, TransferOutcome,
    TransferResult, TransferStatus, consultation_room_name, employee_identity, is_consultation_room,
    new_transfer_id,
};
pub use decision::{
    Decision, DecisionReceiver, DecisionSignal, RecordOutcome, RecordedDecision, WaitOutcome,
    decision_channel,
};
pub use orchestrator::{
    CallerDetails, EmployeeTarget, TransferRequest, WarmTransferOrchestrator,
};
