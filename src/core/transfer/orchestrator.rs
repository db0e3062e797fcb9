use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::attempt::{
    FailureReason, RejectionReason, TransferAttempt, TransferError, TransferOutcome,
    TransferResult, TransferStatus, consultation_room_name, employee_identity, new_transfer_id,
};
use super::decision::{Decision, WaitOutcome, decision_channel};
use crate::config::TransferConfig;
use crate::core::agents::consultation::{ConsultationAgent, ConsultationBrief};
use crate::core::platform::{MediaPlatform, OutboundCallRequest};
use crate::core::router::CallRouter;
use crate::core::session::{SessionHandle, SessionLauncher, SessionRequest, SessionRole};
use crate::core::sweeper::Sweeper;

/// Employee the caller should be connected to
#[derive(Debug, Clone)]
pub struct EmployeeTarget {
    pub id: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct CallerDetails {
    pub name: String,
    pub phone: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub caller_room: String,
    pub employee: EmployeeTarget,
    pub caller: CallerDetails,
    pub conversation_summary: Option<String>,
}

/// Everything an attempt acquired that must be released when it ends
#[derive(Default)]
struct AttemptResources {
    consultation_room: Option<String>,
    room_created: bool,
    session: Option<SessionHandle>,
}

/// Drives warm transfers from consultation room setup to the final outcome
pub struct WarmTransferOrchestrator {
    platform: Arc<dyn MediaPlatform>,
    launcher: Arc<dyn SessionLauncher>,
    router: Arc<CallRouter>,
    config: TransferConfig,
    attempts: DashMap<String, TransferAttempt>,
    /// Live consultation agents keyed by consultation room name
    consultations: DashMap<String, Arc<ConsultationAgent>>,
    /// Abort handles for attempts still in flight
    cancellations: DashMap<String, CancellationToken>,
    sweeper: Sweeper,
}

impl WarmTransferOrchestrator {
    pub fn new(
        platform: Arc<dyn MediaPlatform>,
        launcher: Arc<dyn SessionLauncher>,
        router: Arc<CallRouter>,
        config: TransferConfig,
    ) -> Self {
        Self {
            platform,
            launcher,
            router,
            config,
            attempts: DashMap::new(),
            consultations: DashMap::new(),
            cancellations: DashMap::new(),
            sweeper: Sweeper::new(),
        }
    }

    /// Run one transfer attempt to completion
    ///
    /// Never returns an error: anything unexpected becomes a failed outcome and
    /// every acquired resource is released before returning.
    pub async fn execute(&self, request: TransferRequest) -> TransferOutcome {
        let transfer_id = new_transfer_id();
        self.attempts.insert(
            transfer_id.clone(),
            TransferAttempt::new(
                transfer_id.clone(),
                &request.caller_room,
                &request.employee.id,
                &request.employee.name,
                &request.employee.phone,
            ),
        );

        self.router.touch_room(&request.caller_room);
        let cancel = self
            .router
            .caller_departure(&request.caller_room)
            .unwrap_or_default()
            .child_token();
        self.cancellations.insert(transfer_id.clone(), cancel.clone());

        info!(
            transfer_id = %transfer_id,
            caller_room = %request.caller_room,
            employee_id = %request.employee.id,
            "Starting warm transfer"
        );

        let mut resources = AttemptResources::default();
        let outcome = match self.run(&transfer_id, &request, &cancel, &mut resources).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(transfer_id = %transfer_id, error = %e, "Warm transfer failed unexpectedly");
                TransferOutcome::failed(&transfer_id, FailureReason::Internal)
            }
        };

        self.release(&transfer_id, resources).await;

        if let Some(mut attempt) = self.attempts.get_mut(&transfer_id) {
            attempt.finish(outcome.status());
        }

        info!(
            transfer_id = %transfer_id,
            status = outcome.status().as_str(),
            "Warm transfer finished"
        );
        outcome
    }

    async fn run(
        &self,
        transfer_id: &str,
        request: &TransferRequest,
        cancel: &CancellationToken,
        resources: &mut AttemptResources,
    ) -> TransferResult<TransferOutcome> {
        // Consultation room
        let Some(room) = consultation_room_name(&request.employee.phone, transfer_id) else {
            warn!(
                transfer_id = %transfer_id,
                employee_phone = %request.employee.phone,
                "Employee phone has no dialable digits"
            );
            return Ok(TransferOutcome::failed(
                transfer_id,
                FailureReason::ConsultationRoomUnavailable,
            ));
        };
        resources.consultation_room = Some(room.clone());

        if let Err(e) = self.platform.create_room(&room).await {
            warn!(transfer_id = %transfer_id, room_name = %room, error = %e, "Failed to create consultation room");
            return Ok(TransferOutcome::failed(
                transfer_id,
                FailureReason::ConsultationRoomUnavailable,
            ));
        }
        resources.room_created = true;
        let caller_info = self.router.caller_info(&request.caller_room).unwrap_or_default();
        self.router.register_room(&room, caller_info, None);
        self.update(transfer_id, |attempt| {
            attempt.consultation_room_name = Some(room.clone());
            attempt.advance(TransferStatus::ConsultationRoomReady)
        })?;

        // Decision channel and the agent that feeds it
        let (signal, receiver) = decision_channel(transfer_id);
        let brief = ConsultationBrief {
            caller_name: request.caller.name.clone(),
            caller_phone: request.caller.phone.clone(),
            caller_reason: request.caller.reason.clone(),
            conversation_summary: request.conversation_summary.clone(),
        };
        let agent = Arc::new(ConsultationAgent::new(&room, &brief, signal));
        self.consultations.insert(room.clone(), agent.clone());

        // Employee leg and consultation session, concurrently
        let identity = employee_identity(&request.employee.phone);
        let call = OutboundCallRequest {
            room_name: room.clone(),
            phone_number: request.employee.phone.clone(),
            participant_identity: identity.clone(),
            participant_name: request.employee.name.clone(),
            participant_metadata: Some(
                json!({ "transfer_id": transfer_id, "role": "employee" }).to_string(),
            ),
        };
        let session_request = SessionRequest {
            room_name: room.clone(),
            role: SessionRole::Consultation,
            metadata: json!({
                "transfer_id": transfer_id,
                "caller_room": request.caller_room,
                "caller_name": request.caller.name,
                "caller_phone": request.caller.phone,
                "caller_reason": request.caller.reason,
                "greeting": agent.greeting(),
            }),
        };

        let (placed, launched) = tokio::join!(
            self.platform.place_outbound_call(&call),
            self.launcher.launch(session_request)
        );

        if let Ok(session) = &launched {
            resources.session = Some(session.clone());
            self.router.attach_session(&room, session.clone());
        }

        let placed = match placed {
            Ok(placed) => placed,
            Err(e) => {
                warn!(transfer_id = %transfer_id, error = %e, "Failed to place call to employee");
                return Ok(TransferOutcome::failed(
                    transfer_id,
                    FailureReason::EmployeeUnreachable,
                ));
            }
        };
        let session = match launched {
            Ok(session) => session,
            Err(e) => {
                warn!(transfer_id = %transfer_id, error = %e, "Failed to launch consultation session");
                return Ok(TransferOutcome::failed(
                    transfer_id,
                    FailureReason::ConsultationSessionUnavailable,
                ));
            }
        };

        let identity = placed.participant_identity;
        self.update(transfer_id, |attempt| {
            attempt.employee_identity = Some(identity.clone());
            attempt.advance(TransferStatus::Calling)
        })?;
        info!(
            transfer_id = %transfer_id,
            room_name = %room,
            employee_identity = %identity,
            sip_call_id = ?placed.sip_call_id,
            "Employee call placed"
        );

        agent.begin(session.as_ref()).await;

        // Bounded wait for the employee's answer
        self.update(transfer_id, |attempt| {
            attempt.advance(TransferStatus::AwaitingDecision)
        })?;
        let waited = receiver.wait(self.config.decision_timeout(), cancel).await;

        let outcome = match waited {
            WaitOutcome::Decided(recorded) => {
                let decision = recorded.decision;
                let note = recorded.note.clone();
                self.update(transfer_id, |attempt| {
                    attempt.decision = Some(recorded);
                    Ok(())
                })?;
                match decision {
                    Decision::Accept => {
                        self.relocate(transfer_id, &room, &identity, &request.caller_room)
                            .await
                    }
                    Decision::Decline => TransferOutcome::Rejected {
                        transfer_id: transfer_id.to_string(),
                        reason: RejectionReason::Declined,
                    },
                    Decision::Message => TransferOutcome::Message {
                        transfer_id: transfer_id.to_string(),
                        note,
                    },
                }
            }
            WaitOutcome::TimedOut => {
                info!(transfer_id = %transfer_id, "No decision before timeout");
                TransferOutcome::Rejected {
                    transfer_id: transfer_id.to_string(),
                    reason: RejectionReason::TimedOut,
                }
            }
            WaitOutcome::Abandoned => {
                info!(transfer_id = %transfer_id, "Caller left during consultation");
                TransferOutcome::failed(transfer_id, FailureReason::Abandoned)
            }
            WaitOutcome::Closed => {
                error!(transfer_id = %transfer_id, "Decision signal closed without a decision");
                TransferOutcome::failed(transfer_id, FailureReason::Internal)
            }
        };
        Ok(outcome)
    }

    /// Move the employee into the caller's room after confirming they are connected
    async fn relocate(
        &self,
        transfer_id: &str,
        consultation_room: &str,
        identity: &str,
        caller_room: &str,
    ) -> TransferOutcome {
        let present = match self.platform.list_participants(consultation_room).await {
            Ok(participants) => participants.iter().any(|p| p.identity == identity),
            Err(e) => {
                warn!(transfer_id = %transfer_id, error = %e, "Failed to list consultation participants");
                false
            }
        };
        if !present {
            warn!(
                transfer_id = %transfer_id,
                employee_identity = %identity,
                "Employee not connected to consultation room"
            );
            return TransferOutcome::failed(transfer_id, FailureReason::EmployeeNotConnected);
        }

        if let Err(e) = self
            .platform
            .move_participant(consultation_room, identity, caller_room)
            .await
        {
            error!(transfer_id = %transfer_id, error = %e, "Failed to move employee into caller room");
            return TransferOutcome::failed(transfer_id, FailureReason::RelocationFailed);
        }

        info!(
            transfer_id = %transfer_id,
            employee_identity = %identity,
            caller_room = %caller_room,
            "Employee connected to caller"
        );
        TransferOutcome::Completed {
            transfer_id: transfer_id.to_string(),
            consultation_room: consultation_room.to_string(),
            employee_identity: identity.to_string(),
        }
    }

    /// Best-effort teardown of the session and consultation room
    async fn release(&self, transfer_id: &str, resources: AttemptResources) {
        self.cancellations.remove(transfer_id);

        let Some(room) = resources.consultation_room else {
            return;
        };
        self.consultations.remove(&room);

        if let Some(session) = resources.session {
            if let Err(e) = session.close().await {
                warn!(transfer_id = %transfer_id, room_name = %room, error = %e, "Failed to close consultation session");
            }
        }

        if resources.room_created {
            self.router.remove_room(&room);
            if let Err(e) = self.platform.delete_room(&room).await {
                warn!(transfer_id = %transfer_id, room_name = %room, error = %e, "Failed to delete consultation room");
            }
        }
    }

    fn update<F>(&self, transfer_id: &str, f: F) -> TransferResult<()>
    where
        F: FnOnce(&mut TransferAttempt) -> TransferResult<()>,
    {
        let mut attempt = self
            .attempts
            .get_mut(transfer_id)
            .ok_or_else(|| TransferError::NotFound(transfer_id.to_string()))?;
        f(&mut attempt)
    }

    pub fn attempt(&self, transfer_id: &str) -> Option<TransferAttempt> {
        self.attempts.get(transfer_id).map(|entry| entry.clone())
    }

    pub fn attempts(&self) -> Vec<TransferAttempt> {
        let mut attempts: Vec<TransferAttempt> =
            self.attempts.iter().map(|entry| entry.value().clone()).collect();
        attempts.sort_by(|a, b| a.transfer_id.cmp(&b.transfer_id));
        attempts
    }

    /// Agent serving a consultation room, for decisions arriving over HTTP
    pub fn consultation_agent(&self, room_name: &str) -> Option<Arc<ConsultationAgent>> {
        self.consultations.get(room_name).map(|entry| entry.clone())
    }

    /// Drop attempts older than the expiry; in-flight ones are failed and aborted
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let expiry = self.config.attempt_expiry();
        let expired: Vec<String> = self
            .attempts
            .iter()
            .filter(|entry| now.saturating_duration_since(entry.created_at) > expiry)
            .map(|entry| entry.key().clone())
            .collect();

        for transfer_id in &expired {
            if let Some((_, mut attempt)) = self.attempts.remove(transfer_id) {
                if attempt.finish(TransferStatus::Failed) {
                    warn!(transfer_id = %transfer_id, "Expired in-flight transfer marked failed");
                }
            }
            if let Some((_, token)) = self.cancellations.remove(transfer_id) {
                token.cancel();
            }
        }
        expired.len()
    }

    pub fn start_expiry_sweep(self: &Arc<Self>) {
        let orchestrator = Arc::downgrade(self);
        self.sweeper
            .start("transfers", self.config.expiry_sweep_interval(), move || {
                let orchestrator = orchestrator.clone();
                async move {
                    if let Some(orchestrator) = orchestrator.upgrade() {
                        let removed = orchestrator.sweep_expired();
                        if removed > 0 {
                            info!(count = removed, "Expired transfer attempts removed");
                        }
                    }
                }
            });
    }

    pub async fn stop_expiry_sweep(&self) {
        self.sweeper.stop().await;
    }
}
