use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The employee's answer to a transfer request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Decline,
    Message,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Decline => "decline",
            Decision::Message => "message",
        }
    }
}

impl FromStr for Decision {
    type Err = String;

    /// `reject` is accepted as an alias of `decline`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Ok(Decision::Accept),
            "decline" | "reject" => Ok(Decision::Decline),
            "message" => Ok(Decision::Message),
            other => Err(format!("'{other}' is not one of accept, decline, message")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedDecision {
    pub decision: Decision,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// A decision was already recorded; it is kept
    AlreadyDecided(Decision),
}

/// Write side of the one-shot decision channel
///
/// The first recorded decision wins; later calls are logged and ignored.
pub struct DecisionSignal {
    transfer_id: String,
    sender: Mutex<Option<oneshot::Sender<RecordedDecision>>>,
    recorded: Mutex<Option<RecordedDecision>>,
}

/// Read side, consumed by the orchestrator's bounded wait
pub struct DecisionReceiver {
    receiver: oneshot::Receiver<RecordedDecision>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Decided(RecordedDecision),
    TimedOut,
    /// The wait was cancelled, e.g. the caller hung up
    Abandoned,
    /// The signal was dropped without a decision
    Closed,
}

/// Create a linked signal/receiver pair for one transfer attempt
pub fn decision_channel(transfer_id: &str) -> (Arc<DecisionSignal>, DecisionReceiver) {
    let (sender, receiver) = oneshot::channel();
    let signal = DecisionSignal {
        transfer_id: transfer_id.to_string(),
        sender: Mutex::new(Some(sender)),
        recorded: Mutex::new(None),
    };
    (Arc::new(signal), DecisionReceiver { receiver })
}

impl DecisionSignal {
    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    pub fn record(&self, decision: Decision, note: Option<String>) -> RecordOutcome {
        let mut recorded = self.recorded.lock();
        if let Some(existing) = recorded.as_ref() {
            warn!(
                transfer_id = %self.transfer_id,
                existing = existing.decision.as_str(),
                ignored = decision.as_str(),
                "Decision already recorded, ignoring"
            );
            return RecordOutcome::AlreadyDecided(existing.decision);
        }

        let value = RecordedDecision { decision, note };
        *recorded = Some(value.clone());

        if let Some(sender) = self.sender.lock().take() {
            if sender.send(value).is_err() {
                warn!(transfer_id = %self.transfer_id, "Decision recorded after the wait ended");
            }
        }
        info!(transfer_id = %self.transfer_id, decision = decision.as_str(), "Decision recorded");
        RecordOutcome::Recorded
    }

    pub fn decision(&self) -> Option<RecordedDecision> {
        self.recorded.lock().clone()
    }
}

impl DecisionReceiver {
    /// Wait at most `timeout` for the decision, or until `cancel` fires
    pub async fn wait(self, timeout: Duration, cancel: &CancellationToken) -> WaitOutcome {
        tokio::select! {
            biased;
            result = tokio::time::timeout(timeout, self.receiver) => match result {
                Ok(Ok(decision)) => WaitOutcome::Decided(decision),
                Ok(Err(_)) => WaitOutcome::Closed,
                Err(_) => WaitOutcome::TimedOut,
            },
            _ = cancel.cancelled() => WaitOutcome::Abandoned,
        }
    }
}
