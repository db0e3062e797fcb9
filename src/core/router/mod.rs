//! Call Router
//!
//! Tracks every media room the switchboard is involved in: who is in it, which
//! caller it belongs to and when it was last active. Rooms idle for longer than
//! the inactivity threshold are reclaimed by a periodic sweep.
//!
//! All room records live in one map behind a single mutex, shared by webhook
//! handlers, the orchestrator and the sweeper.

mod caller;
mod classifier;

pub use caller::{
    CallerInfo, UNKNOWN_CALLER_ID, UNKNOWN_CALLER_NAME, UNKNOWN_PHONE, extract_caller_info,
};
pub use classifier::{MarkerClassifier, SipKindClassifier, TelephonyClassifier};

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RoomSweepConfig;
use crate::core::platform::Participant;
use crate::core::session::SessionHandle;
use crate::core::sweeper::Sweeper;
use crate::utils::{compact_timestamp, phone_digits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Active,
    Empty,
    Removed,
}

#[derive(Debug, Clone)]
pub struct RoomParticipant {
    pub identity: String,
    pub display_name: String,
    pub joined_at: Instant,
    pub is_telephony: bool,
}

/// Registry entry for one room
#[derive(Clone)]
pub struct RoomRecord {
    pub room_name: String,
    pub caller_info: CallerInfo,
    pub session: Option<SessionHandle>,
    pub created_at: Instant,
    pub last_activity_at: Instant,
    pub participants: Vec<RoomParticipant>,
    pub status: RoomStatus,
    /// Fired when the caller side of the room goes away
    departure: CancellationToken,
}

impl std::fmt::Debug for RoomRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRecord")
            .field("room_name", &self.room_name)
            .field("caller_info", &self.caller_info)
            .field("has_session", &self.session.is_some())
            .field("participants", &self.participants)
            .field("status", &self.status)
            .finish()
    }
}

impl RoomRecord {
    fn new(room_name: &str, caller_info: CallerInfo, session: Option<SessionHandle>) -> Self {
        let now = Instant::now();
        Self {
            room_name: room_name.to_string(),
            caller_info,
            session,
            created_at: now,
            last_activity_at: now,
            participants: Vec::new(),
            status: RoomStatus::Active,
            departure: CancellationToken::new(),
        }
    }

    fn touch(&mut self) {
        self.last_activity_at = Instant::now();
    }

    fn snapshot(&self, now: Instant) -> RoomSnapshot {
        RoomSnapshot {
            room_name: self.room_name.clone(),
            caller: self.caller_info.clone(),
            status: self.status,
            has_session: self.session.is_some(),
            age_seconds: now.saturating_duration_since(self.created_at).as_secs(),
            idle_seconds: now.saturating_duration_since(self.last_activity_at).as_secs(),
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantSnapshot {
                    identity: p.identity.clone(),
                    display_name: p.display_name.clone(),
                    is_telephony: p.is_telephony,
                    connected_seconds: now.saturating_duration_since(p.joined_at).as_secs(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSnapshot {
    pub identity: String,
    pub display_name: String,
    pub is_telephony: bool,
    pub connected_seconds: u64,
}

/// Read-only view of a room for inspection endpoints
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room_name: String,
    pub caller: CallerInfo,
    pub status: RoomStatus,
    pub has_session: bool,
    pub age_seconds: u64,
    pub idle_seconds: u64,
    pub participants: Vec<ParticipantSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomStats {
    pub total_rooms: usize,
    pub active_rooms: usize,
    pub empty_rooms: usize,
    pub total_participants: usize,
    pub telephony_participants: usize,
}

pub struct CallRouter {
    rooms: Mutex<HashMap<String, RoomRecord>>,
    classifier: Arc<dyn TelephonyClassifier>,
    config: RoomSweepConfig,
    sweeper: Sweeper,
}

impl CallRouter {
    pub fn new(config: RoomSweepConfig) -> Self {
        Self::with_classifier(config, Arc::new(SipKindClassifier::default()))
    }

    pub fn with_classifier(
        config: RoomSweepConfig,
        classifier: Arc<dyn TelephonyClassifier>,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            classifier,
            config,
            sweeper: Sweeper::new(),
        }
    }

    pub fn is_telephony_participant(&self, participant: &Participant) -> bool {
        self.classifier.is_telephony(participant)
    }

    pub fn extract_caller_info(&self, participant: &Participant) -> CallerInfo {
        let info = extract_caller_info(participant);
        debug!(
            identity = %participant.identity,
            phone = %info.phone,
            caller_id = %info.caller_id,
            "Extracted caller info"
        );
        info
    }

    /// `call_<timestamp>_<digits>`, suffixed with `_<n>` if that name is taken
    pub fn create_unique_room_name(&self, caller_info: &CallerInfo) -> String {
        let digits = phone_digits(&caller_info.phone);
        let id = if digits.is_empty() {
            caller_info.caller_id.as_str()
        } else {
            digits.as_str()
        };
        let base = format!("call_{}_{}", compact_timestamp(), id);

        let rooms = self.rooms.lock();
        if !rooms.contains_key(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !rooms.contains_key(candidate))
            .unwrap_or(base)
    }

    /// Insert or refresh a room; timestamps reset and status becomes active
    pub fn register_room(
        &self,
        room_name: &str,
        caller_info: CallerInfo,
        session: Option<SessionHandle>,
    ) {
        let mut rooms = self.rooms.lock();
        match rooms.get_mut(room_name) {
            Some(record) => {
                let now = Instant::now();
                record.caller_info = caller_info;
                if session.is_some() {
                    record.session = session;
                }
                record.created_at = now;
                record.last_activity_at = now;
                record.status = RoomStatus::Active;
                if record.departure.is_cancelled() {
                    record.departure = CancellationToken::new();
                }
                debug!(room_name = %room_name, "Room registration refreshed");
            }
            None => {
                rooms.insert(
                    room_name.to_string(),
                    RoomRecord::new(room_name, caller_info, session),
                );
                info!(room_name = %room_name, "Room registered");
            }
        }
    }

    /// Attach an agent session to a known room
    pub fn attach_session(&self, room_name: &str, session: SessionHandle) -> bool {
        let mut rooms = self.rooms.lock();
        match rooms.get_mut(room_name) {
            Some(record) => {
                record.session = Some(session);
                record.touch();
                true
            }
            None => {
                warn!(room_name = %room_name, "Cannot attach session to unknown room");
                false
            }
        }
    }

    pub fn session(&self, room_name: &str) -> Option<SessionHandle> {
        self.rooms
            .lock()
            .get(room_name)
            .and_then(|record| record.session.clone())
    }

    pub fn caller_info(&self, room_name: &str) -> Option<CallerInfo> {
        self.rooms
            .lock()
            .get(room_name)
            .map(|record| record.caller_info.clone())
    }

    pub fn contains(&self, room_name: &str) -> bool {
        self.rooms.lock().contains_key(room_name)
    }

    /// Record a participant joining; an unknown room is registered on first join
    pub fn handle_participant_joined(&self, room_name: &str, participant: &Participant) {
        let is_telephony = self.is_telephony_participant(participant);
        let mut rooms = self.rooms.lock();

        let record = rooms.entry(room_name.to_string()).or_insert_with(|| {
            info!(room_name = %room_name, "Room registered on first participant join");
            RoomRecord::new(room_name, CallerInfo::default(), None)
        });

        // The caller may join after an agent or a pre-registered session
        if is_telephony && !record.caller_info.has_phone() {
            record.caller_info = extract_caller_info(participant);
        }

        if record.departure.is_cancelled() {
            record.departure = CancellationToken::new();
        }
        if !record
            .participants
            .iter()
            .any(|p| p.identity == participant.identity)
        {
            record.participants.push(RoomParticipant {
                identity: participant.identity.clone(),
                display_name: participant.name.clone(),
                joined_at: Instant::now(),
                is_telephony,
            });
        }
        record.status = RoomStatus::Active;
        record.touch();

        info!(
            room_name = %room_name,
            identity = %participant.identity,
            is_telephony,
            participants = record.participants.len(),
            "Participant joined"
        );
    }

    /// Record a participant leaving; the room is kept but marked empty when drained
    pub fn handle_participant_left(&self, room_name: &str, identity: &str) {
        let mut rooms = self.rooms.lock();
        let Some(record) = rooms.get_mut(room_name) else {
            debug!(room_name = %room_name, identity = %identity, "Participant left unknown room");
            return;
        };

        let position = record.participants.iter().position(|p| p.identity == identity);
        let left_was_telephony = position
            .map(|index| record.participants.remove(index).is_telephony)
            .unwrap_or(false);
        record.touch();

        let no_callers_left = !record.participants.iter().any(|p| p.is_telephony);
        if record.participants.is_empty() {
            record.status = RoomStatus::Empty;
            record.departure.cancel();
            info!(room_name = %room_name, "Room is now empty");
        } else if left_was_telephony && no_callers_left {
            record.departure.cancel();
            info!(room_name = %room_name, "Last telephony participant left room");
        }

        debug!(
            room_name = %room_name,
            identity = %identity,
            remaining = record.participants.len(),
            "Participant left"
        );
    }

    /// Token cancelled when the caller leaves `room_name`
    ///
    /// Returns `None` for rooms the router does not know.
    pub fn caller_departure(&self, room_name: &str) -> Option<CancellationToken> {
        self.rooms
            .lock()
            .get(room_name)
            .map(|record| record.departure.clone())
    }

    /// Mark activity on a room so the idle sweep leaves it alone
    pub fn touch_room(&self, room_name: &str) -> bool {
        match self.rooms.lock().get_mut(room_name) {
            Some(record) => {
                record.touch();
                true
            }
            None => false,
        }
    }

    /// The platform closed the room: everyone in it is gone
    pub fn finish_room(&self, room_name: &str) -> Option<RoomRecord> {
        let record = self.remove_room(room_name)?;
        record.departure.cancel();
        Some(record)
    }

    /// Drop a room from the registry and return its final record
    ///
    /// Bookkeeping only; the caller-departure token is left as is.
    pub fn remove_room(&self, room_name: &str) -> Option<RoomRecord> {
        let removed = self.rooms.lock().remove(room_name);
        match removed {
            Some(mut record) => {
                record.status = RoomStatus::Removed;
                info!(room_name = %room_name, "Room removed");
                Some(record)
            }
            None => {
                debug!(room_name = %room_name, "Remove requested for unknown room");
                None
            }
        }
    }

    /// Remove every room idle for strictly longer than the inactivity threshold
    pub fn sweep_inactive(&self) -> Vec<RoomRecord> {
        self.sweep_inactive_at(Instant::now())
    }

    pub fn sweep_inactive_at(&self, now: Instant) -> Vec<RoomRecord> {
        let threshold = self.config.inactivity_threshold();
        let mut rooms = self.rooms.lock();

        let stale: Vec<String> = rooms
            .iter()
            .filter(|(_, record)| {
                now.saturating_duration_since(record.last_activity_at) > threshold
            })
            .map(|(name, _)| name.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|name| rooms.remove(&name))
            .map(|mut record| {
                record.status = RoomStatus::Removed;
                info!(room_name = %record.room_name, "Reclaimed inactive room");
                record
            })
            .collect()
    }

    pub fn room(&self, room_name: &str) -> Option<RoomSnapshot> {
        let now = Instant::now();
        self.rooms
            .lock()
            .get(room_name)
            .map(|record| record.snapshot(now))
    }

    pub fn rooms(&self) -> Vec<RoomSnapshot> {
        let now = Instant::now();
        let mut snapshots: Vec<RoomSnapshot> = self
            .rooms
            .lock()
            .values()
            .map(|record| record.snapshot(now))
            .collect();
        snapshots.sort_by(|a, b| a.room_name.cmp(&b.room_name));
        snapshots
    }

    pub fn stats(&self) -> RoomStats {
        let rooms = self.rooms.lock();
        let mut stats = RoomStats {
            total_rooms: rooms.len(),
            ..Default::default()
        };
        for record in rooms.values() {
            match record.status {
                RoomStatus::Active => stats.active_rooms += 1,
                RoomStatus::Empty => stats.empty_rooms += 1,
                RoomStatus::Removed => {}
            }
            stats.total_participants += record.participants.len();
            stats.telephony_participants +=
                record.participants.iter().filter(|p| p.is_telephony).count();
        }
        stats
    }

    /// Start the periodic idle-room sweep
    ///
    /// Sessions attached to reclaimed rooms are closed.
    pub fn start_sweeper(self: &Arc<Self>) {
        let router = Arc::downgrade(self);
        self.sweeper
            .start("rooms", self.config.sweep_interval(), move || {
                let router = router.clone();
                async move {
                    let Some(router) = router.upgrade() else {
                        return;
                    };
                    let reclaimed = router.sweep_inactive();
                    if !reclaimed.is_empty() {
                        info!(count = reclaimed.len(), "Room sweep reclaimed idle rooms");
                    }
                    for record in reclaimed {
                        if let Some(session) = record.session {
                            if let Err(e) = session.close().await {
                                warn!(room_name = %record.room_name, error = %e, "Failed to close session of reclaimed room");
                            }
                        }
                    }
                }
            });
    }

    pub async fn stop_sweeper(&self) {
        self.sweeper.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn router() -> CallRouter {
        CallRouter::new(RoomSweepConfig::default())
    }

    fn caller() -> Participant {
        Participant::new("sip_+15551234567").with_name("Phone +15551234567")
    }

    #[tokio::test]
    async fn test_first_join_registers_room() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());

        let snapshot = router.room("call_1").unwrap();
        assert_eq!(snapshot.status, RoomStatus::Active);
        assert_eq!(snapshot.caller.phone, "+15551234567");
        assert_eq!(snapshot.participants.len(), 1);
        assert!(snapshot.participants[0].is_telephony);
    }

    #[tokio::test]
    async fn test_duplicate_join_is_ignored() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());
        router.handle_participant_joined("call_1", &caller());
        assert_eq!(router.room("call_1").unwrap().participants.len(), 1);
    }

    #[tokio::test]
    async fn test_drained_room_is_empty_and_retained() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());
        let departure = router.caller_departure("call_1").unwrap();

        router.handle_participant_left("call_1", "sip_+15551234567");

        assert_eq!(router.room("call_1").unwrap().status, RoomStatus::Empty);
        assert!(departure.is_cancelled());
    }

    #[tokio::test]
    async fn test_caller_departure_when_last_caller_leaves() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());
        router.handle_participant_joined(
            "call_1",
            &Participant::new("agent-1").with_kind(crate::core::platform::ParticipantKind::Agent),
        );
        let departure = router.caller_departure("call_1").unwrap();

        router.handle_participant_left("call_1", "agent-1");
        assert!(!departure.is_cancelled());

        router.handle_participant_left("call_1", "sip_+15551234567");
        assert!(departure.is_cancelled());
        assert_eq!(router.room("call_1").unwrap().status, RoomStatus::Empty);
    }

    #[tokio::test]
    async fn test_unknown_room_operations_are_noops() {
        let router = router();
        router.handle_participant_left("nope", "x");
        assert!(router.remove_room("nope").is_none());
        assert!(router.caller_departure("nope").is_none());
        assert!(!router.contains("nope"));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let router = router();
        router.register_room("call_1", CallerInfo::default(), None);
        router.handle_participant_joined("call_1", &caller());
        router.register_room("call_1", CallerInfo::default(), None);

        assert_eq!(router.rooms().len(), 1);
        assert_eq!(router.room("call_1").unwrap().participants.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_boundary_is_strict() {
        let router = router();
        router.register_room("call_1", CallerInfo::default(), None);
        let registered = Instant::now();

        let at_threshold = registered + Duration::from_secs(300);
        assert!(router.sweep_inactive_at(at_threshold).is_empty());
        assert!(router.contains("call_1"));

        let past_threshold = at_threshold + Duration::from_millis(1);
        let reclaimed = router.sweep_inactive_at(past_threshold);
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].status, RoomStatus::Removed);
        assert!(!router.contains("call_1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_postpones_sweep() {
        let router = router();
        router.register_room("call_1", CallerInfo::default(), None);

        tokio::time::advance(Duration::from_secs(200)).await;
        router.handle_participant_joined("call_1", &caller());

        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(router.sweep_inactive().is_empty());

        tokio::time::advance(Duration::from_secs(101)).await;
        assert_eq!(router.sweep_inactive().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_does_not_signal_departure() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());
        let departure = router.caller_departure("call_1").unwrap();

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(router.sweep_inactive().len(), 1);
        assert!(!departure.is_cancelled());
    }

    #[tokio::test]
    async fn test_finish_room_signals_departure() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());
        let departure = router.caller_departure("call_1").unwrap();

        let record = router.finish_room("call_1").unwrap();
        assert_eq!(record.status, RoomStatus::Removed);
        assert!(departure.is_cancelled());
        assert!(router.finish_room("call_1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_room_postpones_sweep() {
        let router = router();
        router.register_room("call_1", CallerInfo::default(), None);

        tokio::time::advance(Duration::from_secs(290)).await;
        assert!(router.touch_room("call_1"));
        assert!(!router.touch_room("nope"));

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(router.sweep_inactive().is_empty());
    }

    #[tokio::test]
    async fn test_late_caller_join_fills_caller_info() {
        let router = router();
        router.handle_participant_joined(
            "call_1",
            &Participant::new("agent-1").with_kind(crate::core::platform::ParticipantKind::Agent),
        );
        assert!(!router.caller_info("call_1").unwrap().has_phone());

        router.handle_participant_joined("call_1", &caller());
        assert_eq!(router.caller_info("call_1").unwrap().phone, "+15551234567");

        // A second telephony leg does not replace the caller
        router.handle_participant_joined("call_1", &Participant::new("sip_+15559998888"));
        assert_eq!(router.caller_info("call_1").unwrap().phone, "+15551234567");
    }

    #[tokio::test]
    async fn test_unique_room_names() {
        let router = router();
        let info = extract_caller_info(&caller());

        let first = router.create_unique_room_name(&info);
        assert!(first.starts_with("call_"));
        assert!(first.ends_with("_15551234567"));

        router.register_room(&first, info.clone(), None);
        let second = router.create_unique_room_name(&info);
        // Only collides when generated within the same second
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_stats() {
        let router = router();
        router.handle_participant_joined("call_1", &caller());
        router.handle_participant_joined("call_1", &Participant::new("alice"));
        router.register_room("call_2", CallerInfo::default(), None);
        router.handle_participant_joined("call_3", &Participant::new("bob"));
        router.handle_participant_left("call_3", "bob");

        let stats = router.stats();
        assert_eq!(stats.total_rooms, 3);
        assert_eq!(stats.active_rooms, 2);
        assert_eq!(stats.empty_rooms, 1);
        assert_eq!(stats.total_participants, 2);
        assert_eq!(stats.telephony_participants, 1);
    }
}
