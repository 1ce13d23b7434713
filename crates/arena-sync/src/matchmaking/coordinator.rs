use std::ops::ControlFlow;
use std::sync::Arc;

use arena_common::{Event, EventBus};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::SyncApi;
use crate::error::SyncError;
use crate::poll::{AppliedMark, PollHandle, Sequencer, Stamp};
use crate::protocol::{MatchSnapshot, ParticipantRow, RoomStatus};

use super::code::RoomCode;
use super::registry::{RoomClaim, RoomRegistry};
use super::types::{MatchmakingConfig, Participant, Role, Room, RoomPhase, RoomState};

/// What changed when a snapshot was applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Applied {
    phase_changed: bool,
    participants_changed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: RoomState,
    applied: AppliedMark,
}

fn role_of(row: &ParticipantRow, host_id: Option<&str>) -> Role {
    let is_host = match host_id {
        Some(host) => row.user_id == host,
        None => row.status.as_deref() == Some("ready"),
    };
    if is_host {
        Role::Host
    } else {
        Role::Guest
    }
}

impl Shared {
    /// Applies a polled room snapshot. Stale stamps are ignored; status
    /// and phase only move forward.
    fn apply(&mut self, stamp: Stamp, snapshot: MatchSnapshot) -> Option<Applied> {
        if !self.applied.admit(stamp) {
            return None;
        }
        let room = self.state.room.as_mut()?;

        if snapshot.info.status.rank() > room.status.rank() {
            room.status = snapshot.info.status;
        }
        if room.host_id.is_none() {
            room.host_id = snapshot.info.host_id.clone();
        }

        let host_id = room.host_id.clone();
        let participants: Vec<Participant> = snapshot
            .participants
            .iter()
            .map(|row| Participant {
                room_id: room.id.clone(),
                user_id: row.user_id.clone(),
                name: row
                    .users
                    .as_ref()
                    .map(|u| u.name.clone())
                    .unwrap_or_default(),
                score: row.score,
                role: role_of(row, host_id.as_deref()),
            })
            .collect();

        let mut applied = Applied::default();
        if room.status.has_started() && self.state.phase == RoomPhase::Room {
            self.state.phase = RoomPhase::Playing;
            applied.phase_changed = true;
        }
        if participants != self.state.participants {
            self.state.participants = participants;
            applied.participants_changed = true;
        }
        Some(applied)
    }
}

fn publish_applied(bus: &EventBus, state: &RoomState, applied: Applied) {
    let Some(room_id) = state.room_id() else {
        return;
    };
    if applied.participants_changed {
        bus.publish(Event::RoomParticipants {
            room_id: room_id.to_string(),
            count: state.participants.len(),
        });
    }
    if applied.phase_changed {
        info!(room_id, phase = %state.phase, "room phase changed");
        bus.publish(Event::RoomPhaseChanged {
            room_id: room_id.to_string(),
            phase: state.phase.to_string(),
        });
    }
}

/// Everything a poll tick needs.
#[derive(Clone)]
struct RoomPoller {
    room_id: String,
    api: Arc<dyn SyncApi>,
    bus: Arc<EventBus>,
    shared: Arc<RwLock<Shared>>,
    sequencer: Arc<Sequencer>,
}

impl RoomPoller {
    async fn poll(&self) -> ControlFlow<()> {
        let stamp = self.sequencer.next();
        match self.api.match_state(&self.room_id).await {
            Ok(snapshot) => {
                let mut shared = self.shared.write().await;
                let Some(applied) = shared.apply(stamp, snapshot) else {
                    debug!(room_id = %self.room_id, stamp = stamp.value(), "stale room snapshot dropped");
                    return ControlFlow::Continue(());
                };
                publish_applied(&self.bus, &shared.state, applied);
                if shared.state.phase == RoomPhase::Playing {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
            Err(e) if e.is_not_found() => {
                warn!(room_id = %self.room_id, "room no longer exists");
                self.bus.publish(Event::RoomLost {
                    room_id: self.room_id.clone(),
                });
                ControlFlow::Break(())
            }
            Err(e) => {
                warn!(room_id = %self.room_id, error = %e, "room poll failed");
                ControlFlow::Continue(())
            }
        }
    }
}

struct ActivePoll {
    handle: PollHandle,
    _claim: RoomClaim,
}

/// Drives one client through LOBBY, ROOM and PLAYING for a single room.
///
/// Room state belongs to this coordinator alone. Leaving or dropping it
/// stops the poll; the room itself lives on server-side.
pub struct RoomCoordinator {
    user_id: String,
    config: MatchmakingConfig,
    api: Arc<dyn SyncApi>,
    bus: Arc<EventBus>,
    registry: RoomRegistry,
    shared: Arc<RwLock<Shared>>,
    sequencer: Arc<Sequencer>,
    poll: Option<ActivePoll>,
}

impl RoomCoordinator {
    pub fn new(
        user_id: impl Into<String>,
        config: MatchmakingConfig,
        api: Arc<dyn SyncApi>,
        bus: Arc<EventBus>,
        registry: RoomRegistry,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            config,
            api,
            bus,
            registry,
            shared: Arc::new(RwLock::new(Shared::default())),
            sequencer: Arc::new(Sequencer::new()),
            poll: None,
        }
    }

    pub async fn room_state(&self) -> RoomState {
        self.shared.read().await.state.clone()
    }

    pub async fn phase(&self) -> RoomPhase {
        self.shared.read().await.state.phase
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| p.handle.is_running())
    }

    /// A caller who left keeps the last room's state but may enter
    /// another room.
    async fn ensure_free(&self) -> Result<(), SyncError> {
        let shared = self.shared.read().await;
        if shared.state.phase == RoomPhase::Lobby || self.poll.is_none() {
            return Ok(());
        }
        Err(SyncError::InvalidState(format!(
            "already in room {} ({})",
            shared.state.code().unwrap_or("?"),
            shared.state.phase
        )))
    }

    /// Creates a room with the caller as host. LOBBY to ROOM.
    pub async fn create_room(&mut self) -> Result<RoomState, SyncError> {
        self.ensure_free().await?;
        let ticket = self.api.create_match(&self.config.mode).await?;
        let claim = self.registry.claim(&ticket.match_id)?;
        info!(room_id = %ticket.match_id, code = %ticket.room_code, "room created");

        let room = Room {
            id: ticket.match_id,
            code: ticket.room_code,
            status: RoomStatus::Waiting,
            host_id: Some(self.user_id.clone()),
        };
        Ok(self.enter(claim, room, true, None).await)
    }

    /// Joins a waiting room by code as a guest. LOBBY to ROOM.
    ///
    /// Joining the room the caller is already in returns the current state;
    /// joining the room the caller left resumes polling it. Any other
    /// failure leaves the caller where it was.
    pub async fn join_room(&mut self, input: &str) -> Result<RoomState, SyncError> {
        let code = RoomCode::parse(input)?;
        let rejoin = {
            let shared = self.shared.read().await;
            shared.state.phase != RoomPhase::Lobby && shared.state.code() == Some(code.as_str())
        };
        if rejoin {
            return self.rejoin().await;
        }
        self.ensure_free().await?;

        let ticket = self.api.join_match(code.as_str()).await?;
        let stamp = self.sequencer.next();
        let snapshot = self.api.match_state(&ticket.match_id).await?;
        if snapshot.info.status != RoomStatus::Waiting {
            return Err(SyncError::NotFound(format!("room {code} is not waiting")));
        }
        let claim = self.registry.claim(&ticket.match_id)?;
        info!(room_id = %ticket.match_id, code = %code, "joined room");

        let host_id = snapshot.info.host_id.clone();
        let is_host = host_id.as_deref() == Some(self.user_id.as_str());
        let room = Room {
            id: ticket.match_id,
            code: ticket.room_code,
            status: RoomStatus::Waiting,
            host_id,
        };
        Ok(self.enter(claim, room, is_host, Some((stamp, snapshot))).await)
    }

    /// Attaches to a known room id, e.g. after following a direct link.
    /// `NotFound` means the room is gone and the caller should leave the
    /// room view.
    pub async fn attach(&mut self, match_id: &str) -> Result<RoomState, SyncError> {
        let rejoin = self.shared.read().await.state.room_id() == Some(match_id);
        if rejoin {
            return self.rejoin().await;
        }
        self.ensure_free().await?;
        let stamp = self.sequencer.next();
        let snapshot = self.api.match_state(match_id).await?;
        let claim = self.registry.claim(match_id)?;

        let host_id = snapshot.info.host_id.clone().or_else(|| {
            snapshot
                .participants
                .iter()
                .find(|p| p.status.as_deref() == Some("ready"))
                .map(|p| p.user_id.clone())
        });
        let is_host = host_id.as_deref() == Some(self.user_id.as_str());
        let room = Room {
            id: match_id.to_string(),
            code: snapshot.info.room_code.clone().unwrap_or_default(),
            status: RoomStatus::Waiting,
            host_id,
        };
        Ok(self.enter(claim, room, is_host, Some((stamp, snapshot))).await)
    }

    /// Re-enters the current room. A no-op while still polling it; after
    /// `leave` it refreshes the room and polls again under a new claim.
    async fn rejoin(&mut self) -> Result<RoomState, SyncError> {
        let room_id = {
            let shared = self.shared.read().await;
            if self.poll.is_some() {
                debug!(code = shared.state.code().unwrap_or("?"), "already in this room");
                return Ok(shared.state.clone());
            }
            shared
                .state
                .room_id()
                .map(str::to_string)
                .ok_or_else(|| SyncError::InvalidState("room without id".into()))?
        };

        let stamp = self.sequencer.next();
        let snapshot = self.api.match_state(&room_id).await?;
        let claim = self.registry.claim(&room_id)?;
        info!(room_id = %room_id, "rejoined room");

        let state = {
            let mut shared = self.shared.write().await;
            if let Some(applied) = shared.apply(stamp, snapshot) {
                publish_applied(&self.bus, &shared.state, applied);
            }
            shared.state.clone()
        };
        if state.phase == RoomPhase::Room {
            self.start_polling(claim, &state);
        }
        Ok(state)
    }

    async fn enter(
        &mut self,
        claim: RoomClaim,
        room: Room,
        is_host: bool,
        snapshot: Option<(Stamp, MatchSnapshot)>,
    ) -> RoomState {
        let state = {
            let mut shared = self.shared.write().await;
            let room_id = room.id.clone();
            shared.state = RoomState {
                phase: RoomPhase::Room,
                room: Some(room),
                participants: Vec::new(),
                is_host,
            };
            self.bus.publish(Event::RoomPhaseChanged {
                room_id,
                phase: RoomPhase::Room.to_string(),
            });
            if let Some((stamp, snapshot)) = snapshot {
                if let Some(applied) = shared.apply(stamp, snapshot) {
                    publish_applied(&self.bus, &shared.state, applied);
                }
            }
            shared.state.clone()
        };

        if state.phase == RoomPhase::Room {
            self.start_polling(claim, &state);
        }
        state
    }

    fn start_polling(&mut self, claim: RoomClaim, state: &RoomState) {
        let Some(room_id) = state.room_id() else {
            return;
        };
        let poller = RoomPoller {
            room_id: room_id.to_string(),
            api: Arc::clone(&self.api),
            bus: Arc::clone(&self.bus),
            shared: Arc::clone(&self.shared),
            sequencer: Arc::clone(&self.sequencer),
        };
        let handle = PollHandle::spawn("room", self.config.poll_interval, move || {
            let poller = poller.clone();
            async move { poller.poll().await }
        });
        self.poll = Some(ActivePoll {
            handle,
            _claim: claim,
        });
    }

    /// Asks the backend to start the match. Host only.
    ///
    /// The caller's own phase changes when a later poll observes
    /// `playing`, exactly as for guests.
    pub async fn start_match(&self) -> Result<(), SyncError> {
        let room_id = {
            let shared = self.shared.read().await;
            match shared.state.phase {
                RoomPhase::Lobby => {
                    return Err(SyncError::InvalidState("not in a room".into()))
                }
                RoomPhase::Playing => {
                    return Err(SyncError::InvalidState("match already started".into()))
                }
                RoomPhase::Room => {}
            }
            if !shared.state.is_host {
                return Err(SyncError::NotHost);
            }
            shared
                .state
                .room_id()
                .map(str::to_string)
                .ok_or_else(|| SyncError::InvalidState("room without id".into()))?
        };
        self.api.start_match(&room_id).await?;
        info!(room_id = %room_id, "start requested");
        Ok(())
    }

    /// Stops polling and releases the room. There is no server-side leave.
    ///
    /// The last room state stays readable. Joining the same room again
    /// resumes it; creating or joining another room replaces it.
    pub fn leave(&mut self) {
        if let Some(mut active) = self.poll.take() {
            active.handle.stop();
        }
    }
}

impl Drop for RoomCoordinator {
    fn drop(&mut self) {
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MatchInfo, ParticipantRow};
    use crate::testing::{FakeApi, FakeBackend};
    use std::time::Duration;
    use tokio::sync::broadcast;

    const INTERVAL: Duration = Duration::from_secs(3);

    fn coordinator(
        backend: &Arc<FakeBackend>,
        user: &str,
        registry: &RoomRegistry,
    ) -> (RoomCoordinator, broadcast::Receiver<Event>) {
        let bus = Arc::new(EventBus::new(64));
        let rx = bus.subscribe();
        let api = Arc::new(FakeApi::new(backend, user));
        let config = MatchmakingConfig {
            poll_interval: INTERVAL,
            mode: "pvp".into(),
        };
        (RoomCoordinator::new(user, config, api, bus, registry.clone()), rx)
    }

    fn snapshot(status: RoomStatus, users: &[&str]) -> MatchSnapshot {
        MatchSnapshot {
            info: MatchInfo {
                id: Some("m1".into()),
                room_code: Some("ABC123".into()),
                status,
                host_id: Some("host".into()),
            },
            participants: users
                .iter()
                .map(|u| ParticipantRow {
                    user_id: u.to_string(),
                    score: 0,
                    status: None,
                    users: None,
                })
                .collect(),
        }
    }

    fn in_room() -> Shared {
        Shared {
            state: RoomState {
                phase: RoomPhase::Room,
                room: Some(Room {
                    id: "m1".into(),
                    code: "ABC123".into(),
                    status: RoomStatus::Waiting,
                    host_id: Some("host".into()),
                }),
                participants: Vec::new(),
                is_host: false,
            },
            applied: AppliedMark::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn host_and_guest_reach_playing_together() {
        let backend = FakeBackend::new();
        backend.set_next_code("ABC123");
        let registry_a = RoomRegistry::new();
        let registry_b = RoomRegistry::new();
        let (mut host, mut host_rx) = coordinator(&backend, "host", &registry_a);
        let (mut guest, _guest_rx) = coordinator(&backend, "guest", &registry_b);

        let created = host.create_room().await.unwrap();
        assert_eq!(created.phase, RoomPhase::Room);
        assert_eq!(created.code(), Some("ABC123"));
        assert!(created.is_host);

        let joined = guest.join_room("abc123").await.unwrap();
        assert_eq!(joined.phase, RoomPhase::Room);
        assert!(!joined.is_host);
        assert_eq!(joined.participants.len(), 2);

        tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
        let host_state = host.room_state().await;
        assert_eq!(host_state.participants.len(), 2);
        assert!(host_state
            .participants
            .iter()
            .any(|p| p.user_id == "host" && p.role == Role::Host));
        assert!(host_state
            .participants
            .iter()
            .any(|p| p.user_id == "guest" && p.role == Role::Guest));

        assert!(matches!(guest.start_match().await, Err(SyncError::NotHost)));
        host.start_match().await.unwrap();
        assert_eq!(host.phase().await, RoomPhase::Room);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(host.phase().await, RoomPhase::Playing);
        assert_eq!(guest.phase().await, RoomPhase::Playing);
        assert!(!host.is_polling());
        assert!(!guest.is_polling());

        let mut saw_playing = false;
        while let Ok(event) = host_rx.try_recv() {
            if let Event::RoomPhaseChanged { phase, .. } = event {
                saw_playing |= phase == "playing";
            }
        }
        assert!(saw_playing);
    }

    #[tokio::test]
    async fn join_playing_room_stays_in_lobby() {
        let backend = FakeBackend::new();
        backend.set_next_code("ABC123");
        let registry = RoomRegistry::new();
        let (mut host, _) = coordinator(&backend, "host", &registry);
        let created = host.create_room().await.unwrap();
        backend.set_room_status(created.room_id().unwrap(), RoomStatus::Playing);

        let (mut guest, _) = coordinator(&backend, "guest", &RoomRegistry::new());
        let err = guest.join_room("ABC123").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(guest.phase().await, RoomPhase::Lobby);
        assert!(!guest.is_polling());
    }

    #[tokio::test]
    async fn invalid_and_unknown_codes_keep_lobby() {
        let backend = FakeBackend::new();
        let (mut guest, _) = coordinator(&backend, "guest", &RoomRegistry::new());

        assert!(matches!(
            guest.join_room("  ").await,
            Err(SyncError::InvalidCode(_))
        ));
        assert!(guest.join_room("ZZZ999").await.unwrap_err().is_not_found());
        assert_eq!(guest.room_state().await, RoomState::default());
    }

    #[tokio::test]
    async fn rejoining_same_room_is_noop() {
        let backend = FakeBackend::new();
        backend.set_next_code("ABC123");
        let (mut host, _) = coordinator(&backend, "host", &RoomRegistry::new());
        host.create_room().await.unwrap();

        let (mut guest, _) = coordinator(&backend, "guest", &RoomRegistry::new());
        let first = guest.join_room("abc123").await.unwrap();
        let again = guest.join_room(" ABC123 ").await.unwrap();
        assert_eq!(first.room_id(), again.room_id());
        assert_eq!(backend.room(first.room_id().unwrap()).unwrap().participants.len(), 2);

        assert!(matches!(
            guest.join_room("OTHER1").await,
            Err(SyncError::InvalidState(_))
        ));
        assert!(matches!(
            guest.create_room().await,
            Err(SyncError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn rejoin_after_leave_polls_until_playing() {
        let backend = FakeBackend::new();
        backend.set_next_code("ABC123");
        let (mut host, _) = coordinator(&backend, "host", &RoomRegistry::new());
        host.create_room().await.unwrap();

        let registry = RoomRegistry::new();
        let (mut guest, _) = coordinator(&backend, "guest", &registry);
        guest.join_room("ABC123").await.unwrap();
        guest.leave();
        assert!(!guest.is_polling());
        assert_eq!(guest.phase().await, RoomPhase::Room);

        let again = guest.join_room("abc123").await.unwrap();
        assert_eq!(again.phase, RoomPhase::Room);
        assert!(guest.is_polling());
        let room_id = again.room_id().unwrap().to_string();
        assert!(matches!(
            registry.claim(&room_id),
            Err(SyncError::AlreadyPolling(_))
        ));

        host.start_match().await.unwrap();
        tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
        assert_eq!(guest.phase().await, RoomPhase::Playing);
        assert!(!guest.is_polling());
    }

    #[tokio::test]
    async fn leaving_frees_caller_for_another_room() {
        let backend = FakeBackend::new();
        backend.set_next_code("ABC123");
        backend.set_next_code("XYZ789");
        let (mut host, _) = coordinator(&backend, "host", &RoomRegistry::new());
        host.create_room().await.unwrap();
        let (mut other_host, _) = coordinator(&backend, "other", &RoomRegistry::new());
        other_host.create_room().await.unwrap();

        let (mut guest, _) = coordinator(&backend, "guest", &RoomRegistry::new());
        guest.join_room("ABC123").await.unwrap();
        guest.leave();

        let moved = guest.join_room("XYZ789").await.unwrap();
        assert_eq!(moved.code(), Some("XYZ789"));
        assert!(guest.is_polling());

        guest.leave();
        let created = guest.create_room().await.unwrap();
        assert!(created.is_host);
        assert_eq!(created.phase, RoomPhase::Room);
    }

    #[tokio::test]
    async fn attach_after_leave_resumes_same_room() {
        let backend = FakeBackend::new();
        let (mut host, _) = coordinator(&backend, "host", &RoomRegistry::new());
        let state = host.create_room().await.unwrap();
        let room_id = state.room_id().unwrap().to_string();

        host.leave();
        let attached = host.attach(&room_id).await.unwrap();
        assert!(attached.is_host);
        assert!(host.is_polling());
    }

    #[tokio::test]
    async fn start_requires_a_room() {
        let backend = FakeBackend::new();
        let (host, _) = coordinator(&backend, "host", &RoomRegistry::new());
        assert!(matches!(
            host.start_match().await,
            Err(SyncError::InvalidState(_))
        ));
    }

    #[test]
    fn late_response_to_earlier_poll_is_noop() {
        let seq = Sequencer::new();
        let early = seq.next();
        let late = seq.next();
        let mut shared = in_room();

        let applied = shared
            .apply(late, snapshot(RoomStatus::Playing, &["host", "guest"]))
            .unwrap();
        assert!(applied.phase_changed);
        assert!(shared
            .apply(early, snapshot(RoomStatus::Waiting, &["host"]))
            .is_none());
        assert_eq!(shared.state.phase, RoomPhase::Playing);
        assert_eq!(shared.state.participants.len(), 2);
    }

    #[test]
    fn playing_never_reverts() {
        let seq = Sequencer::new();
        let mut shared = in_room();
        shared.apply(seq.next(), snapshot(RoomStatus::Playing, &["host"]));

        let applied = shared
            .apply(seq.next(), snapshot(RoomStatus::Waiting, &["host"]))
            .unwrap();
        assert!(!applied.phase_changed);
        assert_eq!(shared.state.phase, RoomPhase::Playing);
        assert_eq!(
            shared.state.room.as_ref().unwrap().status,
            RoomStatus::Playing
        );
    }

    #[test]
    fn host_role_falls_back_to_ready_status() {
        let row = |id: &str, status: &str| ParticipantRow {
            user_id: id.into(),
            score: 0,
            status: Some(status.into()),
            users: None,
        };
        assert_eq!(role_of(&row("a", "ready"), None), Role::Host);
        assert_eq!(role_of(&row("b", "joined"), None), Role::Guest);
        assert_eq!(role_of(&row("a", "ready"), Some("b")), Role::Guest);
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_room_is_reported_lost() {
        let backend = FakeBackend::new();
        let (mut host, mut rx) = coordinator(&backend, "host", &RoomRegistry::new());
        let state = host.create_room().await.unwrap();
        let room_id = state.room_id().unwrap().to_string();

        tokio::time::sleep(Duration::from_millis(10)).await;
        backend.remove_room(&room_id);
        tokio::time::sleep(INTERVAL).await;

        assert!(!host.is_polling());
        let mut lost = false;
        while let Ok(event) = rx.try_recv() {
            lost |= matches!(event, Event::RoomLost { room_id: ref id } if *id == room_id);
        }
        assert!(lost);
    }

    #[tokio::test]
    async fn attach_to_missing_room_fails() {
        let backend = FakeBackend::new();
        let (mut c, _) = coordinator(&backend, "u1", &RoomRegistry::new());
        assert!(c.attach("nope").await.unwrap_err().is_not_found());
        assert_eq!(c.phase().await, RoomPhase::Lobby);
    }

    #[tokio::test]
    async fn second_coordinator_cannot_poll_same_room() {
        let backend = FakeBackend::new();
        let registry = RoomRegistry::new();
        let (mut host, _) = coordinator(&backend, "host", &registry);
        let state = host.create_room().await.unwrap();
        let room_id = state.room_id().unwrap().to_string();

        let (mut other, _) = coordinator(&backend, "host", &registry);
        assert!(matches!(
            other.attach(&room_id).await,
            Err(SyncError::AlreadyPolling(_))
        ));
        assert_eq!(other.phase().await, RoomPhase::Lobby);

        host.leave();
        let attached = other.attach(&room_id).await.unwrap();
        assert!(attached.is_host);
        assert!(other.is_polling());
    }
}
