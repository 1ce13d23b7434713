//! In-memory backend for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::api::SyncApi;
use crate::error::SyncError;
use crate::protocol::{
    CommunityMember, DirectMessage, MatchInfo, MatchSnapshot, MatchTicket, Notification,
    ParticipantProfile, ParticipantRow, RoomStatus,
};

pub(crate) fn member(id: &str, last_seen: Option<DateTime<Utc>>) -> CommunityMember {
    CommunityMember {
        id: id.into(),
        name: id.to_uppercase(),
        avatar_url: None,
        last_seen,
        bio: None,
        interests: Vec::new(),
    }
}

/// Notification created `minute` minutes after a fixed epoch.
pub(crate) fn notification(id: &str, minute: i64, is_read: bool) -> Notification {
    Notification {
        id: id.into(),
        kind: "system".into(),
        title: format!("title {id}"),
        content: format!("content {id}"),
        is_read,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::minutes(minute),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeRoom {
    pub code: String,
    pub status: RoomStatus,
    pub host_id: String,
    pub participants: Vec<String>,
}

#[derive(Default)]
struct State {
    heartbeats: HashMap<String, usize>,
    notifications: Vec<Notification>,
    mark_read_calls: Vec<String>,
    mark_all_calls: usize,
    rooms: HashMap<String, FakeRoom>,
    next_codes: Vec<String>,
    next_room: usize,
    community: Vec<CommunityMember>,
    messages: Vec<DirectMessage>,
    next_message: usize,
}

/// Shared server state. Each [`FakeApi`] acts as one user against it.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
    fail_heartbeats: AtomicBool,
    fail_notifications: AtomicBool,
    fail_mark_read: AtomicBool,
    fail_community: AtomicBool,
    fail_messages: AtomicBool,
    fail_message_polls: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn heartbeats(&self, user_id: &str) -> usize {
        self.state().heartbeats.get(user_id).copied().unwrap_or(0)
    }

    pub fn fail_heartbeats(&self, fail: bool) {
        self.fail_heartbeats.store(fail, Ordering::SeqCst);
    }

    pub fn set_notifications(&self, items: Vec<Notification>) {
        self.state().notifications = items;
    }

    pub fn fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }

    pub fn mark_read_calls(&self) -> Vec<String> {
        self.state().mark_read_calls.clone()
    }

    pub fn mark_all_calls(&self) -> usize {
        self.state().mark_all_calls
    }

    pub fn set_community(&self, members: Vec<CommunityMember>) {
        self.state().community = members;
    }

    pub fn fail_community(&self, fail: bool) {
        self.fail_community.store(fail, Ordering::SeqCst);
    }

    pub fn set_next_code(&self, code: &str) {
        self.state().next_codes.push(code.to_string());
    }

    pub fn room(&self, match_id: &str) -> Option<FakeRoom> {
        self.state().rooms.get(match_id).cloned()
    }

    pub fn set_room_status(&self, match_id: &str, status: RoomStatus) {
        if let Some(room) = self.state().rooms.get_mut(match_id) {
            room.status = status;
        }
    }

    pub fn remove_room(&self, match_id: &str) {
        self.state().rooms.remove(match_id);
    }

    pub fn fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    /// Fails history reads only; sends still go through.
    pub fn fail_message_polls(&self, fail: bool) {
        self.fail_message_polls.store(fail, Ordering::SeqCst);
    }

    pub fn message_count(&self) -> usize {
        self.state().messages.len()
    }
}

pub(crate) struct FakeApi {
    backend: Arc<FakeBackend>,
    user_id: String,
}

impl FakeApi {
    pub fn new(backend: &Arc<FakeBackend>, user_id: &str) -> Self {
        Self {
            backend: Arc::clone(backend),
            user_id: user_id.to_string(),
        }
    }
}

fn offline() -> SyncError {
    SyncError::Network("connection refused".into())
}

#[async_trait]
impl SyncApi for FakeApi {
    async fn heartbeat(&self) -> Result<(), SyncError> {
        if self.backend.fail_heartbeats.load(Ordering::SeqCst) {
            return Err(offline());
        }
        *self
            .backend
            .state()
            .heartbeats
            .entry(self.user_id.clone())
            .or_default() += 1;
        Ok(())
    }

    async fn notifications(&self) -> Result<Vec<Notification>, SyncError> {
        if self.backend.fail_notifications.load(Ordering::SeqCst) {
            return Err(offline());
        }
        Ok(self.backend.state().notifications.clone())
    }

    async fn mark_read(&self, notification_id: &str) -> Result<(), SyncError> {
        let mut state = self.backend.state();
        state.mark_read_calls.push(notification_id.to_string());
        if self.backend.fail_mark_read.load(Ordering::SeqCst) {
            return Err(offline());
        }
        for n in state.notifications.iter_mut().filter(|n| n.id == notification_id) {
            n.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), SyncError> {
        let mut state = self.backend.state();
        state.mark_all_calls += 1;
        if self.backend.fail_mark_read.load(Ordering::SeqCst) {
            return Err(offline());
        }
        for n in state.notifications.iter_mut() {
            n.is_read = true;
        }
        Ok(())
    }

    async fn create_match(&self, _mode: &str) -> Result<MatchTicket, SyncError> {
        let mut state = self.backend.state();
        state.next_room += 1;
        let match_id = format!("m{}", state.next_room);
        let code = if state.next_codes.is_empty() {
            format!("ROOM{:02}", state.next_room)
        } else {
            state.next_codes.remove(0)
        };
        state.rooms.insert(
            match_id.clone(),
            FakeRoom {
                code: code.clone(),
                status: RoomStatus::Waiting,
                host_id: self.user_id.clone(),
                participants: vec![self.user_id.clone()],
            },
        );
        Ok(MatchTicket {
            match_id,
            room_code: code,
        })
    }

    async fn join_match(&self, room_code: &str) -> Result<MatchTicket, SyncError> {
        let mut state = self.backend.state();
        let found = state
            .rooms
            .iter_mut()
            .find(|(_, r)| r.code == room_code && r.status == RoomStatus::Waiting);
        let Some((match_id, room)) = found else {
            return Err(SyncError::NotFound("Room not found".into()));
        };
        if !room.participants.contains(&self.user_id) {
            room.participants.push(self.user_id.clone());
        }
        Ok(MatchTicket {
            match_id: match_id.clone(),
            room_code: room.code.clone(),
        })
    }

    async fn match_state(&self, match_id: &str) -> Result<MatchSnapshot, SyncError> {
        let state = self.backend.state();
        let room = state
            .rooms
            .get(match_id)
            .ok_or_else(|| SyncError::NotFound(format!("match {match_id}")))?;
        Ok(MatchSnapshot {
            info: MatchInfo {
                id: Some(match_id.to_string()),
                room_code: Some(room.code.clone()),
                status: room.status,
                host_id: Some(room.host_id.clone()),
            },
            participants: room
                .participants
                .iter()
                .map(|user_id| ParticipantRow {
                    user_id: user_id.clone(),
                    score: 0,
                    status: Some(if *user_id == room.host_id { "ready" } else { "joined" }.into()),
                    users: Some(ParticipantProfile {
                        name: user_id.to_uppercase(),
                        avatar_url: None,
                    }),
                })
                .collect(),
        })
    }

    async fn start_match(&self, match_id: &str) -> Result<(), SyncError> {
        let mut state = self.backend.state();
        let room = state
            .rooms
            .get_mut(match_id)
            .ok_or_else(|| SyncError::NotFound(format!("match {match_id}")))?;
        if room.host_id != self.user_id {
            return Err(SyncError::Unauthorized);
        }
        room.status = RoomStatus::Playing;
        Ok(())
    }

    async fn community(&self) -> Result<Vec<CommunityMember>, SyncError> {
        if self.backend.fail_community.load(Ordering::SeqCst) {
            return Err(SyncError::Http {
                status: 500,
                message: "column last_seen missing".into(),
            });
        }
        Ok(self.backend.state().community.clone())
    }

    async fn community_fallback(&self) -> Result<Vec<CommunityMember>, SyncError> {
        Ok(self.backend.state().community.clone())
    }

    async fn messages(&self, friend_id: &str) -> Result<Vec<DirectMessage>, SyncError> {
        if self.backend.fail_messages.load(Ordering::SeqCst)
            || self.backend.fail_message_polls.load(Ordering::SeqCst)
        {
            return Err(offline());
        }
        let me = &self.user_id;
        Ok(self
            .backend
            .state()
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == *me && m.receiver_id == friend_id)
                    || (m.sender_id == friend_id && m.receiver_id == *me)
            })
            .cloned()
            .collect())
    }

    async fn send_message(
        &self,
        receiver_id: &str,
        content: &str,
    ) -> Result<DirectMessage, SyncError> {
        if self.backend.fail_messages.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let mut state = self.backend.state();
        state.next_message += 1;
        let msg = DirectMessage {
            id: format!("dm{}", state.next_message),
            sender_id: self.user_id.clone(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(state.next_message as i64),
        };
        state.messages.push(msg.clone());
        Ok(msg)
    }
}
