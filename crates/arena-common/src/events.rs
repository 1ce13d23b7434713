use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::toast::Toast;

/// Events published by the sync services for whatever surface renders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SessionStarted { user_id: String },
    SessionStopped,
    PresenceChanged { user_id: String, online: bool },
    RosterRefreshed { members: usize, online: usize },
    Toast(Toast),
    InboxUpdated { total: usize, unread: usize },
    RoomPhaseChanged { room_id: String, phase: String },
    RoomParticipants { room_id: String, count: usize },
    /// The room a coordinator was attached to no longer exists.
    RoomLost { room_id: String },
    ConversationUpdated { friend_id: String, messages: usize },
    #[serde(other)]
    Unknown,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
