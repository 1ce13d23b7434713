use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::RoomStatus;

/// Runtime configuration for room coordinators.
#[derive(Debug, Clone)]
pub struct MatchmakingConfig {
    pub poll_interval: Duration,
    /// Game mode sent with create requests.
    pub mode: String,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            mode: "pvp".to_string(),
        }
    }
}

/// Client-side lifecycle of a room. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    #[default]
    Lobby,
    Room,
    Playing,
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoomPhase::Lobby => "lobby",
            RoomPhase::Room => "room",
            RoomPhase::Playing => "playing",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub room_id: String,
    pub user_id: String,
    pub name: String,
    pub score: i64,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub code: String,
    pub status: RoomStatus,
    pub host_id: Option<String>,
}

/// Snapshot of a coordinator, as rendered by the room view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub phase: RoomPhase,
    pub room: Option<Room>,
    pub participants: Vec<Participant>,
    pub is_host: bool,
}

impl RoomState {
    pub fn code(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.code.as_str())
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.id.as_str())
    }
}
