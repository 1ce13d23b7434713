//! Wire types for the Arena backend.
//!
//! These mirror the JSON bodies of the REST endpoints the sync services
//! poll. The transport (reqwest, bearer auth, status mapping) lives in
//! `api`; the Realtime websocket envelope lives in `realtime`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoint paths
// ---------------------------------------------------------------------------

/// Paths relative to the configured API base URL.
pub mod paths {
    pub const HEARTBEAT: &str = "/presence/heartbeat";
    pub const NOTIFICATIONS: &str = "/notifications";
    pub const NOTIFICATIONS_READ_ALL: &str = "/notifications/read-all";
    pub const MATCH_CREATE: &str = "/quiz/match/create";
    pub const MATCH_JOIN: &str = "/quiz/match/join";
    pub const COMMUNITY: &str = "/user/community";
    pub const COMMUNITY_FALLBACK: &str = "/user/community/public_fallback";
    pub const MESSAGES_SEND: &str = "/social/messages/send";

    pub fn notification_read(id: &str) -> String {
        format!("/notifications/{}/read", urlencoding::encode(id))
    }

    pub fn match_state(match_id: &str) -> String {
        format!("/quiz/match/{}", urlencoding::encode(match_id))
    }

    pub fn match_start(match_id: &str) -> String {
        format!("/quiz/match/{}/start", urlencoding::encode(match_id))
    }

    pub fn messages(friend_id: &str) -> String {
        format!("/social/messages/{}", urlencoding::encode(friend_id))
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parses a backend timestamp.
///
/// Postgres `timestamptz` columns come back as RFC 3339. The heartbeat
/// endpoint stores a naive ISO string, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

mod lenient_ts {
    use super::parse_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use super::parse_timestamp;
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_some(&ts.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        /// Unparseable values are treated as absent.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            Ok(raw.as_deref().and_then(parse_timestamp))
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// The liveness row of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    #[serde(alias = "id")]
    pub user_id: String,
    #[serde(default, with = "lenient_ts::option")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// One row of the community roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMember {
    pub id: String,
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default, with = "lenient_ts::option")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

/// Body sent by the direct presence writer.
#[derive(Debug, Clone, Serialize)]
pub struct LastSeenUpdate {
    #[serde(with = "lenient_ts")]
    pub last_seen: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "lenient_ts")]
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Matchmaking
// ---------------------------------------------------------------------------

/// Server-side status of a quiz room. Advances waiting, playing, finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn rank(self) -> u8 {
        match self {
            RoomStatus::Waiting => 0,
            RoomStatus::Playing => 1,
            RoomStatus::Finished => 2,
        }
    }

    /// True once the host has started the match.
    pub fn has_started(self) -> bool {
        self.rank() >= RoomStatus::Playing.rank()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMatchRequest<'a> {
    pub mode: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinMatchRequest<'a> {
    pub room_code: &'a str,
}

/// Returned by both create and join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTicket {
    pub match_id: String,
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub room_code: Option<String>,
    pub status: RoomStatus,
    #[serde(default)]
    pub host_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub user_id: String,
    #[serde(default)]
    pub score: i64,
    /// "ready" marks the host when the room row carries no `host_id`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub users: Option<ParticipantProfile>,
}

/// Full room state as returned by `GET /quiz/match/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    #[serde(rename = "match")]
    pub info: MatchInfo,
    #[serde(default)]
    pub participants: Vec<ParticipantRow>,
}

// ---------------------------------------------------------------------------
// Direct messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[serde(with = "lenient_ts")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest<'a> {
    pub receiver_id: &'a str,
    pub content: &'a str,
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}
