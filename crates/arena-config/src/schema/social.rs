//! Presence, notification, matchmaking and messaging configuration types.

use serde::{Deserialize, Serialize};

/// Which presence write path is primary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresenceWriterKind {
    /// `POST /presence/heartbeat` on the backend.
    #[default]
    Backend,
    /// Write `last_seen` straight to the profile table.
    Direct,
}

/// Presence system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub enabled: bool,
    /// Heartbeat interval in seconds (valid range: 5-600).
    pub heartbeat_interval: u32,
    /// A user counts as online when seen within this many seconds.
    /// Must be at least `heartbeat_interval`.
    pub online_threshold: u32,
    pub writer: PresenceWriterKind,
    /// Use the other write path when the primary one fails.
    pub fallback_writer: bool,
    /// Subscribe to live `last_seen` updates (requires Supabase settings).
    pub live_feed: bool,
    /// Fixed delay before the live feed reconnects, in seconds.
    pub live_feed_reconnect: u32,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            heartbeat_interval: 30,
            online_threshold: 120,
            writer: PresenceWriterKind::Backend,
            fallback_writer: true,
            live_feed: false,
            live_feed_reconnect: 5,
        }
    }
}

/// Notification inbox polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    /// Poll interval in seconds (valid range: 5-600).
    pub poll_interval: u32,
    /// Show one "N unread" toast after the first snapshot of a session.
    pub unread_summary: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: 30,
            unread_summary: true,
        }
    }
}

/// Quiz room polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Room poll interval in seconds (valid range: 1-30).
    pub poll_interval: u32,
    /// Match mode sent on room creation.
    pub mode: String,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            poll_interval: 3,
            mode: "pvp".into(),
        }
    }
}

/// Direct message polling for the open conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Poll interval in seconds (valid range: 1-60).
    pub poll_interval: u32,
    /// Messages kept per conversation (valid range: 10-500).
    pub history_limit: u32,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            poll_interval: 5,
            history_limit: 50,
        }
    }
}
