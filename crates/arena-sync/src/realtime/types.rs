//! Configuration, protocol types, and event/command enums for the realtime client.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to Supabase Realtime.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub project_url: String,
    /// Supabase anon key (publishable).
    pub api_key: String,
    /// Optional access token (JWT) so row-level security applies.
    pub access_token: Option<String>,
    /// Phoenix heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Fixed delay before reconnecting, in seconds.
    pub reconnect_delay_secs: u64,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("project_url", &self.project_url)
            .field("api_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .finish()
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            project_url: String::new(),
            api_key: String::new(),
            access_token: None,
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 5,
        }
    }
}

impl RealtimeConfig {
    /// Build the WebSocket URL for Supabase Realtime.
    pub(crate) fn ws_url(&self) -> String {
        let base = self.project_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!(
            "{base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            urlencoding::encode(&self.api_key)
        )
    }
}

// ---------------------------------------------------------------------------
// Phoenix Protocol Types
// ---------------------------------------------------------------------------

/// A Phoenix protocol message envelope (v1 JSON format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Channel Configuration
// ---------------------------------------------------------------------------

/// One `postgres_changes` subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresChangeFilter {
    /// `INSERT`, `UPDATE`, `DELETE` or `*`.
    pub event: String,
    pub schema: String,
    pub table: String,
}

impl PostgresChangeFilter {
    pub fn updates(schema: &str, table: &str) -> Self {
        Self {
            event: "UPDATE".to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }
}

/// Configuration for a Supabase Realtime channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub postgres_changes: Vec<PostgresChangeFilter>,
}

impl ChannelConfig {
    /// Serialize to the JSON payload expected by Supabase phx_join.
    pub(crate) fn to_join_payload(&self, access_token: Option<&str>) -> serde_json::Value {
        let changes: Vec<_> = self
            .postgres_changes
            .iter()
            .map(|f| {
                serde_json::json!({
                    "event": f.event,
                    "schema": f.schema,
                    "table": f.table,
                })
            })
            .collect();

        let mut payload = serde_json::json!({
            "config": {
                "broadcast": { "self": false, "ack": false },
                "presence": { "key": "" },
                "postgres_changes": changes
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = serde_json::json!(token);
        }
        payload
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// A row change pushed by `postgres_changes`.
#[derive(Debug, Clone)]
pub struct RowChange {
    pub topic: String,
    pub schema: String,
    pub table: String,
    pub kind: ChangeKind,
    /// The new row. Empty object for deletes.
    pub record: serde_json::Value,
}

/// Events emitted by the realtime client.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// WebSocket connection established.
    Connected,
    /// WebSocket connection lost.
    Disconnected,
    /// Successfully joined a channel.
    ChannelJoined { topic: String },
    /// Channel closed or errored.
    ChannelError { topic: String, message: String },
    RowChange(RowChange),
    Error(String),
}

/// Commands sent to the connection task.
#[derive(Debug)]
pub(crate) enum RealtimeCommand {
    JoinChannel {
        topic: String,
        config: ChannelConfig,
    },
}
