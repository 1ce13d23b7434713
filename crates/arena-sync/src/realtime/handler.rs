//! Translation of incoming Phoenix messages into realtime events.

use tracing::{debug, info, warn};

use super::types::{ChangeKind, PhoenixMessage, RealtimeEvent, RowChange};

/// Extract the short topic name from a Phoenix topic (strip "realtime:" prefix).
fn strip_topic_prefix(topic: &str) -> &str {
    topic.strip_prefix("realtime:").unwrap_or(topic)
}

/// Parse the payload of a `postgres_changes` message.
///
/// Supabase wraps the change as `{ "ids": [...], "data": { "type", "schema",
/// "table", "record", ... } }`.
pub(crate) fn parse_row_change(topic: &str, payload: &serde_json::Value) -> Option<RowChange> {
    let data = payload.get("data")?;
    let kind = ChangeKind::parse(data.get("type")?.as_str()?)?;
    Some(RowChange {
        topic: topic.to_string(),
        schema: data.get("schema")?.as_str()?.to_string(),
        table: data.get("table")?.as_str()?.to_string(),
        kind,
        record: data
            .get("record")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})),
    })
}

/// Translate a single incoming Phoenix message. Returns `None` for
/// messages that carry nothing for the application (heartbeat replies,
/// system notices, presence traffic).
pub(crate) fn translate(msg: &PhoenixMessage) -> Option<RealtimeEvent> {
    if msg.topic == "phoenix" {
        return None;
    }
    let topic = strip_topic_prefix(&msg.topic);

    match msg.event.as_str() {
        "phx_reply" => {
            let status = msg.payload.get("status").and_then(|s| s.as_str())?;
            if status == "ok" {
                debug!(topic = %topic, "Channel reply: ok");
                Some(RealtimeEvent::ChannelJoined {
                    topic: topic.to_string(),
                })
            } else {
                let message = msg
                    .payload
                    .get("response")
                    .and_then(|r| r.get("reason"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown error")
                    .to_string();
                warn!(topic = %topic, status = %status, "Channel reply error");
                Some(RealtimeEvent::ChannelError {
                    topic: topic.to_string(),
                    message,
                })
            }
        }
        "phx_error" => {
            warn!(topic = %topic, "Channel error");
            Some(RealtimeEvent::ChannelError {
                topic: topic.to_string(),
                message: "Channel error".to_string(),
            })
        }
        "phx_close" => {
            info!(topic = %topic, "Channel closed");
            Some(RealtimeEvent::ChannelError {
                topic: topic.to_string(),
                message: "Channel closed".to_string(),
            })
        }
        "postgres_changes" => match parse_row_change(topic, &msg.payload) {
            Some(change) => {
                debug!(topic = %topic, table = %change.table, "Row change received");
                Some(RealtimeEvent::RowChange(change))
            }
            None => {
                debug!(topic = %topic, "Malformed postgres_changes payload");
                None
            }
        },
        _ => {
            debug!(topic = %topic, event = %msg.event, "Unhandled Phoenix event");
            None
        }
    }
}
