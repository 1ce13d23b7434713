use std::sync::Arc;
use std::time::Duration;

use arena_common::{Event, EventBus};
use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::{parse_timestamp, PresenceRecord};
use crate::realtime::{ChangeKind, RealtimeEvent};

use super::roster::{ApplyOutcome, PresenceRoster};

/// Channel the live presence feed joins.
pub const PRESENCE_TOPIC: &str = "presence-feed";
pub(crate) const PROFILE_SCHEMA: &str = "public";
pub(crate) const PROFILE_TABLE: &str = "users";

/// Extract a presence record from a profile row.
pub fn record_from_row(row: &serde_json::Value) -> Option<PresenceRecord> {
    let user_id = row.get("id")?.as_str()?.to_string();
    let last_seen = row
        .get("last_seen")
        .and_then(|v| v.as_str())
        .and_then(parse_timestamp);
    Some(PresenceRecord { user_id, last_seen })
}

/// Applies live row updates to the roster until the realtime client goes
/// away. Publishes `PresenceChanged` when a user's online state flips.
pub(crate) async fn run_feed(
    mut events: mpsc::Receiver<RealtimeEvent>,
    roster: Arc<RwLock<PresenceRoster>>,
    bus: Arc<EventBus>,
    threshold: Duration,
) {
    while let Some(event) = events.recv().await {
        match event {
            RealtimeEvent::RowChange(change) => {
                if change.kind != ChangeKind::Update || change.table != PROFILE_TABLE {
                    continue;
                }
                let Some(record) = record_from_row(&change.record) else {
                    debug!("profile row without id");
                    continue;
                };

                let now = Utc::now();
                let mut roster = roster.write().await;
                let was_online = roster.is_online(&record.user_id, now, threshold);
                if roster.apply(&record) == ApplyOutcome::Advanced {
                    let online = roster.is_online(&record.user_id, now, threshold);
                    if online != was_online {
                        bus.publish(Event::PresenceChanged {
                            user_id: record.user_id.clone(),
                            online,
                        });
                    }
                }
            }
            RealtimeEvent::Connected => info!("presence feed connected"),
            RealtimeEvent::Disconnected => info!("presence feed disconnected"),
            RealtimeEvent::ChannelJoined { topic } => debug!(topic = %topic, "presence feed joined"),
            RealtimeEvent::ChannelError { topic, message } => {
                warn!(topic = %topic, message = %message, "presence feed channel error");
            }
            RealtimeEvent::Error(e) => warn!(error = %e, "presence feed error"),
        }
    }
    debug!("presence feed ended");
}
