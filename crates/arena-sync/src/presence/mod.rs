//! Presence: liveness heartbeats, the online predicate, and the community
//! roster kept fresh by polling and an optional live change feed.

mod feed;
mod heartbeat;
mod online;
mod roster;
mod service;
mod types;
mod writer;

pub use feed::{record_from_row, PRESENCE_TOPIC};
pub use heartbeat::{HeartbeatOutcome, HeartbeatTask};
pub use online::{is_online, OnlineThreshold, DEFAULT_ONLINE_THRESHOLD};
pub use roster::{ApplyOutcome, PresenceRoster, RosterMember};
pub use service::PresenceService;
pub use types::PresenceConfig;
pub use writer::{build_writer, BackendHeartbeat, DirectWrite, FallbackWriter, PresenceWriter};
