//! Configuration schema types for Arena sync.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod api;
mod social;
mod system;

pub use api::*;
pub use social::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Intervals and the online threshold are explicit knobs: fixed-interval
/// polling stands in for a push channel, so the tradeoff between freshness
/// and request volume belongs to whoever deploys the client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArenaConfig {
    pub api: ApiConfig,
    pub presence: PresenceConfig,
    pub notifications: NotificationsConfig,
    pub matchmaking: MatchmakingConfig,
    pub messages: MessagesConfig,
    pub logging: LoggingConfig,
}
