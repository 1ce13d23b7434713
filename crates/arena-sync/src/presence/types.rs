use std::time::Duration;

use crate::realtime::RealtimeConfig;

use super::online::DEFAULT_ONLINE_THRESHOLD;

/// Runtime configuration for the presence service.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub heartbeat_interval: Duration,
    pub online_threshold: Duration,
    /// Live change feed. `None` leaves the roster to polling only.
    pub live_feed: Option<RealtimeConfig>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            online_threshold: DEFAULT_ONLINE_THRESHOLD,
            live_feed: None,
        }
    }
}
