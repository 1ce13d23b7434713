use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default staleness threshold: four heartbeats at the default 30 s cadence.
pub const DEFAULT_ONLINE_THRESHOLD: Duration = Duration::from_secs(120);

/// A user is online while `now - last_seen < threshold`. A user who has
/// never been seen is offline.
///
/// A `last_seen` in the future (clock skew between writer and viewer)
/// counts as online.
pub fn is_online(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    let Some(seen) = last_seen else {
        return false;
    };
    match (now - seen).to_std() {
        Ok(elapsed) => elapsed < threshold,
        Err(_) => true,
    }
}

/// Staleness threshold bound to a clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnlineThreshold(Duration);

impl OnlineThreshold {
    pub fn new(threshold: Duration) -> Self {
        Self(threshold)
    }

    pub fn duration(self) -> Duration {
        self.0
    }

    pub fn is_online(self, last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        is_online(last_seen, now, self.0)
    }
}

impl Default for OnlineThreshold {
    fn default() -> Self {
        Self(DEFAULT_ONLINE_THRESHOLD)
    }
}
