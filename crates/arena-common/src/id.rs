use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Short hex tag attached to outgoing requests so a log line can be matched
/// to the poll cycle that issued it.
pub fn new_correlation_id() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}

/// Identifies one sync session, from login until stop or logout.
///
/// A fresh id is minted per login, so two sessions of the same user never
/// share one. Log lines use [`SessionId::short`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex digits.
    pub fn short(&self) -> String {
        let mut short = self.0.simple().to_string();
        short.truncate(8);
        short
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}
