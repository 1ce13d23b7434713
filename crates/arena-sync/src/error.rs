use arena_common::ArenaError;

/// Errors returned by the sync services and the resource client.
///
/// Background timers never surface these; they log and skip the cycle.
/// User-initiated actions (create/join/start, send, mark-read commits)
/// return them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("only the host can start the match")]
    NotHost,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid room code: {0:?}")]
    InvalidCode(String),

    #[error("room {0} is already being polled")]
    AlreadyPolling(String),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SyncError::Timeout
        } else if e.is_decode() {
            SyncError::Decode(e.to_string())
        } else {
            SyncError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}

impl From<SyncError> for ArenaError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Network(msg) => ArenaError::Network(msg),
            SyncError::Timeout => ArenaError::Network("request timed out".into()),
            other => ArenaError::Sync(other.to_string()),
        }
    }
}
