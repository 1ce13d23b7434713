use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::{SupabaseRest, SyncApi};
use crate::error::SyncError;

/// Strategy for persisting the caller's liveness timestamp.
#[async_trait]
pub trait PresenceWriter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), SyncError>;
}

/// Asks the backend to stamp `last_seen` with its own clock.
pub struct BackendHeartbeat {
    api: Arc<dyn SyncApi>,
}

impl BackendHeartbeat {
    pub fn new(api: Arc<dyn SyncApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PresenceWriter for BackendHeartbeat {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn write(&self, _user_id: &str, _at: DateTime<Utc>) -> Result<(), SyncError> {
        self.api.heartbeat().await
    }
}

/// Writes `last_seen` straight into the profile table.
pub struct DirectWrite {
    rest: SupabaseRest,
}

impl DirectWrite {
    pub fn new(rest: SupabaseRest) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl PresenceWriter for DirectWrite {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn write(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        self.rest.touch_last_seen(user_id, at).await
    }
}

/// Tries `primary`, and `fallback` only when the primary fails.
pub struct FallbackWriter {
    primary: Box<dyn PresenceWriter>,
    fallback: Box<dyn PresenceWriter>,
}

impl FallbackWriter {
    pub fn new(primary: Box<dyn PresenceWriter>, fallback: Box<dyn PresenceWriter>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PresenceWriter for FallbackWriter {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn write(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        match self.primary.write(user_id, at).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "presence write failed, trying fallback"
                );
                self.fallback.write(user_id, at).await
            }
        }
    }
}

/// Builds the writer chain selected by configuration.
///
/// `direct` is the Supabase client when one is configured. With
/// `prefer_direct` the direct write is primary; otherwise the backend
/// heartbeat is. With `fallback` and a Supabase client, the other strategy
/// backs up the primary.
pub fn build_writer(
    api: Arc<dyn SyncApi>,
    direct: Option<SupabaseRest>,
    prefer_direct: bool,
    fallback: bool,
) -> Arc<dyn PresenceWriter> {
    let backend: Box<dyn PresenceWriter> = Box::new(BackendHeartbeat::new(api));
    let Some(rest) = direct else {
        return Arc::from(backend);
    };
    let direct: Box<dyn PresenceWriter> = Box::new(DirectWrite::new(rest));

    let (primary, secondary) = if prefer_direct {
        (direct, backend)
    } else {
        (backend, direct)
    };
    if fallback {
        Arc::new(FallbackWriter::new(primary, secondary))
    } else {
        Arc::from(primary)
    }
}
