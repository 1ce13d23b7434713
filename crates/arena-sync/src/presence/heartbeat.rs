use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::poll::PollHandle;

use super::writer::PresenceWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Sent,
    /// The consuming surface is hidden; no write was attempted.
    Skipped,
    /// The write failed. Logged and dropped; the next interval retries.
    Failed,
}

/// Emits the caller's liveness signal.
///
/// Only exists inside an authenticated session, so the auth gate is the
/// session lifetime; the visibility gate is a `watch` flag flipped by the
/// surface.
#[derive(Clone)]
pub struct HeartbeatTask {
    writer: Arc<dyn PresenceWriter>,
    user_id: String,
    visible: watch::Receiver<bool>,
}

impl HeartbeatTask {
    pub fn new(
        writer: Arc<dyn PresenceWriter>,
        user_id: impl Into<String>,
        visible: watch::Receiver<bool>,
    ) -> Self {
        Self {
            writer,
            user_id: user_id.into(),
            visible,
        }
    }

    /// One fire-and-forget beat. Never returns an error.
    pub async fn emit(&self) -> HeartbeatOutcome {
        if !*self.visible.borrow() {
            debug!(user_id = %self.user_id, "heartbeat skipped while hidden");
            return HeartbeatOutcome::Skipped;
        }
        match self.writer.write(&self.user_id, Utc::now()).await {
            Ok(()) => {
                debug!(user_id = %self.user_id, writer = self.writer.name(), "heartbeat sent");
                HeartbeatOutcome::Sent
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "heartbeat failed");
                HeartbeatOutcome::Failed
            }
        }
    }

    /// Beats immediately, then every `interval`.
    pub fn spawn(self, interval: Duration) -> PollHandle {
        PollHandle::spawn("heartbeat", interval, move || {
            let task = self.clone();
            async move {
                task.emit().await;
                ControlFlow::Continue(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::BackendHeartbeat;
    use crate::testing::{FakeApi, FakeBackend};

    fn task(backend: &Arc<FakeBackend>, visible: watch::Receiver<bool>) -> HeartbeatTask {
        let api = Arc::new(FakeApi::new(backend, "u1"));
        HeartbeatTask::new(Arc::new(BackendHeartbeat::new(api)), "u1", visible)
    }

    #[tokio::test]
    async fn hidden_surface_skips_write() {
        let backend = FakeBackend::new();
        let (tx, rx) = watch::channel(false);
        let hb = task(&backend, rx);

        assert_eq!(hb.emit().await, HeartbeatOutcome::Skipped);
        assert_eq!(backend.heartbeats("u1"), 0);

        tx.send_replace(true);
        assert_eq!(hb.emit().await, HeartbeatOutcome::Sent);
        assert_eq!(backend.heartbeats("u1"), 1);
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let backend = FakeBackend::new();
        backend.fail_heartbeats(true);
        let (_tx, rx) = watch::channel(true);
        assert_eq!(task(&backend, rx).emit().await, HeartbeatOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn beats_immediately_then_on_interval() {
        let backend = FakeBackend::new();
        let (tx, rx) = watch::channel(true);
        let mut handle = task(&backend, rx).spawn(Duration::from_secs(30));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.heartbeats("u1"), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.heartbeats("u1"), 3);

        tx.send_replace(false);
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(backend.heartbeats("u1"), 3);

        handle.stop();
    }
}
