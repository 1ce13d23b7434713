use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use arena_common::{Event, EventBus, Toast};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::SyncApi;
use crate::poll::{PollHandle, Sequencer};
use crate::protocol::Notification;

use super::synchronizer::NotificationSynchronizer;

/// Runtime configuration for the notification poll.
#[derive(Debug, Clone)]
pub struct NotificationsConfig {
    pub poll_interval: Duration,
    pub unread_summary: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            unread_summary: true,
        }
    }
}

/// Shared pieces a poll tick needs.
#[derive(Clone)]
struct Poller {
    api: Arc<dyn SyncApi>,
    state: Arc<RwLock<NotificationSynchronizer>>,
    sequencer: Arc<Sequencer>,
    bus: Arc<EventBus>,
}

impl Poller {
    /// Fetch and apply one snapshot. Failures leave state untouched.
    async fn poll(&self) {
        let stamp = self.sequencer.next();
        let snapshot = match self.api.notifications().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "notification poll failed");
                return;
            }
        };

        let outcome = self.state.write().await.apply_snapshot(stamp, snapshot);
        let Some(outcome) = outcome else {
            debug!(stamp = stamp.value(), "stale notification snapshot dropped");
            return;
        };

        for toast in outcome.toasts {
            self.bus.publish(Event::Toast(toast));
        }
        self.bus.publish(Event::InboxUpdated {
            total: outcome.total,
            unread: outcome.unread,
        });
    }
}

/// Polls the inbox and owns the seen cursor and local read cache.
pub struct NotificationService {
    config: NotificationsConfig,
    poller: Poller,
    handle: Option<PollHandle>,
}

impl NotificationService {
    pub fn new(config: NotificationsConfig, api: Arc<dyn SyncApi>, bus: Arc<EventBus>) -> Self {
        let state = NotificationSynchronizer::new(config.unread_summary);
        Self {
            poller: Poller {
                api,
                state: Arc::new(RwLock::new(state)),
                sequencer: Arc::new(Sequencer::new()),
                bus,
            },
            config,
            handle: None,
        }
    }

    /// Poll immediately, then every `poll_interval`.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let poller = self.poller.clone();
        self.handle = Some(PollHandle::spawn(
            "notifications",
            self.config.poll_interval,
            move || {
                let poller = poller.clone();
                async move {
                    poller.poll().await;
                    ControlFlow::Continue(())
                }
            },
        ));
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "notification polling started"
        );
    }

    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }

    /// One poll outside the timer.
    pub async fn refresh(&self) {
        self.poller.poll().await;
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.poller.state.read().await.notifications().to_vec()
    }

    pub async fn unread_count(&self) -> usize {
        self.poller.state.read().await.unread_count()
    }

    /// Local-first: the item is read as soon as this returns. The server
    /// commit runs in the background and is neither retried nor rolled
    /// back; a failure is logged and published as a toast.
    pub async fn mark_read(&self, id: &str) {
        let (changed, total, unread) = {
            let mut state = self.poller.state.write().await;
            let changed = state.mark_read(id);
            (changed, state.notifications().len(), state.unread_count())
        };
        if changed {
            self.poller.bus.publish(Event::InboxUpdated { total, unread });
        }

        let api = Arc::clone(&self.poller.api);
        let bus = Arc::clone(&self.poller.bus);
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = api.mark_read(&id).await {
                warn!(notification_id = %id, error = %e, "mark-read commit failed");
                bus.publish(Event::Toast(Toast::action_failed(
                    "Could not mark as read",
                    e.to_string(),
                )));
            }
        });
    }

    /// Clears the local list entirely, then commits in the background.
    pub async fn mark_all_read(&self) {
        self.poller.state.write().await.mark_all_read();
        self.poller
            .bus
            .publish(Event::InboxUpdated { total: 0, unread: 0 });

        let api = Arc::clone(&self.poller.api);
        let bus = Arc::clone(&self.poller.bus);
        tokio::spawn(async move {
            if let Err(e) = api.mark_all_read().await {
                warn!(error = %e, "mark-all-read commit failed");
                bus.publish(Event::Toast(Toast::action_failed(
                    "Could not mark all as read",
                    e.to_string(),
                )));
            }
        });
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(PollHandle::is_running)
    }
}
