use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use arena_common::{Event, EventBus};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::SyncApi;
use crate::error::SyncError;
use crate::poll::{AppliedMark, PollHandle, Sequencer, Stamp};
use crate::protocol::DirectMessage;

use super::history::{ConversationHistory, DEFAULT_HISTORY_LIMIT};

#[derive(Debug, Clone)]
pub struct MessagesConfig {
    pub poll_interval: Duration,
    pub history_limit: usize,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug)]
struct Shared {
    open: Option<String>,
    history: ConversationHistory,
    applied: AppliedMark,
}

impl Shared {
    /// Applies a snapshot fetched under `stamp`. Returns the new message
    /// count when the open conversation changed.
    fn apply(
        &mut self,
        friend_id: &str,
        stamp: Stamp,
        snapshot: Vec<DirectMessage>,
    ) -> Option<usize> {
        if self.open.as_deref() != Some(friend_id) || !self.applied.admit(stamp) {
            debug!(friend_id, stamp = stamp.value(), "stale conversation snapshot dropped");
            return None;
        }
        if self.history.replace(friend_id, snapshot) {
            Some(self.history.all(friend_id).len())
        } else {
            None
        }
    }
}

#[derive(Clone)]
struct Fetcher {
    api: Arc<dyn SyncApi>,
    bus: Arc<EventBus>,
    shared: Arc<RwLock<Shared>>,
    sequencer: Arc<Sequencer>,
}

impl Fetcher {
    async fn poll(&self, friend_id: &str) -> Result<(), SyncError> {
        let stamp = self.sequencer.next();
        let snapshot = self.api.messages(friend_id).await?;

        let applied = self.shared.write().await.apply(friend_id, stamp, snapshot);
        if let Some(messages) = applied {
            self.bus.publish(Event::ConversationUpdated {
                friend_id: friend_id.to_string(),
                messages,
            });
        }
        Ok(())
    }
}

/// Polls the open direct-message conversation.
///
/// One conversation at a time: opening another tears the previous timer
/// down first.
pub struct ConversationPoller {
    config: MessagesConfig,
    fetcher: Fetcher,
    handle: Option<PollHandle>,
}

impl ConversationPoller {
    pub fn new(config: MessagesConfig, api: Arc<dyn SyncApi>, bus: Arc<EventBus>) -> Self {
        let shared = Shared {
            open: None,
            history: ConversationHistory::new(config.history_limit),
            applied: AppliedMark::default(),
        };
        Self {
            fetcher: Fetcher {
                api,
                bus,
                shared: Arc::new(RwLock::new(shared)),
                sequencer: Arc::new(Sequencer::new()),
            },
            config,
            handle: None,
        }
    }

    pub async fn open(&mut self, friend_id: &str) {
        self.stop_timer();
        self.fetcher.shared.write().await.open = Some(friend_id.to_string());

        let fetcher = self.fetcher.clone();
        let friend = friend_id.to_string();
        self.handle = Some(PollHandle::spawn(
            "conversation",
            self.config.poll_interval,
            move || {
                let fetcher = fetcher.clone();
                let friend = friend.clone();
                async move {
                    if let Err(e) = fetcher.poll(&friend).await {
                        warn!(friend_id = %friend, error = %e, "message poll failed");
                    }
                    ControlFlow::Continue(())
                }
            },
        ));
        info!(friend_id, "conversation opened");
    }

    /// Stops polling and drops the closed conversation's history.
    pub async fn close(&mut self) {
        self.stop_timer();
        let mut shared = self.fetcher.shared.write().await;
        if let Some(friend) = shared.open.take() {
            shared.history.clear_conversation(&friend);
        }
    }

    fn stop_timer(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.fetcher.shared.read().await.open.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().is_some_and(PollHandle::is_running)
    }

    /// One poll of the open conversation outside the timer.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let Some(friend) = self.current().await else {
            return Ok(());
        };
        self.fetcher.poll(&friend).await
    }

    /// Messages of the open conversation, oldest first.
    pub async fn messages(&self) -> Vec<DirectMessage> {
        let shared = self.fetcher.shared.read().await;
        match shared.open.as_deref() {
            Some(friend) => shared.history.all(friend).into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Posts a message to the open conversation, then refreshes it.
    pub async fn send(&self, content: &str) -> Result<DirectMessage, SyncError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::InvalidState("empty message".into()));
        }
        let friend = self
            .current()
            .await
            .ok_or_else(|| SyncError::InvalidState("no conversation open".into()))?;

        let sent = self.fetcher.api.send_message(&friend, content).await?;
        // Stamped after the post: snapshots requested before it cannot
        // overwrite the sent message.
        let stamp = self.fetcher.sequencer.next();
        {
            let mut shared = self.fetcher.shared.write().await;
            shared.applied.admit(stamp);
            shared.history.push(&friend, sent.clone());
        }

        if let Err(e) = self.fetcher.poll(&friend).await {
            warn!(friend_id = %friend, error = %e, "refresh after send failed");
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, FakeBackend};

    fn poller(backend: &Arc<FakeBackend>, user: &str) -> ConversationPoller {
        let api = Arc::new(FakeApi::new(backend, user));
        ConversationPoller::new(MessagesConfig::default(), api, Arc::new(EventBus::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn incoming_message_shows_up_within_one_interval() {
        let backend = FakeBackend::new();
        let mut me = poller(&backend, "me");
        let mut friend = poller(&backend, "f1");

        me.open("f1").await;
        friend.open("me").await;
        friend.send("hello").await.unwrap();
        assert_eq!(friend.messages().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(5) + Duration::from_millis(10)).await;
        let mine = me.messages().await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].content, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn opening_another_conversation_replaces_poller() {
        let backend = FakeBackend::new();
        let mut me = poller(&backend, "me");
        me.open("f1").await;
        me.send("to f1").await.unwrap();

        me.open("f2").await;
        assert_eq!(me.current().await.as_deref(), Some("f2"));
        assert!(me.messages().await.is_empty());
        assert!(me.is_polling());

        me.close().await;
        assert!(!me.is_polling());
        assert!(me.current().await.is_none());
    }

    #[tokio::test]
    async fn send_validates_input() {
        let backend = FakeBackend::new();
        let mut me = poller(&backend, "me");
        assert!(matches!(me.send("hi").await, Err(SyncError::InvalidState(_))));

        me.open("f1").await;
        assert!(matches!(me.send("   ").await, Err(SyncError::InvalidState(_))));
        assert_eq!(backend.message_count(), 0);

        let sent = me.send("  hi  ").await.unwrap();
        assert_eq!(sent.content, "hi");
    }

    #[tokio::test]
    async fn snapshot_requested_before_send_cannot_drop_it() {
        let backend = FakeBackend::new();
        let mut me = poller(&backend, "me");
        me.open("f1").await;
        let before_send = me.fetcher.sequencer.next();

        backend.fail_message_polls(true);
        me.send("hi").await.unwrap();
        assert_eq!(me.messages().await.len(), 1);

        let applied = me
            .fetcher
            .shared
            .write()
            .await
            .apply("f1", before_send, Vec::new());
        assert!(applied.is_none());
        assert_eq!(me.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn close_drops_conversation() {
        let backend = FakeBackend::new();
        let mut me = poller(&backend, "me");
        me.open("f1").await;
        me.send("hi").await.unwrap();

        me.close().await;
        let shared = me.fetcher.shared.read().await;
        assert!(shared.history.all("f1").is_empty());
    }

    #[tokio::test]
    async fn poll_failure_keeps_history() {
        let backend = FakeBackend::new();
        let mut me = poller(&backend, "me");
        me.open("f1").await;
        me.send("first").await.unwrap();

        backend.fail_messages(true);
        assert!(me.refresh().await.is_err());
        assert_eq!(me.messages().await.len(), 1);
    }
}
