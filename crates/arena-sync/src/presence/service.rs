use std::sync::Arc;

use arena_common::{Event, EventBus};
use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::SyncApi;
use crate::error::SyncError;
use crate::identity::Identity;
use crate::poll::{PollHandle, Sequencer};
use crate::realtime::{ChannelConfig, PostgresChangeFilter, RealtimeClient};

use super::feed::{run_feed, PRESENCE_TOPIC, PROFILE_SCHEMA, PROFILE_TABLE};
use super::heartbeat::{HeartbeatOutcome, HeartbeatTask};
use super::roster::{PresenceRoster, RosterMember};
use super::types::PresenceConfig;
use super::writer::PresenceWriter;

struct LiveFeed {
    client: RealtimeClient,
    task: JoinHandle<()>,
}

/// Presence for one authenticated actor: heartbeat, roster, live feed.
pub struct PresenceService {
    identity: Identity,
    config: PresenceConfig,
    api: Arc<dyn SyncApi>,
    writer: Arc<dyn PresenceWriter>,
    roster: Arc<RwLock<PresenceRoster>>,
    roster_seq: Sequencer,
    bus: Arc<EventBus>,
    visible: watch::Sender<bool>,
    heartbeat: Option<PollHandle>,
    feed: Option<LiveFeed>,
}

impl PresenceService {
    pub fn new(
        identity: Identity,
        config: PresenceConfig,
        api: Arc<dyn SyncApi>,
        writer: Arc<dyn PresenceWriter>,
        bus: Arc<EventBus>,
    ) -> Self {
        let (visible, _) = watch::channel(true);
        Self {
            identity,
            config,
            api,
            writer,
            roster: Arc::new(RwLock::new(PresenceRoster::new())),
            roster_seq: Sequencer::new(),
            bus,
            visible,
            heartbeat: None,
            feed: None,
        }
    }

    /// Starts the heartbeat (first beat immediately) and, when configured,
    /// the live feed. Calling it again while running is a no-op.
    pub async fn start(&mut self) {
        if self.heartbeat.is_none() {
            let task = HeartbeatTask::new(
                Arc::clone(&self.writer),
                self.identity.user_id.clone(),
                self.visible.subscribe(),
            );
            self.heartbeat = Some(task.spawn(self.config.heartbeat_interval));
            info!(
                user_id = %self.identity.user_id,
                writer = self.writer.name(),
                interval_secs = self.config.heartbeat_interval.as_secs(),
                "presence heartbeat started"
            );
        }

        if self.feed.is_none() {
            if let Some(rt_config) = self.config.live_feed.clone() {
                let (client, events) = RealtimeClient::connect(rt_config);
                client
                    .join_channel(
                        PRESENCE_TOPIC,
                        ChannelConfig {
                            postgres_changes: vec![PostgresChangeFilter::updates(
                                PROFILE_SCHEMA,
                                PROFILE_TABLE,
                            )],
                        },
                    )
                    .await;
                let task = tokio::spawn(run_feed(
                    events,
                    Arc::clone(&self.roster),
                    Arc::clone(&self.bus),
                    self.config.online_threshold,
                ));
                self.feed = Some(LiveFeed { client, task });
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut hb) = self.heartbeat.take() {
            hb.stop();
        }
        if let Some(feed) = self.feed.take() {
            feed.client.disconnect();
            feed.task.abort();
        }
        debug!(user_id = %self.identity.user_id, "presence stopped");
    }

    pub fn is_running(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(PollHandle::is_running)
    }

    /// Gate the heartbeat on whether the consuming surface is visible.
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    /// One beat outside the timer, e.g. when the surface regains focus.
    pub async fn emit_heartbeat(&self) -> HeartbeatOutcome {
        HeartbeatTask::new(
            Arc::clone(&self.writer),
            self.identity.user_id.clone(),
            self.visible.subscribe(),
        )
        .emit()
        .await
    }

    /// Re-fetch the community roster, trying the public fallback once
    /// if the primary endpoint fails. Returns the member count.
    pub async fn refresh_roster(&self) -> Result<usize, SyncError> {
        let stamp = self.roster_seq.next();
        let members = match self.api.community().await {
            Ok(members) => members,
            Err(e) => {
                warn!(error = %e, "community fetch failed, using public fallback");
                self.api.community_fallback().await?
            }
        };

        let now = Utc::now();
        let mut roster = self.roster.write().await;
        if !roster.seed_stamped(stamp, &members) {
            debug!(stamp = stamp.value(), "stale roster response dropped");
            return Ok(roster.len());
        }
        let online = roster.online_count(
            now,
            self.config.online_threshold,
            Some(&self.identity.user_id),
        );
        self.bus.publish(Event::RosterRefreshed {
            members: roster.len(),
            online,
        });
        Ok(roster.len())
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.roster
            .read()
            .await
            .is_online(user_id, Utc::now(), self.config.online_threshold)
    }

    /// Online members other than the caller.
    pub async fn online_count(&self) -> usize {
        self.roster.read().await.online_count(
            Utc::now(),
            self.config.online_threshold,
            Some(&self.identity.user_id),
        )
    }

    pub async fn roster(&self) -> Vec<RosterMember> {
        self.roster
            .read()
            .await
            .members(Utc::now(), self.config.online_threshold)
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }
}

impl Drop for PresenceService {
    fn drop(&mut self) {
        self.stop();
    }
}
