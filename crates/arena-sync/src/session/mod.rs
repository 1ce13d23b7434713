//! One authenticated session: every sync service started at login and
//! torn down at logout.

use std::sync::Arc;

use arena_common::{Event, EventBus, SessionId};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::api::SyncApi;
use crate::identity::Identity;
use crate::matchmaking::{MatchmakingConfig, RoomCoordinator, RoomRegistry};
use crate::messages::{ConversationPoller, MessagesConfig};
use crate::notifications::{NotificationService, NotificationsConfig};
use crate::presence::{PresenceConfig, PresenceService, PresenceWriter};

/// Runtime configuration for every service a session owns.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub presence: PresenceConfig,
    pub notifications: NotificationsConfig,
    pub matchmaking: MatchmakingConfig,
    pub messages: MessagesConfig,
    /// Run the heartbeat. The roster is available either way.
    pub presence_enabled: bool,
    pub notifications_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            presence: PresenceConfig::default(),
            notifications: NotificationsConfig::default(),
            matchmaking: MatchmakingConfig::default(),
            messages: MessagesConfig::default(),
            presence_enabled: true,
            notifications_enabled: true,
        }
    }
}

pub struct SyncSession {
    id: SessionId,
    identity: Identity,
    config: SyncConfig,
    api: Arc<dyn SyncApi>,
    bus: Arc<EventBus>,
    presence: PresenceService,
    notifications: NotificationService,
    conversations: ConversationPoller,
    rooms: RoomRegistry,
    stopped: bool,
}

impl SyncSession {
    /// Start heartbeat and notification polling for `identity`.
    ///
    /// The roster is loaded once up front; a failure there is logged and
    /// the session still starts.
    pub async fn start(
        identity: Identity,
        api: Arc<dyn SyncApi>,
        writer: Arc<dyn PresenceWriter>,
        config: SyncConfig,
    ) -> Self {
        let bus = Arc::new(EventBus::default());
        let id = SessionId::new();

        let mut presence = PresenceService::new(
            identity.clone(),
            config.presence.clone(),
            Arc::clone(&api),
            writer,
            Arc::clone(&bus),
        );
        let mut notifications = NotificationService::new(
            config.notifications.clone(),
            Arc::clone(&api),
            Arc::clone(&bus),
        );
        let conversations =
            ConversationPoller::new(config.messages.clone(), Arc::clone(&api), Arc::clone(&bus));

        bus.publish(Event::SessionStarted {
            user_id: identity.user_id.clone(),
        });
        if config.presence_enabled {
            presence.start().await;
        }
        if config.notifications_enabled {
            notifications.start();
        }
        if let Err(e) = presence.refresh_roster().await {
            warn!(error = %e, "initial roster load failed");
        }
        info!(session_id = %id.short(), user_id = %identity.user_id, "sync session started");

        Self {
            id,
            identity,
            config,
            api,
            bus,
            presence,
            notifications,
            conversations,
            rooms: RoomRegistry::new(),
            stopped: false,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Receiver for toasts, inbox, presence and room events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn presence(&self) -> &PresenceService {
        &self.presence
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn conversations(&mut self) -> &mut ConversationPoller {
        &mut self.conversations
    }

    /// A new coordinator for one lobby view. All coordinators of a session
    /// share one registry, so a room is only ever polled once.
    pub fn room_coordinator(&self) -> RoomCoordinator {
        RoomCoordinator::new(
            self.identity.user_id.clone(),
            self.config.matchmaking.clone(),
            Arc::clone(&self.api),
            Arc::clone(&self.bus),
            self.rooms.clone(),
        )
    }

    pub fn set_visible(&self, visible: bool) {
        self.presence.set_visible(visible);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Logout: stop every timer this session owns. Idempotent.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.shutdown();
        self.conversations.close().await;
    }

    fn shutdown(&mut self) {
        self.stopped = true;
        self.presence.stop();
        self.notifications.stop();
        self.bus.publish(Event::SessionStopped);
        info!(session_id = %self.id.short(), "sync session stopped");
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        if !self.stopped {
            self.shutdown();
        }
    }
}
