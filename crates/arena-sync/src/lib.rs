//! Client-side synchronization for Arena: presence, the notification
//! inbox, quiz-room matchmaking and direct-message polling.
//!
//! Every service is explicitly constructed with its backend handle and
//! owns its background timers; `SyncSession` ties them to one
//! authenticated identity.

pub mod api;
pub mod error;
pub mod identity;
pub mod matchmaking;
pub mod messages;
pub mod notifications;
pub mod poll;
pub mod presence;
pub mod protocol;
pub mod realtime;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpApi, HttpApiConfig, SupabaseRest, SyncApi};
pub use error::SyncError;
pub use identity::Identity;
pub use matchmaking::{
    MatchmakingConfig, RoomCode, RoomCoordinator, RoomPhase, RoomRegistry, RoomState,
};
pub use messages::{ConversationHistory, ConversationPoller, MessagesConfig};
pub use notifications::{NotificationService, NotificationSynchronizer, NotificationsConfig};
pub use poll::{PollHandle, Sequencer, Stamp};
pub use presence::{is_online, PresenceConfig, PresenceRoster, PresenceService, PresenceWriter};
pub use protocol::{
    CommunityMember, DirectMessage, MatchSnapshot, MatchTicket, Notification, PresenceRecord,
    RoomStatus,
};
pub use realtime::{RealtimeClient, RealtimeConfig};
pub use session::{SyncConfig, SyncSession};
