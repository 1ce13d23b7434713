//! The resource client: a stateless request/response boundary shared by
//! every sync service.

mod config;
mod http;
mod supabase;


use async_trait::async_trait;

use crate::error::SyncError;
use crate::protocol::{
    CommunityMember, DirectMessage, MatchSnapshot, MatchTicket, Notification,
};

pub use config::HttpApiConfig;
pub use http::HttpApi;
pub use supabase::SupabaseRest;

/// Backend operations the sync services depend on.
///
/// Implemented over HTTP by [`HttpApi`]; tests substitute an in-memory
/// backend.
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Refresh the caller's `last_seen`. Idempotent.
    async fn heartbeat(&self) -> Result<(), SyncError>;

    /// The caller's inbox, newest first.
    async fn notifications(&self) -> Result<Vec<Notification>, SyncError>;

    async fn mark_read(&self, notification_id: &str) -> Result<(), SyncError>;

    async fn mark_all_read(&self) -> Result<(), SyncError>;

    async fn create_match(&self, mode: &str) -> Result<MatchTicket, SyncError>;

    /// Join the waiting room with `room_code`. `NotFound` when no such
    /// room is waiting.
    async fn join_match(&self, room_code: &str) -> Result<MatchTicket, SyncError>;

    async fn match_state(&self, match_id: &str) -> Result<MatchSnapshot, SyncError>;

    async fn start_match(&self, match_id: &str) -> Result<(), SyncError>;

    async fn community(&self) -> Result<Vec<CommunityMember>, SyncError>;

    /// Unauthenticated roster used when [`SyncApi::community`] fails.
    async fn community_fallback(&self) -> Result<Vec<CommunityMember>, SyncError>;

    async fn messages(&self, friend_id: &str) -> Result<Vec<DirectMessage>, SyncError>;

    async fn send_message(
        &self,
        receiver_id: &str,
        content: &str,
    ) -> Result<DirectMessage, SyncError>;
}
