//! Thin Supabase Realtime client over the Phoenix Channels v1 protocol.
//!
//! Used only for the optional live presence feed: the client joins a
//! channel subscribed to `postgres_changes` on the profile table and
//! forwards row updates. Reconnects after a fixed delay until the handle
//! is disconnected or dropped.

mod client;
mod connection;
mod handler;
mod types;

pub use client::RealtimeClient;
pub use types::{
    ChangeKind, ChannelConfig, PhoenixMessage, PostgresChangeFilter, RealtimeConfig,
    RealtimeEvent, RowChange,
};
