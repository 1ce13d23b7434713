//! Turns the file config and CLI identity into running sync clients.

use std::sync::Arc;
use std::time::Duration;

use arena_common::ArenaError;
use arena_config::schema::PresenceWriterKind;
use arena_config::ArenaConfig;
use arena_sync::presence::build_writer;
use arena_sync::{
    HttpApi, HttpApiConfig, Identity, MatchmakingConfig, MessagesConfig, NotificationsConfig,
    PresenceConfig, PresenceWriter, RealtimeConfig, SupabaseRest, SyncApi, SyncConfig,
};

fn secs(value: u32) -> Duration {
    Duration::from_secs(u64::from(value))
}

/// Signed-in identity from `--user-id` / `--token` (or their env vars).
pub fn identity(user_id: Option<String>, token: Option<String>) -> Result<Identity, ArenaError> {
    let user_id = user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ArenaError::Session("missing --user-id (or ARENA_USER_ID)".into()))?;
    let identity = Identity::new(user_id.clone(), user_id);
    Ok(match token.filter(|t| !t.is_empty()) {
        Some(token) => identity.with_token(token),
        None => identity,
    })
}

pub fn http_config(config: &ArenaConfig, identity: &Identity) -> HttpApiConfig {
    let mut http = HttpApiConfig::new(config.api.base_url.clone());
    http.request_timeout = secs(config.api.request_timeout);
    http.connect_timeout = secs(config.api.connect_timeout);
    http.access_token = identity.access_token.clone();
    http
}

/// Live feed settings, present only when enabled and Supabase is configured.
pub fn realtime_config(config: &ArenaConfig, identity: &Identity) -> Option<RealtimeConfig> {
    if !config.presence.live_feed || !config.api.has_supabase() {
        return None;
    }
    Some(RealtimeConfig {
        project_url: config.api.supabase_url.clone(),
        api_key: config.api.supabase_anon_key.clone(),
        access_token: identity.access_token.clone(),
        reconnect_delay_secs: u64::from(config.presence.live_feed_reconnect),
        ..RealtimeConfig::default()
    })
}

pub fn sync_config(config: &ArenaConfig, identity: &Identity) -> SyncConfig {
    SyncConfig {
        presence: PresenceConfig {
            heartbeat_interval: secs(config.presence.heartbeat_interval),
            online_threshold: secs(config.presence.online_threshold),
            live_feed: realtime_config(config, identity),
        },
        notifications: NotificationsConfig {
            poll_interval: secs(config.notifications.poll_interval),
            unread_summary: config.notifications.unread_summary,
        },
        matchmaking: MatchmakingConfig {
            poll_interval: secs(config.matchmaking.poll_interval),
            mode: config.matchmaking.mode.clone(),
        },
        messages: MessagesConfig {
            poll_interval: secs(config.messages.poll_interval),
            history_limit: config.messages.history_limit as usize,
        },
        presence_enabled: config.presence.enabled,
        notifications_enabled: config.notifications.enabled,
    }
}

/// The backend client plus the presence writer chosen by `[presence]`.
pub struct Clients {
    pub api: Arc<dyn SyncApi>,
    pub writer: Arc<dyn PresenceWriter>,
}

pub fn clients(config: &ArenaConfig, identity: &Identity) -> Result<Clients, ArenaError> {
    let http = HttpApi::new(http_config(config, identity))?;
    let direct = config.api.has_supabase().then(|| {
        SupabaseRest::new(
            &config.api.supabase_url,
            config.api.supabase_anon_key.clone(),
            identity.access_token.clone(),
            http.client().clone(),
        )
    });
    let api: Arc<dyn SyncApi> = Arc::new(http);
    let writer = build_writer(
        Arc::clone(&api),
        direct,
        config.presence.writer == PresenceWriterKind::Direct,
        config.presence.fallback_writer,
    );
    Ok(Clients { api, writer })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> Identity {
        Identity::new("u1", "u1").with_token("tok")
    }

    #[test]
    fn identity_requires_user_id() {
        assert!(matches!(
            identity(None, Some("t".into())),
            Err(ArenaError::Session(_))
        ));
        assert!(identity(Some("  ".into()), None).is_err());

        let id = identity(Some("u1".into()), Some("t".into())).unwrap();
        assert!(id.is_authenticated());
        let id = identity(Some("u1".into()), Some(String::new())).unwrap();
        assert!(!id.is_authenticated());
    }

    #[test]
    fn sync_config_converts_seconds() {
        let mut config = ArenaConfig::default();
        config.matchmaking.poll_interval = 2;
        config.messages.history_limit = 100;
        config.notifications.enabled = false;

        let sync = sync_config(&config, &signed_in());
        assert_eq!(sync.presence.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(sync.presence.online_threshold, Duration::from_secs(120));
        assert_eq!(sync.matchmaking.poll_interval, Duration::from_secs(2));
        assert_eq!(sync.messages.history_limit, 100);
        assert!(sync.presence_enabled);
        assert!(!sync.notifications_enabled);
    }

    #[test]
    fn live_feed_needs_supabase_settings() {
        let mut config = ArenaConfig::default();
        config.presence.live_feed = true;
        assert!(realtime_config(&config, &signed_in()).is_none());

        config.api.supabase_url = "https://proj.supabase.co".into();
        config.api.supabase_anon_key = "anon".into();
        config.presence.live_feed_reconnect = 9;
        let rt = realtime_config(&config, &signed_in()).unwrap();
        assert_eq!(rt.reconnect_delay_secs, 9);
        assert_eq!(rt.access_token.as_deref(), Some("tok"));

        config.presence.live_feed = false;
        assert!(realtime_config(&config, &signed_in()).is_none());
    }

    #[test]
    fn http_config_carries_token_and_timeouts() {
        let mut config = ArenaConfig::default();
        config.api.request_timeout = 20;
        let http = http_config(&config, &signed_in());
        assert_eq!(http.base_url, "http://localhost:8000/api");
        assert_eq!(http.request_timeout, Duration::from_secs(20));
        assert_eq!(http.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn writer_prefers_direct_when_configured() {
        let mut config = ArenaConfig::default();
        config.api.supabase_url = "https://proj.supabase.co".into();
        config.api.supabase_anon_key = "anon".into();
        config.presence.writer = PresenceWriterKind::Direct;
        config.presence.fallback_writer = false;
        let clients = clients(&config, &signed_in()).unwrap();
        assert_eq!(clients.writer.name(), "direct");

        config.presence.fallback_writer = true;
        let clients = super::clients(&config, &signed_in()).unwrap();
        assert_eq!(clients.writer.name(), "fallback");

        let clients = super::clients(&ArenaConfig::default(), &signed_in()).unwrap();
        assert_eq!(clients.writer.name(), "backend");
    }
}
