//! Per-section validators.

use crate::schema::{ArenaConfig, PresenceWriterKind};

use super::helpers::{validate_http_url, validate_range};

pub(crate) fn validate_api(errors: &mut Vec<String>, config: &ArenaConfig) {
    validate_http_url(errors, "api.base_url", &config.api.base_url);
    validate_range(errors, "api.request_timeout", config.api.request_timeout, 1, 120);
    validate_range(errors, "api.connect_timeout", config.api.connect_timeout, 1, 60);
    if !config.api.supabase_url.is_empty() {
        validate_http_url(errors, "api.supabase_url", &config.api.supabase_url);
    }
}

/// Presence intervals, plus the anti-flapping rule: a user who heartbeats
/// on schedule must never look offline between two beats.
pub(crate) fn validate_presence(errors: &mut Vec<String>, config: &ArenaConfig) {
    let presence = &config.presence;
    validate_range(
        errors,
        "presence.heartbeat_interval",
        presence.heartbeat_interval,
        5,
        600,
    );
    validate_range(
        errors,
        "presence.live_feed_reconnect",
        presence.live_feed_reconnect,
        1,
        300,
    );
    if presence.online_threshold < presence.heartbeat_interval {
        errors.push(format!(
            "presence.online_threshold = {} must be >= presence.heartbeat_interval = {}",
            presence.online_threshold, presence.heartbeat_interval
        ));
    }
    let needs_supabase = presence.live_feed || presence.writer == PresenceWriterKind::Direct;
    if presence.enabled && needs_supabase && !config.api.has_supabase() {
        errors.push(
            "presence.live_feed and presence.writer = \"direct\" require api.supabase_url and api.supabase_anon_key"
                .to_string(),
        );
    }
}

pub(crate) fn validate_notifications(errors: &mut Vec<String>, config: &ArenaConfig) {
    validate_range(
        errors,
        "notifications.poll_interval",
        config.notifications.poll_interval,
        5,
        600,
    );
}

pub(crate) fn validate_matchmaking(errors: &mut Vec<String>, config: &ArenaConfig) {
    validate_range(
        errors,
        "matchmaking.poll_interval",
        config.matchmaking.poll_interval,
        1,
        30,
    );
    if config.matchmaking.mode.trim().is_empty() {
        errors.push("matchmaking.mode must not be empty".to_string());
    }
}

pub(crate) fn validate_messages(errors: &mut Vec<String>, config: &ArenaConfig) {
    validate_range(
        errors,
        "messages.poll_interval",
        config.messages.poll_interval,
        1,
        60,
    );
    validate_range(
        errors,
        "messages.history_limit",
        config.messages.history_limit,
        10,
        500,
    );
}
