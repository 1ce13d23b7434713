//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Arena Sync Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.
#
# Polling stands in for a push channel: every interval below trades
# freshness against request volume.

[api]
base_url = "http://localhost:8000/api"
# request_timeout = 10   # seconds, 1-120
# connect_timeout = 5    # seconds, 1-60
# supabase_url = ""      # enables direct presence writes and the live feed
# supabase_anon_key = ""

[presence]
# enabled = true
# heartbeat_interval = 30   # seconds, 5-600
# online_threshold = 120    # seconds, must be >= heartbeat_interval
# writer = "backend"        # backend, direct
# fallback_writer = true    # try the other path when the primary fails
# live_feed = false         # live last_seen updates over Supabase Realtime
# live_feed_reconnect = 5   # seconds, fixed delay

[notifications]
# enabled = true
# poll_interval = 30        # seconds, 5-600
# unread_summary = true     # one "N unread" toast per session

[matchmaking]
# poll_interval = 3         # seconds, 1-30
# mode = "pvp"

[messages]
# poll_interval = 5         # seconds, 1-60
# history_limit = 50        # 10-500

[logging]
# level = "info"            # trace, debug, info, warn, error
# json = false
"##
    .to_string()
}
