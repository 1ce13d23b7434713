//! Backend endpoint configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the backend and the optional Supabase project live.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST backend, e.g. `https://arena.example.com/api`.
    pub base_url: String,
    /// Request timeout in seconds (valid range: 1-120).
    pub request_timeout: u32,
    /// Connect timeout in seconds (valid range: 1-60).
    pub connect_timeout: u32,
    /// Supabase project URL, used for direct presence writes and the live
    /// presence feed. Empty disables both.
    pub supabase_url: String,
    /// Supabase anon key (publishable). Never serialized back out.
    #[serde(skip_serializing)]
    pub supabase_anon_key: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &"[REDACTED]")
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".into(),
            request_timeout: 10,
            connect_timeout: 5,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
        }
    }
}

impl ApiConfig {
    /// True when enough Supabase settings are present to talk to it directly.
    pub fn has_supabase(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}
