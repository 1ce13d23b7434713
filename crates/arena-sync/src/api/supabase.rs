use chrono::{DateTime, Utc};
use reqwest::Method;
use tracing::debug;

use super::http::check_status;
use crate::error::SyncError;
use crate::protocol::LastSeenUpdate;

/// Minimal PostgREST client for writing the caller's own profile row.
///
/// Only the direct presence writer uses it; everything else goes through
/// the backend.
pub struct SupabaseRest {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for SupabaseRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseRest")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl SupabaseRest {
    /// `project_url` is the project root, e.g. `https://abc.supabase.co`.
    pub fn new(
        project_url: &str,
        anon_key: impl Into<String>,
        access_token: Option<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
            access_token,
            http,
        }
    }

    /// `PATCH /users?id=eq.{user_id}` with the new `last_seen`.
    pub async fn touch_last_seen(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let url = format!(
            "{}/users?id=eq.{}",
            self.rest_url,
            urlencoding::encode(user_id)
        );
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        debug!(user_id, "direct presence write");

        let response = self
            .http
            .request(Method::PATCH, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Prefer", "return=minimal")
            .json(&LastSeenUpdate { last_seen: at })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
