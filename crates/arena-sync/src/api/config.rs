use std::time::Duration;

/// Connection settings for [`super::HttpApi`].
#[derive(Clone)]
pub struct HttpApiConfig {
    /// Base URL including any path prefix, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Path of the heartbeat endpoint. The legacy backend serves
    /// `/user/heartbeat`.
    pub heartbeat_path: String,
}

impl std::fmt::Debug for HttpApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("heartbeat_path", &self.heartbeat_path)
            .finish()
    }
}

impl HttpApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            heartbeat_path: crate::protocol::paths::HEARTBEAT.to_string(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
