use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use arena_common::new_correlation_id;

use super::{HttpApiConfig, SyncApi};
use crate::error::SyncError;
use crate::protocol::{
    paths, CommunityMember, CreateMatchRequest, DirectMessage, ErrorBody, JoinMatchRequest,
    MatchSnapshot, MatchTicket, Notification, SendMessageRequest,
};

const CORRELATION_HEADER: &str = "x-correlation-id";

/// [`SyncApi`] over the Arena REST backend.
pub struct HttpApi {
    pub(crate) config: HttpApiConfig,
    pub(crate) http: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: HttpApiConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &HttpApiConfig {
        &self.config
    }

    /// The pooled client, for sibling clients such as [`super::SupabaseRest`].
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let cid = new_correlation_id();
        debug!(%method, path, cid = %cid, "API request");
        let mut builder = self
            .http
            .request(method, self.config.url(path))
            .header(CORRELATION_HEADER, cid);
        if let Some(ref token) = self.config.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, SyncError> {
        let response = check_status(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// A JSON array decoded row by row. Rows that fail to decode are
    /// logged and skipped.
    async fn send_rows<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        feed: &'static str,
    ) -> Result<Vec<T>, SyncError> {
        let rows: Vec<serde_json::Value> = self.send_json(builder).await?;
        Ok(decode_rows(rows, feed))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), SyncError> {
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

fn decode_rows<T: DeserializeOwned>(
    rows: Vec<serde_json::Value>,
    feed: &'static str,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(feed, error = %e, "skipping malformed row");
                None
            }
        })
        .collect()
}

/// Maps non-2xx responses onto [`SyncError`], keeping the backend's
/// `detail` message when present.
pub(crate) async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => match body.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        },
        Err(_) => text.chars().take(200).collect(),
    };

    Err(match status {
        StatusCode::NOT_FOUND => SyncError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized,
        _ => SyncError::Http {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl SyncApi for HttpApi {
    async fn heartbeat(&self) -> Result<(), SyncError> {
        let builder = self.request(Method::POST, &self.config.heartbeat_path);
        self.send_empty(builder).await
    }

    async fn notifications(&self) -> Result<Vec<Notification>, SyncError> {
        self.send_rows(self.request(Method::GET, paths::NOTIFICATIONS), "notifications")
            .await
    }

    async fn mark_read(&self, notification_id: &str) -> Result<(), SyncError> {
        let path = paths::notification_read(notification_id);
        self.send_empty(self.request(Method::POST, &path)).await
    }

    async fn mark_all_read(&self) -> Result<(), SyncError> {
        self.send_empty(self.request(Method::POST, paths::NOTIFICATIONS_READ_ALL))
            .await
    }

    async fn create_match(&self, mode: &str) -> Result<MatchTicket, SyncError> {
        let builder = self
            .request(Method::POST, paths::MATCH_CREATE)
            .json(&CreateMatchRequest { mode });
        self.send_json(builder).await
    }

    async fn join_match(&self, room_code: &str) -> Result<MatchTicket, SyncError> {
        let builder = self
            .request(Method::POST, paths::MATCH_JOIN)
            .json(&JoinMatchRequest { room_code });
        self.send_json(builder).await
    }

    async fn match_state(&self, match_id: &str) -> Result<MatchSnapshot, SyncError> {
        let path = paths::match_state(match_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn start_match(&self, match_id: &str) -> Result<(), SyncError> {
        let path = paths::match_start(match_id);
        self.send_empty(self.request(Method::POST, &path)).await
    }

    async fn community(&self) -> Result<Vec<CommunityMember>, SyncError> {
        self.send_rows(self.request(Method::GET, paths::COMMUNITY), "community")
            .await
    }

    async fn community_fallback(&self) -> Result<Vec<CommunityMember>, SyncError> {
        self.send_rows(self.request(Method::GET, paths::COMMUNITY_FALLBACK), "community")
            .await
    }

    async fn messages(&self, friend_id: &str) -> Result<Vec<DirectMessage>, SyncError> {
        let path = paths::messages(friend_id);
        self.send_rows(self.request(Method::GET, &path), "messages")
            .await
    }

    async fn send_message(
        &self,
        receiver_id: &str,
        content: &str,
    ) -> Result<DirectMessage, SyncError> {
        let builder = self
            .request(Method::POST, paths::MESSAGES_SEND)
            .json(&SendMessageRequest {
                receiver_id,
                content,
            });
        self.send_json(builder).await
    }
}
