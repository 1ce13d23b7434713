//! Public handle for interacting with the Supabase Realtime connection.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use super::connection::connection_loop;
use super::types::{ChannelConfig, RealtimeCommand, RealtimeConfig, RealtimeEvent};

/// Handle for interacting with the Supabase Realtime connection.
///
/// Methods send commands to the background connection task. Dropping the
/// handle shuts the connection down.
pub struct RealtimeClient {
    command_tx: mpsc::Sender<RealtimeCommand>,
    connected: Arc<RwLock<bool>>,
    shutdown: CancellationToken,
}

impl RealtimeClient {
    /// Create a new client and start the background connection.
    /// Returns `(client, event_receiver)`.
    pub fn connect(config: RealtimeConfig) -> (Self, mpsc::Receiver<RealtimeEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(false));
        let shutdown = CancellationToken::new();

        tokio::spawn(connection_loop(
            config,
            Arc::clone(&connected),
            event_tx,
            command_rx,
            shutdown.clone(),
        ));

        let client = Self {
            command_tx,
            connected,
            shutdown,
        };
        (client, event_rx)
    }

    /// Join a channel. The join is replayed after every reconnect.
    pub async fn join_channel(&self, topic: &str, config: ChannelConfig) {
        let _ = self
            .command_tx
            .send(RealtimeCommand::JoinChannel {
                topic: topic.to_string(),
                config,
            })
            .await;
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Leave every channel, close the socket and stop reconnecting.
    pub fn disconnect(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{ChangeKind, PostgresChangeFilter};
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    async fn next_event(rx: &mut mpsc::Receiver<RealtimeEvent>) -> RealtimeEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for realtime event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn joins_channel_and_forwards_row_changes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let join = loop {
                if let Some(Ok(WsMessage::Text(text))) = ws.next().await {
                    let msg: serde_json::Value = serde_json::from_str(&text).unwrap();
                    if msg["event"] == "phx_join" {
                        break msg;
                    }
                }
            };
            assert_eq!(join["topic"], "realtime:presence-feed");
            assert_eq!(join["payload"]["config"]["postgres_changes"][0]["table"], "users");

            let reply = serde_json::json!({
                "topic": "realtime:presence-feed", "event": "phx_reply",
                "payload": {"status": "ok", "response": {}}, "ref": join["ref"]
            });
            ws.send(WsMessage::Text(reply.to_string().into())).await.unwrap();

            let change = serde_json::json!({
                "topic": "realtime:presence-feed", "event": "postgres_changes",
                "payload": {"ids": [1], "data": {
                    "type": "UPDATE", "schema": "public", "table": "users",
                    "record": {"id": "u2", "last_seen": "2024-05-01T10:00:00+00:00"}
                }},
                "ref": null
            });
            ws.send(WsMessage::Text(change.to_string().into())).await.unwrap();

            // Hold the socket open until the client leaves.
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });

        let config = RealtimeConfig {
            project_url: format!("http://{addr}"),
            api_key: "anon".into(),
            ..Default::default()
        };
        let (client, mut rx) = RealtimeClient::connect(config);
        client
            .join_channel(
                "presence-feed",
                ChannelConfig {
                    postgres_changes: vec![PostgresChangeFilter::updates("public", "users")],
                },
            )
            .await;

        assert!(matches!(next_event(&mut rx).await, RealtimeEvent::Connected));
        assert!(client.is_connected().await);
        assert!(matches!(
            next_event(&mut rx).await,
            RealtimeEvent::ChannelJoined { ref topic } if topic == "presence-feed"
        ));
        match next_event(&mut rx).await {
            RealtimeEvent::RowChange(change) => {
                assert_eq!(change.kind, ChangeKind::Update);
                assert_eq!(change.record["id"], "u2");
            }
            other => panic!("expected row change, got {other:?}"),
        }

        client.disconnect();
        assert!(matches!(next_event(&mut rx).await, RealtimeEvent::Disconnected));
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn refused_connection_reports_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = RealtimeConfig {
            project_url: format!("http://{addr}"),
            api_key: "anon".into(),
            reconnect_delay_secs: 60,
            ..Default::default()
        };
        let (client, mut rx) = RealtimeClient::connect(config);
        assert!(matches!(next_event(&mut rx).await, RealtimeEvent::Error(_)));
        assert!(!client.is_connected().await);
    }
}
