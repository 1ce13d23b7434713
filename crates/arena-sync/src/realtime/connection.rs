//! Background WebSocket connection loop with fixed-delay reconnect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::translate;
use super::types::{ChannelConfig, PhoenixMessage, RealtimeCommand, RealtimeConfig, RealtimeEvent};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Monotonically increasing ref counter for Phoenix messages, one per socket.
#[derive(Default)]
struct RefCounter(u64);

impl RefCounter {
    fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

fn channel_message(topic: &str, event: &str, payload: serde_json::Value, refs: &mut RefCounter) -> PhoenixMessage {
    PhoenixMessage {
        topic: format!("realtime:{topic}"),
        event: event.to_string(),
        payload,
        msg_ref: Some(refs.next()),
    }
}

async fn send_frame<S>(sink: &mut S, msg: &PhoenixMessage) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(WsMessage::Text(json.into())).await.is_ok(),
        Err(_) => false,
    }
}

enum Exit {
    Lost,
    Shutdown,
}

/// Background task managing the WebSocket connection.
///
/// Joined channels are remembered and rejoined after every reconnect.
/// Ends when `shutdown` is cancelled or every client handle is dropped.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<RealtimeEvent>,
    mut command_rx: mpsc::Receiver<RealtimeCommand>,
    shutdown: CancellationToken,
) {
    let mut channels: HashMap<String, ChannelConfig> = HashMap::new();
    let reconnect_delay = Duration::from_secs(config.reconnect_delay_secs.max(1));
    let token = config.access_token.clone();

    loop {
        let url = config.ws_url();
        info!(url = %url.split('?').next().unwrap_or(""), "Connecting to Supabase Realtime");

        let attempt = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(&url));
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = attempt => result,
        };

        match result {
            Ok(Ok((ws_stream, _))) => {
                *connected.write().await = true;
                let _ = event_tx.send(RealtimeEvent::Connected).await;

                let (mut ws_write, mut ws_read) = ws_stream.split();
                let mut refs = RefCounter::default();

                for (topic, channel) in &channels {
                    let join = channel_message(
                        topic,
                        "phx_join",
                        channel.to_join_payload(token.as_deref()),
                        &mut refs,
                    );
                    send_frame(&mut ws_write, &join).await;
                }

                let mut heartbeat =
                    tokio::time::interval(Duration::from_secs(config.heartbeat_interval_secs.max(1)));
                heartbeat.tick().await;

                let exit = loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break Exit::Shutdown,
                        _ = heartbeat.tick() => {
                            let beat = PhoenixMessage {
                                topic: "phoenix".to_string(),
                                event: "heartbeat".to_string(),
                                payload: serde_json::json!({}),
                                msg_ref: Some(refs.next()),
                            };
                            if !send_frame(&mut ws_write, &beat).await {
                                break Exit::Lost;
                            }
                        }
                        cmd = command_rx.recv() => match cmd {
                            Some(RealtimeCommand::JoinChannel { topic, config: channel }) => {
                                let join = channel_message(
                                    &topic,
                                    "phx_join",
                                    channel.to_join_payload(token.as_deref()),
                                    &mut refs,
                                );
                                send_frame(&mut ws_write, &join).await;
                                channels.insert(topic, channel);
                            }
                            None => break Exit::Shutdown,
                        },
                        frame = ws_read.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                match serde_json::from_str::<PhoenixMessage>(&text) {
                                    Ok(msg) => {
                                        if let Some(event) = translate(&msg) {
                                            let _ = event_tx.send(event).await;
                                        }
                                    }
                                    Err(_) => debug!(text = %text, "Unrecognized message from Supabase"),
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("Supabase Realtime closed connection");
                                break Exit::Lost;
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket error");
                                break Exit::Lost;
                            }
                            Some(Ok(_)) => {}
                        },
                    }
                };

                if matches!(exit, Exit::Shutdown) {
                    for topic in channels.keys() {
                        let leave = channel_message(topic, "phx_leave", serde_json::json!({}), &mut refs);
                        send_frame(&mut ws_write, &leave).await;
                    }
                    let _ = ws_write.send(WsMessage::Close(None)).await;
                }

                *connected.write().await = false;
                let _ = event_tx.send(RealtimeEvent::Disconnected).await;

                if matches!(exit, Exit::Shutdown) {
                    break;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to Supabase Realtime");
                let _ = event_tx
                    .send(RealtimeEvent::Error(format!("Connection failed: {e}")))
                    .await;
            }
            Err(_elapsed) => {
                error!("WebSocket connection timed out after 15s");
                let _ = event_tx
                    .send(RealtimeEvent::Error(
                        "Connection timed out after 15s".to_string(),
                    ))
                    .await;
            }
        }

        info!(delay_secs = reconnect_delay.as_secs(), "Reconnecting to Supabase Realtime");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }
    }

    debug!("Realtime connection loop exited");
}
