//! WebSocket connector backed by `tokio-tungstenite`.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{Connector, Link, TransportEvent};
use crate::error::BridgeError;

/// Opens `ws://` / `wss://` connections.
///
/// Each open connection is served by a pump task that moves frames between
/// the socket and the [`Link`] channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    async fn open(&self, address: &str) -> Result<Link, BridgeError> {
        tracing::debug!(address, "opening websocket");
        let (ws_stream, _) = connect_async(address)
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = ws_rx.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if event_tx.send(TransportEvent::Message(text.to_string())).is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                                Ok(text) => {
                                    if event_tx.send(TransportEvent::Message(text)).is_err() {
                                        break;
                                    }
                                }
                                Err(_) => tracing::debug!(len = data.len(), "ignoring non-utf8 binary frame"),
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = event_tx.send(TransportEvent::Closed);
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                                let _ = event_tx.send(TransportEvent::Closed);
                                break;
                            }
                        }
                    }
                    frame = out_rx.recv() => {
                        match frame {
                            Some(text) => {
                                if let Err(e) = ws_tx.send(Message::text(text)).await {
                                    let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                                    let _ = event_tx.send(TransportEvent::Closed);
                                    break;
                                }
                            }
                            // The owner dropped the link.
                            None => {
                                let _ = ws_tx.close().await;
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!("websocket pump stopped");
        });

        Ok(Link {
            outgoing: out_tx,
            incoming: event_rx,
        })
    }
}
