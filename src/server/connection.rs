//! Per-connection task
//!
//! Bridges one websocket to the relay hub: inbound frames become
//! [`RelayEvent`](crate::relay::RelayEvent)s in arrival order, and the
//! connection's outbound queue is drained onto the socket.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::protocol::{ClientMessage, ConnectionId};
use crate::registry::Outbound;
use crate::relay::RelayHandle;

/// One accepted websocket peer
pub struct Connection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    relay: RelayHandle,
}

impl Connection {
    pub fn new(id: ConnectionId, peer_addr: SocketAddr, relay: RelayHandle) -> Self {
        Self {
            id,
            peer_addr,
            relay,
        }
    }

    /// Run until either side closes
    ///
    /// The relay always sees a disconnect for this id once it has seen the
    /// connect, whatever the reason the loop ended.
    pub async fn run(self, ws: WebSocketStream<TcpStream>) -> Result<()> {
        let outbound = self.relay.connect(self.id).await?;
        let result = self.pump(ws, outbound).await;
        self.relay.disconnect(self.id).await?;
        result
    }

    async fn pump(
        &self,
        ws: WebSocketStream<TcpStream>,
        mut outbound: mpsc::Receiver<Outbound>,
    ) -> Result<()> {
        let (mut ws_sender, mut ws_receiver) = ws.split();

        loop {
            tokio::select! {
                incoming = ws_receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Binary(frame))) => {
                            self.relay.frame(self.id, frame).await?;
                        }
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(text.as_str()).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::debug!(connection_id = %self.id, peer = %self.peer_addr, "Peer closed");
                            break;
                        }
                        // Pings are answered by tungstenite on the next flush
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::debug!(connection_id = %self.id, error = %e, "Read failed");
                            return Err(e.into());
                        }
                    }
                }

                delivery = outbound.recv() => {
                    let Some(delivery) = delivery else {
                        break;
                    };
                    let message = match delivery {
                        Outbound::Frame(frame) => Message::Binary(frame),
                        Outbound::Message(message) => Message::Text(message.to_json()?.into()),
                    };
                    ws_sender.send(message).await?;
                }
            }
        }

        let _ = ws_sender.close().await;
        Ok(())
    }

    async fn handle_text(&self, text: &str) -> Result<()> {
        match ClientMessage::from_json(text) {
            Ok(message) => {
                tracing::debug!(connection_id = %self.id, message = ?message, "Control message");
                self.relay.message(self.id, message).await
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.id,
                    peer = %self.peer_addr,
                    error = %e,
                    "Ignoring malformed control message"
                );
                Ok(())
            }
        }
    }
}
