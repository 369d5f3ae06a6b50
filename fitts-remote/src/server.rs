use crate::error::TransportError;
use crate::protocol::{ClientMessage, StudyData};
use async_channel::Sender;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8765";
pub const SERVER_NAME: &str = "WebFitts Rust Listener";

/// Reply sent to every handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "handshake_ack")]
pub struct HandshakeAck {
    pub status: &'static str,
    pub server: &'static str,
}

impl Default for HandshakeAck {
    fn default() -> Self {
        Self {
            status: "connected",
            server: SERVER_NAME,
        }
    }
}

/// Binds `addr` and serves bridge clients until the process stops.
pub async fn listen(addr: &str) -> Result<(), TransportError> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on ws://{}", listener.local_addr()?);
    serve(listener, None).await;
    Ok(())
}

/// Accept loop. Every decoded client message is logged and, when `sink` is
/// given, forwarded to it.
pub async fn serve(listener: TcpListener, sink: Option<Sender<ClientMessage>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let sink = sink.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, peer, sink).await {
                        log::warn!("[{}] connection error: {}", peer, e);
                    }
                    log::info!("[{}] disconnected", peer);
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    sink: Option<Sender<ClientMessage>>,
) -> Result<(), TransportError> {
    let mut ws = tokio_tungstenite::accept_async(stream).await?;
    log::info!("[{}] connected", peer);

    while let Some(frame) = ws.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let message: ClientMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("[{}] unreadable message: {}", peer, e);
                continue;
            }
        };

        match &message {
            ClientMessage::Handshake { client, version, .. } => {
                log::info!("[{}] handshake from {} v{}", peer, client, version);
                let ack = serde_json::to_string(&HandshakeAck::default())?;
                ws.send(Message::Text(ack)).await?;
            }
            ClientMessage::StudyData(data) => log::info!("[{}] {}", peer, describe(data)),
            ClientMessage::StudyEvent { event, data, .. } => {
                log::info!("[{}] event {:?}: {}", peer, event, data)
            }
            ClientMessage::Pong { timestamp } => log::debug!("[{}] pong {}", peer, timestamp),
            ClientMessage::Unknown => log::debug!("[{}] unknown message type", peer),
        }

        if let Some(sink) = &sink {
            sink.send(message)
                .await
                .map_err(|_| TransportError::ChannelClosed)?;
        }
    }
    Ok(())
}

/// One-line summary of a telemetry sample.
pub fn describe(data: &StudyData) -> String {
    format!(
        "cursor ({:.0}, {:.0}) | target ({:.0}, {:.0}) | A/W {}/{} | dist {:.1} | move ({:.2}, {:.2}) | req ({:.2}, {:.2}) | canvas {}x{}",
        data.cursor.x,
        data.cursor.y,
        data.target.x,
        data.target.y,
        data.task.amplitude,
        data.task.width,
        data.required.distance,
        data.movement.normalized.x,
        data.movement.normalized.y,
        data.required.normalized.x,
        data.required.normalized.y,
        data.canvas.width,
        data.canvas.height,
    )
}
