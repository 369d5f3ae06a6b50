use crate::error::TransportError;
use crate::protocol::{ClientMessage, RemoteCommand, ServerMessage};
use async_channel::{Receiver, Sender};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Prefixes `ws://` unless the address already names a WebSocket scheme.
pub fn websocket_url(address: &str) -> String {
    if address.starts_with("ws://") || address.starts_with("wss://") {
        address.to_string()
    } else {
        format!("ws://{address}")
    }
}

/// Opens the socket and sends the handshake. Gives up after
/// [`CONNECT_TIMEOUT`].
pub async fn connect(address: &str) -> Result<Socket, TransportError> {
    let url = websocket_url(address);
    let (mut socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(url.as_str()))
        .await
        .map_err(|_| TransportError::Timeout(CONNECT_TIMEOUT))??;

    log::info!("Connected to {}", url);
    send(&mut socket, &ClientMessage::handshake()).await?;
    Ok(socket)
}

async fn send(socket: &mut Socket, message: &ClientMessage) -> Result<(), TransportError> {
    let text = serde_json::to_string(message)?;
    socket.send(Message::Text(text)).await?;
    Ok(())
}

/// Channels linking a running bridge to the study loop.
#[derive(Debug, Clone)]
pub struct BridgeChannels {
    /// Commands received from the peer, drained once per frame.
    pub commands: Receiver<RemoteCommand>,
    /// Study data and events to broadcast.
    pub outbound: Sender<ClientMessage>,
}

/// Connects and pumps messages until either side goes away. Inbound commands
/// go to `commands`; anything sent on `outbound` is written to the socket.
pub async fn run_bridge(
    address: &str,
    commands: Sender<RemoteCommand>,
    outbound: Receiver<ClientMessage>,
) -> Result<(), TransportError> {
    let socket = connect(address).await?;
    pump(socket, commands, outbound).await
}

async fn pump(
    mut socket: Socket,
    commands: Sender<RemoteCommand>,
    outbound: Receiver<ClientMessage>,
) -> Result<(), TransportError> {
    loop {
        tokio::select! {
            incoming = socket.next() => {
                let Some(incoming) = incoming else {
                    log::info!("Bridge disconnected");
                    return Ok(());
                };
                match incoming? {
                    Message::Text(text) => {
                        if let Some(reply) = handle_text(&text, &commands).await? {
                            send(&mut socket, &reply).await?;
                        }
                    }
                    Message::Close(_) => {
                        log::info!("Bridge closed by peer");
                        return Ok(());
                    }
                    _ => {}
                }
            }
            message = outbound.recv() => {
                match message {
                    Ok(message) => send(&mut socket, &message).await?,
                    Err(_) => {
                        let _ = socket.close(None).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Handles one text frame, returning the reply to send, if any.
async fn handle_text(
    text: &str,
    commands: &Sender<RemoteCommand>,
) -> Result<Option<ClientMessage>, TransportError> {
    let message: ServerMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Failed to parse bridge message: {}", e);
            return Ok(None);
        }
    };

    match message {
        ServerMessage::Command { command, data } => {
            match RemoteCommand::parse(&command, data.as_ref()) {
                Some(cmd) => commands
                    .send(cmd)
                    .await
                    .map_err(|_| TransportError::ChannelClosed)?,
                None => log::debug!("Ignoring command {:?}", command),
            }
            Ok(None)
        }
        ServerMessage::Ping => Ok(Some(ClientMessage::pong())),
        ServerMessage::HandshakeAck { status, server } => {
            log::info!("Handshake acknowledged by {} ({})", server, status);
            Ok(None)
        }
        ServerMessage::Unknown => {
            log::debug!("Unknown bridge message type");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Coords, StudyEventKind};
    use tokio::net::TcpListener;

    #[test]
    fn test_websocket_url() {
        assert_eq!(websocket_url("localhost:8765"), "ws://localhost:8765");
        assert_eq!(websocket_url("ws://host:1"), "ws://host:1");
        assert_eq!(websocket_url("wss://host"), "wss://host");
    }

    #[tokio::test]
    async fn test_bridge_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let next_json = |msg: Message| -> serde_json::Value {
                serde_json::from_str(msg.to_text().unwrap()).unwrap()
            };

            let handshake = next_json(ws.next().await.unwrap().unwrap());
            assert_eq!(handshake["type"], "handshake");
            assert_eq!(handshake["client"], "WebFitts");

            ws.send(Message::Text(
                r#"{"type":"command","command":"set_cursor_absolute","data":{"nx":0.5,"ny":0.5}}"#.into(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();

            let pong = next_json(ws.next().await.unwrap().unwrap());
            assert_eq!(pong["type"], "pong");

            let event = next_json(ws.next().await.unwrap().unwrap());
            assert_eq!(event["type"], "study_event");
            assert_eq!(event["event"], "study_start");
            ws.close(None).await.unwrap();
        });

        let (cmd_tx, cmd_rx) = async_channel::unbounded();
        let (out_tx, out_rx) = async_channel::unbounded();
        let bridge = tokio::spawn(async move {
            run_bridge(&addr.to_string(), cmd_tx, out_rx).await
        });

        let cmd = cmd_rx.recv().await.unwrap();
        assert_eq!(cmd, RemoteCommand::SetCursorAbsolute(Coords::Normalized(0.5, 0.5)));

        // sent after the command arrived, so it follows the pong on the wire
        tokio::time::sleep(Duration::from_millis(50)).await;
        out_tx
            .send(ClientMessage::event(StudyEventKind::StudyStart, serde_json::json!({})))
            .await
            .unwrap();

        peer.await.unwrap();
        bridge.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connect(&addr.to_string()).await.unwrap_err();
        assert!(matches!(err, TransportError::WebSocket(_)));
    }
}
