use async_channel::{Receiver, Sender, TrySendError};
use fitts_export::UploadPayload;
use fitts_remote::{BridgeChannels, ClientMessage, RemoteCommand};
use std::thread::{self, JoinHandle};
use tokio::runtime::Runtime;
use tokio::task::JoinSet;

const COMMAND_QUEUE: usize = 256;
const OUTBOUND_QUEUE: usize = 1024;

/// Work the study loop hands to the background runtime.
#[derive(Debug)]
pub enum ServiceRequest {
    Upload { server: String, payload: UploadPayload },
}

/// Handle to the tokio thread that runs the remote bridge and uploads.
pub struct Services {
    bridge: Option<BridgeChannels>,
    requests: Sender<ServiceRequest>,
    thread: Option<JoinHandle<()>>,
}

impl Services {
    /// Commands received since the last call.
    pub fn drain_commands(&self) -> Vec<RemoteCommand> {
        let Some(bridge) = &self.bridge else {
            return Vec::new();
        };
        std::iter::from_fn(|| bridge.commands.try_recv().ok()).collect()
    }

    pub fn bridge_connected(&self) -> bool {
        self.bridge
            .as_ref()
            .is_some_and(|b| !b.outbound.is_closed())
    }

    /// Queues a message for the bridge peer. Dropped when no peer is
    /// connected or the queue is full.
    pub fn broadcast(&self, message: ClientMessage) {
        let Some(bridge) = &self.bridge else {
            return;
        };
        match bridge.outbound.try_send(message) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => log::debug!("Bridge queue full, dropping message"),
        }
    }

    pub fn request(&self, request: ServiceRequest) {
        if self.requests.try_send(request).is_err() {
            log::error!("Background services are not running");
        }
    }

    /// Closes the request queue and waits for in-flight uploads.
    pub fn shutdown(mut self) {
        self.requests.close();
        self.bridge = None;
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Background services panicked");
            }
        }
    }
}

/// Spawns the runtime thread. When `remote` is set the bridge connects to
/// it; connection failures are logged and the study runs without it.
pub fn start_background_services(remote: Option<String>) -> Services {
    let (requests, request_rx) = async_channel::unbounded();

    let (bridge, bridge_ends) = match remote {
        Some(address) => {
            let (cmd_tx, cmd_rx) = async_channel::bounded(COMMAND_QUEUE);
            let (out_tx, out_rx) = async_channel::bounded(OUTBOUND_QUEUE);
            let channels = BridgeChannels {
                commands: cmd_rx,
                outbound: out_tx,
            };
            (Some(channels), Some((address, cmd_tx, out_rx)))
        }
        None => (None, None),
    };

    let thread = thread::spawn(move || {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to create Tokio runtime: {}", e);
                return;
            }
        };

        rt.block_on(async move {
            if let Some((address, commands, outbound)) = bridge_ends {
                tokio::spawn(async move {
                    if let Err(e) = fitts_remote::run_bridge(&address, commands, outbound.clone()).await {
                        log::warn!("Remote bridge at {} unavailable: {}", address, e);
                    }
                    outbound.close();
                });
            }

            serve_requests(request_rx).await;
        });
    });

    Services {
        bridge,
        requests,
        thread: Some(thread),
    }
}

async fn serve_requests(requests: Receiver<ServiceRequest>) {
    let client = reqwest::Client::new();
    let mut inflight = JoinSet::new();

    while let Ok(request) = requests.recv().await {
        match request {
            ServiceRequest::Upload { server, payload } => {
                let client = client.clone();
                inflight.spawn(async move {
                    if let Err(e) = fitts_export::upload(&client, &server, &payload).await {
                        log::error!("Upload of {} failed: {}", payload.filename, e);
                    }
                });
            }
        }
    }

    while inflight.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitts_remote::StudyEventKind;

    #[test]
    fn test_without_bridge() {
        let services = start_background_services(None);
        assert!(!services.bridge_connected());
        assert!(services.drain_commands().is_empty());
        services.broadcast(ClientMessage::event(StudyEventKind::StudyStart, serde_json::json!({})));
        services.shutdown();
    }

    #[test]
    fn test_unreachable_bridge_closes_outbound() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let services = start_background_services(Some(addr.to_string()));
        for _ in 0..100 {
            if !services.bridge_connected() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!services.bridge_connected());
        services.shutdown();
    }
}
