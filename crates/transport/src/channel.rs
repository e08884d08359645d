//! The driver-facing transport leg: one logical duplex WebSocket that
//! reconnects itself on a fixed timer for as long as the process lives.
//!
//! Send policy is best-effort: frames offered while the channel is not
//! `Open` are dropped, and frames still queued when a connection dies are
//! discarded before the next connection serves traffic. A new connection
//! never retroactively answers requests from an old one.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use tabwire_core::{Error, OutboundFrame, Result};

const OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Cloneable handle for pushing frames out of the channel.
#[derive(Clone)]
pub struct ChannelSender {
    state: Arc<Mutex<ChannelState>>,
    tx: mpsc::Sender<String>,
}

impl ChannelSender {
    /// Send a frame if the channel is open; otherwise the frame is dropped
    /// silently (the driver leg's deliberate best-effort policy).
    pub async fn send(&self, frame: String) {
        let state = *self.state.lock().await;
        if state != ChannelState::Open {
            debug!(?state, "Dropping outbound frame, channel not open");
            return;
        }
        if self.tx.send(frame).await.is_err() {
            debug!("Dropping outbound frame, channel loop gone");
        }
    }

    pub async fn send_frame(&self, frame: &OutboundFrame) {
        self.send(frame.to_json()).await;
    }
}

pub struct DriverChannel {
    url: String,
    reconnect_delay: Duration,
    state: Arc<Mutex<ChannelState>>,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Mutex<Option<mpsc::Receiver<String>>>,
}

impl DriverChannel {
    pub fn new(url: &str, reconnect_delay: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        Self {
            url: url.to_string(),
            reconnect_delay,
            state: Arc::new(Mutex::new(ChannelState::Closed)),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    pub fn sender(&self) -> ChannelSender {
        ChannelSender {
            state: self.state.clone(),
            tx: self.outbound_tx.clone(),
        }
    }

    pub async fn state(&self) -> ChannelState {
        *self.state.lock().await
    }

    /// Drive the connect/serve/reconnect loop until shutdown. Inbound text
    /// frames are forwarded to `inbound_tx`; responses come back through
    /// [`sender`](Self::sender).
    pub async fn run(
        &self,
        inbound_tx: mpsc::Sender<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut outbound_rx = match self.outbound_rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                warn!("Driver channel run() called twice, ignoring");
                return;
            }
        };

        loop {
            tokio::select! {
                result = self.connect_and_serve(&inbound_tx, &mut outbound_rx) => {
                    *self.state.lock().await = ChannelState::Closed;
                    match result {
                        Ok(()) => info!("Driver connection closed"),
                        Err(e) => warn!(error = %e, "Driver connection failed"),
                    }
                    debug!(delay_ms = self.reconnect_delay.as_millis() as u64, "Scheduling driver reconnect");
                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                        _ = shutdown.recv() => break,
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        *self.state.lock().await = ChannelState::Closed;
        info!("Driver channel shut down");
    }

    async fn connect_and_serve(
        &self,
        inbound_tx: &mpsc::Sender<String>,
        outbound_rx: &mut mpsc::Receiver<String>,
    ) -> Result<()> {
        *self.state.lock().await = ChannelState::Connecting;

        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| Error::Transport(format!("WebSocket connect failed: {}", e)))?;

        // Anything queued while we were down belongs to a dead connection.
        while outbound_rx.try_recv().is_ok() {}

        let (mut sink, mut read) = ws_stream.split();

        sink.send(WsMessage::Text(OutboundFrame::connected().to_json()))
            .await
            .map_err(|e| Error::Transport(format!("Failed to announce connection: {}", e)))?;

        *self.state.lock().await = ChannelState::Open;
        info!(url = %self.url, "Driver channel open");

        loop {
            tokio::select! {
                frame = outbound_rx.recv() => match frame {
                    Some(text) => {
                        sink.send(WsMessage::Text(text)).await.map_err(|e| {
                            Error::Transport(format!("WebSocket write failed: {}", e))
                        })?;
                    }
                    None => return Ok(()),
                },
                msg = read.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if inbound_tx.send(text).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(Error::Transport(format!("WebSocket read failed: {}", e)));
                    }
                },
            }
        }
    }
}
