//! The agent-facing transport leg. One socket to the page-agent hub carries
//! every tab's agent traffic: agents announce themselves per tab, forwarded
//! requests go down, correlated responses come back up.
//!
//! Unlike the driver leg this one backs off exponentially and gives up
//! after a bounded number of consecutive failures.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use tabwire_core::envelope::RequestId;
use tabwire_core::{Error, Result};
use tabwire_transport::{Backoff, BackoffPolicy, Reply};

use crate::bridge::AgentBridge;

const OUTBOUND_QUEUE: usize = 64;

pub struct AgentChannel {
    url: String,
    policy: BackoffPolicy,
    bridge: Arc<AgentBridge>,
}

impl AgentChannel {
    pub fn new(url: &str, policy: BackoffPolicy, bridge: Arc<AgentBridge>) -> Self {
        Self {
            url: url.to_string(),
            policy,
            bridge,
        }
    }

    /// Dial, serve, and re-dial with doubling delays until the attempt
    /// budget runs out or shutdown is signalled. A successful connection
    /// resets the budget.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        if self.url.is_empty() {
            info!("Agent leg disabled (no endpoint configured)");
            return;
        }

        let mut backoff = Backoff::new(self.policy);
        loop {
            let connected = tokio::select! {
                result = connect_async(&self.url) => result,
                _ = shutdown.recv() => break,
            };

            match connected {
                Ok((ws_stream, _)) => {
                    backoff.reset();
                    info!(url = %self.url, "Agent channel open");
                    let finished = self.serve(ws_stream, &mut shutdown).await;
                    self.bridge.detach_all("Agent channel closed").await;
                    if finished {
                        break;
                    }
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "Agent connect failed");
                }
            }

            match backoff.next_delay() {
                Some(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Scheduling agent reconnect");
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.recv() => break,
                    }
                }
                None => {
                    warn!(
                        attempts = self.policy.max_attempts,
                        "Agent leg giving up after repeated failures"
                    );
                    break;
                }
            }
        }

        info!("Agent channel shut down");
    }

    /// Serve one live socket until it closes. Returns true when shutdown
    /// was requested, false when the peer went away.
    async fn serve(
        &self,
        ws_stream: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> bool {
        let (mut sink, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE);

        loop {
            tokio::select! {
                frame = outbound_rx.recv() => {
                    // Senders are agent entries registered on this socket,
                    // so the channel can only close with the connection.
                    if let Some(text) = frame {
                        if let Err(e) = sink.send(WsMessage::Text(text)).await {
                            // Losing a forwarded request has no retry, so
                            // this is louder than a driver-leg drop.
                            error!(error = %e, "Agent write failed, closing leg");
                            return false;
                        }
                    }
                }
                msg = read.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Err(e) = self.handle_frame(&text, &outbound_tx).await {
                            warn!(error = %e, "Ignoring bad agent frame");
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return false,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Agent read failed");
                        return false;
                    }
                },
                _ = shutdown.recv() => return true,
            }
        }
    }

    async fn handle_frame(&self, text: &str, outbound_tx: &mpsc::Sender<String>) -> Result<()> {
        let frame: Value = serde_json::from_str(text)?;
        let kind = frame.get("type").and_then(Value::as_str).unwrap_or("");

        match kind {
            "agentConnected" => {
                let tab_id = require_tab_id(&frame)?;
                self.bridge.attach(tab_id, outbound_tx.clone()).await;
            }
            "agentDisconnected" => {
                let tab_id = require_tab_id(&frame)?;
                self.bridge.detach(tab_id).await;
            }
            "response" | "error" => {
                let id: RequestId = frame
                    .get("id")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()?
                    .unwrap_or_default();
                let reply = if kind == "response" {
                    Reply::Result(frame.get("result").cloned().unwrap_or(Value::Null))
                } else {
                    Reply::Error(
                        frame
                            .get("error")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown agent error")
                            .to_string(),
                    )
                };
                if !self.bridge.resolve_response(&id, reply).await {
                    debug!(id = %id, "Dropping unclaimed agent reply");
                }
            }
            "ack" | "pong" => {}
            other => {
                debug!(kind = other, "Ignoring agent frame of unknown type");
            }
        }
        Ok(())
    }
}

fn require_tab_id(frame: &Value) -> Result<i64> {
    frame
        .get("tabId")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Protocol("Agent announcement missing tabId".to_string()))
}
