//! Inbound frame handling: parse, route, execute, answer. Every failure
//! mode becomes an error frame; nothing here panics the loop or drops a
//! request silently.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tabwire_core::envelope::{InboundFrame, OutboundFrame, RequestId};
use tabwire_transport::ChannelSender;

use crate::{HandlerContext, HandlerRegistry};

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, ctx: HandlerContext) -> Self {
        Self { registry, ctx }
    }

    /// Handle one raw frame. `None` means no response goes out (control
    /// notifications); otherwise the returned frame carries the request's
    /// id, or a null id when the frame was too malformed to have one.
    pub async fn dispatch_raw(&self, text: &str) -> Option<OutboundFrame> {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Discarding malformed frame");
                return Some(OutboundFrame::error(
                    RequestId::Null,
                    format!("Invalid message: {}", e),
                ));
            }
        };

        if let Some(kind) = frame.kind.as_deref() {
            match kind {
                "ack" | "pong" => {
                    debug!(kind, "Acknowledged control frame");
                    return None;
                }
                "connected" => return None,
                _ => {}
            }
        }

        let command = match &frame.command {
            Some(command) => command.clone(),
            None => {
                return Some(OutboundFrame::error(frame.id, "Command not specified"));
            }
        };

        let handler = match self.registry.get(&command) {
            Some(handler) => Arc::clone(handler),
            None => {
                return Some(OutboundFrame::error(
                    frame.id,
                    format!("Unknown command: {}", command),
                ));
            }
        };

        if let Err(e) = handler.validate(&frame.params) {
            return Some(OutboundFrame::error(frame.id, e.wire_message()));
        }

        debug!(command = %command, id = %frame.id, "Dispatching");
        match handler.execute(self.ctx.clone(), frame.params).await {
            Ok(result) => Some(OutboundFrame::response(frame.id, result)),
            Err(e) => {
                warn!(command = %command, id = %frame.id, error = %e, "Handler failed");
                Some(OutboundFrame::error(frame.id, e.wire_message()))
            }
        }
    }

    /// Drain the driver channel, dispatching each request on its own task
    /// so in-flight commands interleave freely.
    pub async fn serve(
        &self,
        mut inbound_rx: mpsc::Receiver<String>,
        sender: ChannelSender,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                inbound = inbound_rx.recv() => match inbound {
                    Some(text) => {
                        let dispatcher = self.clone();
                        let sender = sender.clone();
                        tokio::spawn(async move {
                            if let Some(frame) = dispatcher.dispatch_raw(&text).await {
                                sender.send_frame(&frame).await;
                            }
                        });
                    }
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        info!("Dispatch loop stopped");
    }
}
