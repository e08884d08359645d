//! Second-hop routing: commands that need a script living in the page are
//! forwarded to a persistent page agent when one has announced itself for
//! the tab, and synthesized through a one-shot script injection otherwise.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use tabwire_browser::{
    first_frame_result, BrowserSurface, FrameResult, PageFunction, ScriptInjection, TabId,
};
use tabwire_core::envelope::{AgentRequest, RequestId};
use tabwire_core::{Error, Result};
use tabwire_transport::{Correlator, Reply};

/// One live page-agent connection. The correlator is per connection so a
/// disconnect rejects exactly this tab's in-flight forwards, and so its id
/// namespace (`agent-<tab>-<n>`) can never collide with the driver leg's.
struct AgentConnection {
    tx: mpsc::Sender<String>,
    correlator: Correlator,
}

pub struct AgentBridge {
    surface: Arc<dyn BrowserSurface>,
    forward_timeout: Duration,
    connections: Mutex<HashMap<TabId, AgentConnection>>,
    /// Style ids installed through `injectCSS`, per tab. Re-injecting under
    /// an existing id replaces the page-side sheet, so the set stays flat.
    styles: Mutex<HashMap<TabId, HashSet<String>>>,
    /// At most one mutation observer per tab; a new one replaces the old.
    observers: Mutex<HashMap<TabId, String>>,
}

impl AgentBridge {
    pub fn new(surface: Arc<dyn BrowserSurface>, forward_timeout: Duration) -> Self {
        Self {
            surface,
            forward_timeout,
            connections: Mutex::new(HashMap::new()),
            styles: Mutex::new(HashMap::new()),
            observers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a page agent that announced itself for `tab_id`. An existing
    /// entry for the tab is closed out first: its waiters are rejected so
    /// nothing dangles on the superseded connection.
    pub async fn attach(&self, tab_id: TabId, tx: mpsc::Sender<String>) {
        let connection = AgentConnection {
            tx,
            correlator: Correlator::new(&format!("agent-{}", tab_id)),
        };
        let previous = self.connections.lock().await.insert(tab_id, connection);
        if let Some(old) = previous {
            old.correlator.fail_all("Agent connection replaced").await;
            warn!(tab_id, "Replaced existing page agent connection");
        } else {
            info!(tab_id, "Page agent connected");
        }
    }

    /// Remove the agent entry for a tab, rejecting any forwards still
    /// waiting on it.
    pub async fn detach(&self, tab_id: TabId) {
        if let Some(old) = self.connections.lock().await.remove(&tab_id) {
            old.correlator.fail_all("Agent disconnected").await;
            info!(tab_id, "Page agent disconnected");
        }
    }

    /// Drop every agent entry, rejecting all pending forwards. Called when
    /// the agent-leg socket itself goes away.
    pub async fn detach_all(&self, reason: &str) {
        let drained: Vec<(TabId, AgentConnection)> =
            self.connections.lock().await.drain().collect();
        for (tab_id, connection) in drained {
            connection.correlator.fail_all(reason).await;
            debug!(tab_id, reason, "Dropped page agent entry");
        }
    }

    pub async fn is_connected(&self, tab_id: TabId) -> bool {
        self.connections.lock().await.contains_key(&tab_id)
    }

    /// Route a response frame from the agent leg to whichever connection is
    /// waiting on its id. Returns false when no waiter claims it (late reply
    /// after timeout or disconnect), which is logged and dropped upstream.
    pub async fn resolve_response(&self, id: &RequestId, reply: Reply) -> bool {
        let connections = self.connections.lock().await;
        for connection in connections.values() {
            if connection.correlator.resolve(id, reply.clone()).await {
                return true;
            }
        }
        false
    }

    /// Execute a page function in `tab_id`: through the persistent agent
    /// connection when one exists, degrading to a one-shot main-frame
    /// injection when none does. Both paths return the same result shape.
    pub async fn forward(&self, tab_id: TabId, func: &PageFunction) -> Result<Value> {
        let routed = {
            let connections = self.connections.lock().await;
            connections
                .get(&tab_id)
                .map(|c| (c.tx.clone(), c.correlator.clone()))
        };

        match routed {
            Some((tx, correlator)) => {
                self.forward_connected(tx, correlator, func.agent_command(), func.agent_params())
                    .await
            }
            None => {
                debug!(tab_id, command = func.agent_command(), "No page agent, injecting one-shot");
                let injection = ScriptInjection::main_frame(tab_id, func.clone());
                let frames = self.surface.execute_script(injection).await?;
                Ok(first_frame_result(frames))
            }
        }
    }

    /// Run a script injection, honoring frame scoping. Main-frame
    /// injections go straight to the surface. Frame-scoped ones need the
    /// tab's page agent, which can address frames the raw surface cannot;
    /// without one the surface decides whether it can honor the scope.
    pub async fn execute_script(&self, injection: ScriptInjection) -> Result<Vec<FrameResult>> {
        if !injection.is_frame_scoped() {
            return self.surface.execute_script(injection).await;
        }
        let routed = {
            let connections = self.connections.lock().await;
            connections
                .get(&injection.tab_id)
                .map(|c| (c.tx.clone(), c.correlator.clone()))
        };
        let Some((tx, correlator)) = routed else {
            return self.surface.execute_script(injection).await;
        };

        let mut params = injection.func.agent_params();
        if let Value::Object(map) = &mut params {
            if let Some(frame_id) = injection.frame_id {
                map.insert("frameId".to_string(), Value::from(frame_id));
            }
            if injection.all_frames {
                map.insert("allFrames".to_string(), Value::Bool(true));
            }
        }
        let value = self
            .forward_connected(tx, correlator, injection.func.agent_command(), params)
            .await?;
        if injection.all_frames {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(vec![FrameResult {
                frame_id: injection.frame_id.unwrap_or(0),
                result: value,
            }])
        }
    }

    async fn forward_connected(
        &self,
        tx: mpsc::Sender<String>,
        correlator: Correlator,
        command: &str,
        params: Value,
    ) -> Result<Value> {
        let id = correlator.next_id();
        let pending = correlator.register(id.clone()).await?;

        let request = AgentRequest {
            id,
            command: command.to_string(),
            params,
        };
        let frame = serde_json::to_string(&request)?;
        if tx.send(frame).await.is_err() {
            pending.abandon().await;
            return Err(Error::Agent("connection lost before send".to_string()));
        }

        match pending.wait(self.forward_timeout).await {
            Ok(Reply::Result(value)) => Ok(value),
            Ok(Reply::Error(message)) => Err(Error::Handler(message)),
            Err(Error::Timeout(_)) => Err(Error::Timeout("waiting for page agent".to_string())),
            Err(e) => Err(e),
        }
    }

    /// Record a style id installed in a tab. Key reuse is an in-place
    /// replacement, never a second tracked resource.
    pub async fn record_style(&self, tab_id: TabId, style_id: &str) {
        self.styles
            .lock()
            .await
            .entry(tab_id)
            .or_default()
            .insert(style_id.to_string());
    }

    /// Forget a style id; true when it was tracked.
    pub async fn remove_style(&self, tab_id: TabId, style_id: &str) -> bool {
        let mut styles = self.styles.lock().await;
        match styles.get_mut(&tab_id) {
            Some(set) => {
                let removed = set.remove(style_id);
                if set.is_empty() {
                    styles.remove(&tab_id);
                }
                removed
            }
            None => false,
        }
    }

    pub async fn styles_for(&self, tab_id: TabId) -> Vec<String> {
        self.styles
            .lock()
            .await
            .get(&tab_id)
            .map(|set| {
                let mut ids: Vec<String> = set.iter().cloned().collect();
                ids.sort();
                ids
            })
            .unwrap_or_default()
    }

    /// Track the tab's mutation observer handle, returning the handle it
    /// replaces so the caller can tear the old one down.
    pub async fn set_observer(&self, tab_id: TabId, handle: &str) -> Option<String> {
        self.observers
            .lock()
            .await
            .insert(tab_id, handle.to_string())
    }

    pub async fn clear_observer(&self, tab_id: TabId) -> Option<String> {
        self.observers.lock().await.remove(&tab_id)
    }
}
