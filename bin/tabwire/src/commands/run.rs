use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use tabwire_agent::{AgentBridge, AgentChannel};
use tabwire_browser::{BrowserSurface, CdpSurface};
use tabwire_core::{Config, Paths};
use tabwire_dispatch::{Dispatcher, HandlerRegistry};
use tabwire_transport::{BackoffPolicy, DriverChannel};

const INBOUND_QUEUE: usize = 256;

/// Bring up the whole bridge: the CDP-backed browser surface, the agent
/// leg, the command dispatcher, and the driver leg. Runs until Ctrl-C.
pub async fn run(driver_url: Option<String>, cdp_port: Option<u16>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    if let Some(url) = driver_url {
        config.driver.url = url;
    }
    if let Some(port) = cdp_port {
        config.browser.cdp_port = port;
    }

    let surface: Arc<dyn BrowserSurface> = Arc::new(CdpSurface::new(
        &config.browser.cdp_host,
        config.browser.cdp_port,
    ));
    let bridge = Arc::new(AgentBridge::new(
        surface.clone(),
        Duration::from_millis(config.agent.forward_timeout_ms),
    ));

    let registry = Arc::new(HandlerRegistry::with_defaults());
    let dispatcher = Dispatcher::new(
        registry.clone(),
        tabwire_dispatch::HandlerContext {
            surface,
            bridge: bridge.clone(),
            wait: config.wait.clone(),
        },
    );
    info!(commands = registry.names().len(), "Handler registry ready");

    let (shutdown_tx, _) = broadcast::channel(1);
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

    let channel = Arc::new(DriverChannel::new(
        &config.driver.url,
        Duration::from_millis(config.driver.reconnect_delay_ms),
    ));
    let sender = channel.sender();

    let driver_task = {
        let channel = channel.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { channel.run(inbound_tx, shutdown).await })
    };

    let dispatch_task = {
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { dispatcher.serve(inbound_rx, sender, shutdown).await })
    };

    let agent_task = if config.agent.url.is_empty() {
        info!("Agent leg disabled by configuration");
        None
    } else {
        let agent = AgentChannel::new(
            &config.agent.url,
            BackoffPolicy {
                initial: Duration::from_millis(config.agent.initial_backoff_ms),
                max_attempts: config.agent.max_attempts,
            },
            bridge.clone(),
        );
        let shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move { agent.run(shutdown).await }))
    };

    info!(driver = %config.driver.url, "Bridge running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());
    bridge.detach_all("Bridge shutting down").await;

    driver_task.await?;
    dispatch_task.await?;
    if let Some(task) = agent_task {
        if let Err(e) = task.await {
            warn!(error = %e, "Agent leg task failed during shutdown");
        }
    }

    Ok(())
}
