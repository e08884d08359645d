//! CDP-backed implementation of the Browser Control Surface.
//!
//! Discovers page targets over the browser's HTTP debugging endpoint
//! (`/json/list`) and keeps one lazily-connected [`CdpClient`] per tab.
//! Numeric tab ids are assigned here and stay stable for the life of the
//! target; the driver never sees CDP target ids.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use tabwire_core::{Error, Result};

use crate::cdp::CdpClient;
use crate::surface::BrowserSurface;
use crate::types::{
    CaptureOptions, CookieDetails, CookieFilter, CreateTabParams, FrameInfo, FrameResult,
    ScriptInjection, TabId, TabInfo,
};

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

struct TargetEntry {
    target_id: String,
    ws_url: String,
    client: Option<Arc<CdpClient>>,
}

#[derive(Default)]
struct SurfaceState {
    tabs: HashMap<TabId, TargetEntry>,
    by_target: HashMap<String, TabId>,
    next_tab_id: TabId,
}

pub struct CdpSurface {
    endpoint: String,
    http: reqwest::Client,
    state: Mutex<SurfaceState>,
}

impl CdpSurface {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            endpoint: format!("http://{}:{}", host, port),
            http: reqwest::Client::new(),
            state: Mutex::new(SurfaceState {
                next_tab_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Re-list page targets, assigning tab ids to new ones and dropping
    /// entries whose target disappeared. Returns targets in listing order.
    async fn refresh(&self) -> Result<Vec<(TabId, Value)>> {
        let url = format!("{}/json/list", self.endpoint);
        let targets: Vec<Value> = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Browser(format!("CDP endpoint unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::Browser(format!("Bad CDP target list: {}", e)))?;

        let mut state = self.state.lock().await;
        let mut seen: Vec<(TabId, Value)> = Vec::new();
        let mut live = std::collections::HashSet::new();

        for target in targets {
            if target.get("type").and_then(|v| v.as_str()) != Some("page") {
                continue;
            }
            let target_id = match target.get("id").and_then(|v| v.as_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };
            live.insert(target_id.clone());
            let tab_id = match state.by_target.get(&target_id) {
                Some(id) => *id,
                None => {
                    let id = state.next_tab_id;
                    state.next_tab_id += 1;
                    let ws_url = target
                        .get("webSocketDebuggerUrl")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    state.by_target.insert(target_id.clone(), id);
                    state.tabs.insert(
                        id,
                        TargetEntry {
                            target_id,
                            ws_url,
                            client: None,
                        },
                    );
                    debug!(tab_id = id, "Discovered new page target");
                    id
                }
            };
            seen.push((tab_id, target));
        }

        let gone: Vec<TabId> = state
            .tabs
            .iter()
            .filter(|(_, e)| !live.contains(&e.target_id))
            .map(|(id, _)| *id)
            .collect();
        for id in gone {
            if let Some(entry) = state.tabs.remove(&id) {
                state.by_target.remove(&entry.target_id);
                debug!(tab_id = id, "Page target gone");
            }
        }

        Ok(seen)
    }

    async fn client_for(&self, tab_id: TabId) -> Result<Arc<CdpClient>> {
        self.refresh().await?;
        let ws_url = {
            let state = self.state.lock().await;
            let entry = state
                .tabs
                .get(&tab_id)
                .ok_or_else(|| Error::NotFound(format!("No tab with id {}", tab_id)))?;
            if let Some(client) = &entry.client {
                return Ok(client.clone());
            }
            entry.ws_url.clone()
        };

        let client = Arc::new(CdpClient::connect(&ws_url).await?);
        let mut state = self.state.lock().await;
        if let Some(entry) = state.tabs.get_mut(&tab_id) {
            entry.client = Some(client.clone());
        }
        Ok(client)
    }

    async fn target_id_for(&self, tab_id: TabId) -> Result<String> {
        self.refresh().await?;
        let state = self.state.lock().await;
        state
            .tabs
            .get(&tab_id)
            .map(|e| e.target_id.clone())
            .ok_or_else(|| Error::NotFound(format!("No tab with id {}", tab_id)))
    }

    fn tab_info(tab_id: TabId, index: i64, target: &Value) -> TabInfo {
        TabInfo {
            id: tab_id,
            url: target
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            title: target
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            // /json/list orders by recency; the front target is focused.
            active: index == 0,
            window_id: 1,
            index,
            pinned: false,
            audible: false,
            muted_info: Value::Null,
            status: "complete".to_string(),
        }
    }
}

#[async_trait]
impl BrowserSurface for CdpSurface {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        let targets = self.refresh().await?;
        Ok(targets
            .iter()
            .enumerate()
            .map(|(i, (id, t))| Self::tab_info(*id, i as i64, t))
            .collect())
    }

    async fn create_tab(&self, params: CreateTabParams) -> Result<TabInfo> {
        let url = params.url.clone().unwrap_or_else(|| "about:blank".to_string());
        let endpoint = format!("{}/json/new?{}", self.endpoint, url);
        let target: Value = self
            .http
            .put(&endpoint)
            .send()
            .await
            .map_err(|e| Error::Browser(format!("Failed to create tab: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::Browser(format!("Bad create-tab reply: {}", e)))?;

        let target_id = target
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Browser("Create-tab reply had no target id".to_string()))?
            .to_string();

        let tab_id = {
            let mut state = self.state.lock().await;
            let id = state.next_tab_id;
            state.next_tab_id += 1;
            let ws_url = target
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            state.by_target.insert(target_id.clone(), id);
            state.tabs.insert(
                id,
                TargetEntry {
                    target_id: target_id.clone(),
                    ws_url,
                    client: None,
                },
            );
            id
        };

        if params.is_active() {
            let activate = format!("{}/json/activate/{}", self.endpoint, target_id);
            let _ = self.http.get(&activate).send().await;
        }

        info!(tab_id, url = %url, "Created tab");
        Ok(Self::tab_info(tab_id, 0, &target))
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        let target_id = self.target_id_for(tab_id).await?;
        let url = format!("{}/json/close/{}", self.endpoint, target_id);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Browser(format!("Failed to close tab {}: {}", tab_id, e)))?;
        let mut state = self.state.lock().await;
        if let Some(entry) = state.tabs.remove(&tab_id) {
            state.by_target.remove(&entry.target_id);
        }
        Ok(())
    }

    async fn activate_tab(&self, tab_id: TabId) -> Result<()> {
        let target_id = self.target_id_for(tab_id).await?;
        let url = format!("{}/json/activate/{}", self.endpoint, target_id);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Browser(format!("Failed to activate tab {}: {}", tab_id, e)))?;
        Ok(())
    }

    async fn reload_tab(&self, tab_id: TabId, bypass_cache: bool) -> Result<()> {
        self.client_for(tab_id).await?.reload(bypass_cache).await
    }

    async fn set_tab_url(&self, tab_id: TabId, url: &str) -> Result<()> {
        self.client_for(tab_id).await?.navigate(url).await?;
        Ok(())
    }

    async fn wait_for_load(&self, tab_id: TabId) -> Result<()> {
        let client = self.client_for(tab_id).await?;
        let start = std::time::Instant::now();
        while start.elapsed() < LOAD_TIMEOUT {
            // Mid-navigation evaluation errors count as "not loaded yet".
            if let Ok(Value::Bool(true)) =
                client.evaluate("document.readyState === 'complete'").await
            {
                return Ok(());
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
        Err(Error::Timeout(format!(
            "Tab {} did not finish loading within {}s",
            tab_id,
            LOAD_TIMEOUT.as_secs()
        )))
    }

    async fn go_back(&self, tab_id: TabId) -> Result<()> {
        self.client_for(tab_id).await?.history_step(-1).await
    }

    async fn go_forward(&self, tab_id: TabId) -> Result<()> {
        self.client_for(tab_id).await?.history_step(1).await
    }

    async fn execute_script(&self, injection: ScriptInjection) -> Result<Vec<FrameResult>> {
        if injection.is_frame_scoped() {
            return Err(Error::Browser(
                "Frame-scoped injection requires a page agent connection".to_string(),
            ));
        }
        let client = self.client_for(injection.tab_id).await?;
        let result = client.evaluate(&injection.func.source()).await?;
        Ok(vec![FrameResult {
            frame_id: 0,
            result,
        }])
    }

    async fn capture_visible_tab(&self, opts: CaptureOptions) -> Result<String> {
        // window_id is advisory here: CDP screenshots the focused target.
        let targets = self.refresh().await?;
        let (tab_id, _) = targets
            .first()
            .ok_or_else(|| Error::Browser("No page targets open".to_string()))?;
        let client = self.client_for(*tab_id).await?;
        let data = client.capture_screenshot(&opts.format, opts.quality).await?;
        Ok(format!("data:image/{};base64,{}", opts.format, data))
    }

    async fn get_cookies(&self, filter: CookieFilter) -> Result<Value> {
        let targets = self.refresh().await?;
        let (tab_id, _) = targets
            .first()
            .ok_or_else(|| Error::Browser("No page targets open".to_string()))?;
        let client = self.client_for(*tab_id).await?;
        let urls = filter.url.clone().map(|u| vec![u]);
        let reply = client.get_cookies(urls).await?;
        let cookies = reply
            .get("cookies")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let filtered: Vec<Value> = cookies
            .into_iter()
            .filter(|c| {
                filter.domain.as_deref().map_or(true, |d| {
                    c.get("domain").and_then(|v| v.as_str()).map_or(false, |cd| {
                        cd.trim_start_matches('.').ends_with(d.trim_start_matches('.'))
                    })
                }) && filter
                    .name
                    .as_deref()
                    .map_or(true, |n| c.get("name").and_then(|v| v.as_str()) == Some(n))
            })
            .collect();
        Ok(Value::Array(filtered))
    }

    async fn set_cookie(&self, details: CookieDetails) -> Result<Value> {
        let targets = self.refresh().await?;
        let (tab_id, _) = targets
            .first()
            .ok_or_else(|| Error::Browser("No page targets open".to_string()))?;
        let client = self.client_for(*tab_id).await?;

        let mut params = json!({
            "name": details.name,
            "value": details.value,
            "path": details.path,
        });
        if let Some(url) = &details.url {
            params["url"] = json!(url);
        }
        if let Some(domain) = &details.domain {
            params["domain"] = json!(domain);
        }
        if let Some(secure) = details.secure {
            params["secure"] = json!(secure);
        }
        if let Some(http_only) = details.http_only {
            params["httpOnly"] = json!(http_only);
        }
        if let Some(expires) = details.expiration_date {
            params["expires"] = json!(expires);
        }
        client.set_cookie(params.clone()).await?;
        Ok(params)
    }

    async fn delete_cookie(&self, url: &str, name: &str) -> Result<()> {
        let targets = self.refresh().await?;
        let (tab_id, _) = targets
            .first()
            .ok_or_else(|| Error::Browser("No page targets open".to_string()))?;
        self.client_for(*tab_id).await?.delete_cookie(url, name).await
    }

    async fn get_frames(&self, tab_id: TabId) -> Result<Vec<FrameInfo>> {
        let client = self.client_for(tab_id).await?;
        let tree = client.frame_tree().await?;
        let mut frames = Vec::new();
        if let Some(root) = tree.get("frameTree") {
            flatten_frames(root, None, &mut frames);
        }
        Ok(frames)
    }
}

/// Flatten the CDP frame tree into webNavigation-style records: the main
/// frame is 0, children are numbered in traversal order.
fn flatten_frames(node: &Value, parent: Option<i64>, out: &mut Vec<FrameInfo>) {
    let frame_id = out.len() as i64;
    let url = node
        .get("frame")
        .and_then(|f| f.get("url"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    out.push(FrameInfo {
        frame_id,
        parent_frame_id: parent,
        url,
    });
    if let Some(children) = node.get("childFrames").and_then(|v| v.as_array()) {
        for child in children {
            flatten_frames(child, Some(frame_id), out);
        }
    }
}
