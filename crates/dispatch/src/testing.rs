//! Test doubles shared by the dispatcher and handler tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use tabwire_agent::AgentBridge;
use tabwire_browser::{
    BrowserSurface, CaptureOptions, CookieDetails, CookieFilter, CreateTabParams, FrameInfo,
    FrameResult, ScriptInjection, TabId, TabInfo,
};
use tabwire_core::config::WaitConfig;
use tabwire_core::{Error, Result};

use crate::HandlerContext;

pub fn tab(id: TabId, url: &str, active: bool) -> TabInfo {
    TabInfo {
        id,
        url: url.to_string(),
        title: format!("Tab {}", id),
        active,
        window_id: 1,
        index: 0,
        pinned: false,
        audible: false,
        muted_info: json!({"muted": false}),
        status: "complete".to_string(),
    }
}

/// Surface double: canned tab list, scripted per-call injection replies
/// (falling back to a default), every injection recorded for assertions.
pub struct StubSurface {
    pub tabs: Mutex<Vec<TabInfo>>,
    pub script_replies: Mutex<VecDeque<Result<Value>>>,
    pub default_reply: Value,
    pub injections: Mutex<Vec<ScriptInjection>>,
    pub frames: Vec<FrameInfo>,
    pub cookies: Value,
}

impl StubSurface {
    pub fn new() -> Self {
        Self {
            tabs: Mutex::new(vec![tab(1, "https://example.com", true)]),
            script_replies: Mutex::new(VecDeque::new()),
            default_reply: Value::Null,
            injections: Mutex::new(Vec::new()),
            frames: Vec::new(),
            cookies: json!([]),
        }
    }

    pub fn replying(default: Value) -> Self {
        Self {
            default_reply: default,
            ..Self::new()
        }
    }

    pub async fn script(&self, reply: Result<Value>) {
        self.script_replies.lock().await.push_back(reply);
    }
}

#[async_trait]
impl BrowserSurface for StubSurface {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        Ok(self.tabs.lock().await.clone())
    }
    async fn create_tab(&self, params: CreateTabParams) -> Result<TabInfo> {
        let mut created = tab(100, params.url.as_deref().unwrap_or("about:blank"), params.is_active());
        created.title = String::new();
        Ok(created)
    }
    async fn close_tab(&self, tab_id: TabId) -> Result<()> {
        let mut tabs = self.tabs.lock().await;
        match tabs.iter().position(|t| t.id == tab_id) {
            Some(i) => {
                tabs.remove(i);
                Ok(())
            }
            None => Err(Error::NotFound(format!("tab {}", tab_id))),
        }
    }
    async fn activate_tab(&self, _tab_id: TabId) -> Result<()> {
        Ok(())
    }
    async fn reload_tab(&self, _tab_id: TabId, _bypass_cache: bool) -> Result<()> {
        Ok(())
    }
    async fn set_tab_url(&self, tab_id: TabId, url: &str) -> Result<()> {
        let mut tabs = self.tabs.lock().await;
        match tabs.iter_mut().find(|t| t.id == tab_id) {
            Some(t) => {
                t.url = url.to_string();
                Ok(())
            }
            None => Err(Error::NotFound(format!("tab {}", tab_id))),
        }
    }
    async fn wait_for_load(&self, _tab_id: TabId) -> Result<()> {
        Ok(())
    }
    async fn go_back(&self, _tab_id: TabId) -> Result<()> {
        Ok(())
    }
    async fn go_forward(&self, _tab_id: TabId) -> Result<()> {
        Ok(())
    }
    async fn execute_script(&self, injection: ScriptInjection) -> Result<Vec<FrameResult>> {
        self.injections.lock().await.push(injection);
        let reply = self
            .script_replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Ok(self.default_reply.clone()))?;
        Ok(vec![FrameResult {
            frame_id: 0,
            result: reply,
        }])
    }
    async fn capture_visible_tab(&self, opts: CaptureOptions) -> Result<String> {
        Ok(format!("data:image/{};base64,c3R1Yg==", opts.format))
    }
    async fn get_cookies(&self, _filter: CookieFilter) -> Result<Value> {
        Ok(self.cookies.clone())
    }
    async fn set_cookie(&self, details: CookieDetails) -> Result<Value> {
        Ok(json!({"name": details.name, "value": details.value, "path": details.path}))
    }
    async fn delete_cookie(&self, _url: &str, _name: &str) -> Result<()> {
        Ok(())
    }
    async fn get_frames(&self, _tab_id: TabId) -> Result<Vec<FrameInfo>> {
        Ok(self.frames.clone())
    }
}

/// A handler context over a given stub, with fast wait settings so tests
/// never sit in real ten-second polls. Takes an `Arc` so the caller can
/// keep a handle for post-hoc assertions.
pub fn context(surface: Arc<StubSurface>) -> HandlerContext {
    let surface: Arc<dyn BrowserSurface> = surface;
    let bridge = Arc::new(AgentBridge::new(
        surface.clone(),
        std::time::Duration::from_millis(500),
    ));
    HandlerContext {
        surface,
        bridge,
        wait: WaitConfig {
            default_timeout_ms: 300,
            poll_interval_ms: 10,
        },
    }
}
