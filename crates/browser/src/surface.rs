//! The Browser Control Surface: every operation the command dispatcher is
//! allowed to ask of the hosting browser. The engine behind it (CDP, an
//! extension platform, a test double) is somebody else's problem.

use async_trait::async_trait;
use serde_json::Value;

use tabwire_core::Result;

use crate::types::{
    CaptureOptions, CookieDetails, CookieFilter, CreateTabParams, FrameInfo, FrameResult,
    ScriptInjection, TabId, TabInfo,
};

#[async_trait]
pub trait BrowserSurface: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>>;

    async fn create_tab(&self, params: CreateTabParams) -> Result<TabInfo>;

    async fn close_tab(&self, tab_id: TabId) -> Result<()>;

    async fn activate_tab(&self, tab_id: TabId) -> Result<()>;

    async fn reload_tab(&self, tab_id: TabId, bypass_cache: bool) -> Result<()>;

    /// Point the tab at a new URL. Does not wait for the load; `tabs.navigate`
    /// pairs this with [`wait_for_load`](Self::wait_for_load).
    async fn set_tab_url(&self, tab_id: TabId, url: &str) -> Result<()>;

    /// Resolve once the tab reports load-complete.
    async fn wait_for_load(&self, tab_id: TabId) -> Result<()>;

    async fn go_back(&self, tab_id: TabId) -> Result<()>;

    async fn go_forward(&self, tab_id: TabId) -> Result<()>;

    /// Run a page function; one result per injected frame, main frame first.
    async fn execute_script(&self, injection: ScriptInjection) -> Result<Vec<FrameResult>>;

    /// Capture the visible tab of a window as a data URL.
    async fn capture_visible_tab(&self, opts: CaptureOptions) -> Result<String>;

    async fn get_cookies(&self, filter: CookieFilter) -> Result<Value>;

    async fn set_cookie(&self, details: CookieDetails) -> Result<Value>;

    async fn delete_cookie(&self, url: &str, name: &str) -> Result<()>;

    async fn get_frames(&self, tab_id: TabId) -> Result<Vec<FrameInfo>>;
}

/// First frame's result of an injection, the degradation rule most script
/// commands apply: absent/undefined results become `Value::Null` here and a
/// documented default at the handler.
pub fn first_frame_result(results: Vec<FrameResult>) -> Value {
    results
        .into_iter()
        .next()
        .map(|r| r.result)
        .unwrap_or(Value::Null)
}
